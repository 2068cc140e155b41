//! ProgressBarStrategy - nested epoch/batch progress bars
//!
//! The outer bar counts epochs and is sized at train begin. The inner bar
//! counts batches and is sized when the batch sequence is wrapped; sources
//! that cannot report their length get a spinner instead.

use std::fmt;
use std::io::{self, IsTerminal, Write};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::print::LineFormat;
use crate::error::Result;
use crate::lifecycle::{Lifecycle, Phase};
use crate::metrics::{MetricDisplay, RunningMean, format_metric};
use crate::strategy::VerbosityStrategy;
use crate::ticker::Ticker;

const EPOCH_TEMPLATE: &str = "{prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}";
const BATCH_TEMPLATE: &str = "{prefix} [{bar:40.green/white}] {pos}/{len} ({per_sec}) {msg}";
const SPINNER_TEMPLATE: &str = "{prefix} {spinner:.green} {pos} ({per_sec}) {msg}";

/// Where the bars are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// Bars on an interactive stderr, lines otherwise
    #[default]
    Auto,
    /// Always draw bars on stderr
    Bars,
    /// One plain line per train/epoch event
    Lines,
    /// Track everything, draw nothing
    Hidden,
}

impl DisplayMode {
    fn resolve(self) -> DisplayMode {
        match self {
            DisplayMode::Auto if io::stderr().is_terminal() => DisplayMode::Bars,
            DisplayMode::Auto => DisplayMode::Lines,
            other => other,
        }
    }
}

/// How the batch bar relates to the epoch bar on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Batch bar drawn below the epoch bar
    #[default]
    Nested,
    /// Epoch bar hidden while a batch bar is shown
    Sequential,
}

/// Construction options for [`ProgressBarStrategy`]
#[derive(Debug, Clone)]
pub struct ProgressBarOptions {
    pub display: DisplayMode,
    pub layout: Layout,
    pub metric: MetricDisplay,
    pub epoch_label: String,
    pub batch_label: String,
}

impl Default for ProgressBarOptions {
    fn default() -> Self {
        Self {
            display: DisplayMode::Auto,
            layout: Layout::Nested,
            metric: MetricDisplay::Latest,
            epoch_label: "Training".to_string(),
            batch_label: "  Batches".to_string(),
        }
    }
}

fn style(template: &str, fallback: fn() -> ProgressStyle) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| fallback())
}

/// Strategy rendering an epoch bar and an optional nested batch bar
pub struct ProgressBarStrategy {
    options: ProgressBarOptions,
    mode: DisplayMode,
    lifecycle: Lifecycle,
    multi: Option<MultiProgress>,
    epoch_bar: Option<ProgressBar>,
    batch_bar: Option<ProgressBar>,
    epochs_wrapped: bool,
    batches: RunningMean,
    format: LineFormat,
    lines_out: Box<dyn Write>,
    draw_target: Option<Box<dyn Fn() -> ProgressDrawTarget>>,
}

impl fmt::Debug for ProgressBarStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressBarStrategy")
            .field("options", &self.options)
            .field("mode", &self.mode)
            .field("phase", &self.lifecycle.phase())
            .field("epoch_bar", &self.epoch_bar.is_some())
            .field("batch_bar", &self.batch_bar.is_some())
            .field("custom_target", &self.draw_target.is_some())
            .finish()
    }
}

impl Default for ProgressBarStrategy {
    fn default() -> Self {
        Self::new(ProgressBarOptions::default())
    }
}

impl ProgressBarStrategy {
    pub fn new(options: ProgressBarOptions) -> Self {
        debug!(?options, "ProgressBarStrategy::new: called");
        Self {
            mode: options.display,
            options,
            lifecycle: Lifecycle::new(),
            multi: None,
            epoch_bar: None,
            batch_bar: None,
            epochs_wrapped: false,
            batches: RunningMean::new(),
            format: LineFormat::default(),
            lines_out: Box::new(io::stderr()),
            draw_target: None,
        }
    }

    /// Bars that track state without drawing anything
    pub fn hidden() -> Self {
        Self::new(ProgressBarOptions {
            display: DisplayMode::Hidden,
            ..Default::default()
        })
    }

    /// Redirect the output used by [`DisplayMode::Lines`]
    pub fn with_line_output(mut self, out: impl Write + 'static) -> Self {
        self.lines_out = Box::new(out);
        self
    }

    /// Draw bars through targets built by `make` instead of stderr
    ///
    /// Forces [`DisplayMode::Bars`]. `make` is called once per bar that
    /// becomes visible.
    pub fn with_draw_target(mut self, make: impl Fn() -> ProgressDrawTarget + 'static) -> Self {
        self.options.display = DisplayMode::Bars;
        self.mode = DisplayMode::Bars;
        self.draw_target = Some(Box::new(make));
        self
    }

    /// Display mode in effect; `Auto` is resolved at train begin
    pub fn display_mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn epoch_bar(&self) -> Option<&ProgressBar> {
        self.epoch_bar.as_ref()
    }

    pub fn batch_bar(&self) -> Option<&ProgressBar> {
        self.batch_bar.as_ref()
    }

    fn target(&self) -> ProgressDrawTarget {
        match (self.mode, &self.draw_target) {
            (DisplayMode::Bars, Some(make)) => make(),
            (DisplayMode::Bars, None) => ProgressDrawTarget::stderr(),
            _ => ProgressDrawTarget::hidden(),
        }
    }

    fn line(&mut self, line: String) {
        if self.mode != DisplayMode::Lines {
            return;
        }
        if let Err(e) = writeln!(self.lines_out, "{}", line) {
            warn!("ProgressBarStrategy: line output failed, hiding display: {}", e);
            self.mode = DisplayMode::Hidden;
        }
    }

    fn epoch_message(&self, epoch: u64, metrics: &str) -> String {
        if metrics.is_empty() {
            format!("epoch {}", epoch)
        } else {
            format!("epoch {} {}", epoch, metrics)
        }
    }

    fn new_batch_bar(&self, len: Option<u64>) -> ProgressBar {
        let (bar, style) = match len {
            Some(n) => (
                ProgressBar::with_draw_target(Some(n), ProgressDrawTarget::hidden()),
                style(BATCH_TEMPLATE, ProgressStyle::default_bar),
            ),
            None => (
                ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden()),
                style(SPINNER_TEMPLATE, ProgressStyle::default_spinner),
            ),
        };
        bar.set_style(style);
        bar.set_prefix(self.options.batch_label.clone());

        match (&self.multi, self.options.layout) {
            (Some(multi), Layout::Nested) => multi.add(bar),
            _ => {
                if let (Layout::Sequential, Some(epoch_bar)) = (self.options.layout, &self.epoch_bar) {
                    epoch_bar.set_draw_target(ProgressDrawTarget::hidden());
                }
                bar.set_draw_target(self.target());
                bar
            }
        }
    }

    fn close_batch_bar(&mut self) {
        let Some(bar) = self.batch_bar.take() else {
            return;
        };
        debug!(position = bar.position(), "ProgressBarStrategy: closing batch bar");
        bar.finish_and_clear();
        if let Some(multi) = &self.multi {
            multi.remove(&bar);
        }
        if let (Layout::Sequential, Some(epoch_bar)) = (self.options.layout, &self.epoch_bar) {
            epoch_bar.set_draw_target(self.target());
        }
    }
}

impl VerbosityStrategy for ProgressBarStrategy {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        self.lifecycle.begin_train(num_epochs)?;
        self.mode = self.options.display.resolve();
        self.format = LineFormat::new(num_epochs);
        self.epochs_wrapped = false;
        info!(%num_epochs, mode = ?self.mode, "ProgressBarStrategy: training started");

        let bar = ProgressBar::with_draw_target(Some(num_epochs), ProgressDrawTarget::hidden());
        bar.set_style(style(EPOCH_TEMPLATE, ProgressStyle::default_bar));
        bar.set_prefix(self.options.epoch_label.clone());

        let bar = match self.options.layout {
            Layout::Nested => {
                let multi = MultiProgress::with_draw_target(self.target());
                let bar = multi.add(bar);
                self.multi = Some(multi);
                bar
            }
            Layout::Sequential => {
                bar.set_draw_target(self.target());
                bar
            }
        };
        self.epoch_bar = Some(bar);

        let line = self.format.train_begin();
        self.line(line);
        Ok(())
    }

    fn on_train_end(&mut self) -> Result<()> {
        self.lifecycle.can_end_train()?;
        let abandoned = self.lifecycle.phase().in_epoch();
        self.close_batch_bar();
        if let Some(bar) = self.epoch_bar.take() {
            if abandoned {
                bar.abandon();
            } else {
                bar.finish();
            }
        }
        self.multi = None;

        let line = self.format.train_end();
        self.line(line);
        info!(abandoned, "ProgressBarStrategy: training ended");
        self.lifecycle.end_train()
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        self.lifecycle.begin_epoch(epoch)?;
        self.batches.reset();
        if let Some(bar) = &self.epoch_bar {
            bar.set_message(self.epoch_message(epoch, ""));
        }
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        self.lifecycle.end_epoch(epoch, avg_loss)?;
        self.close_batch_bar();

        let summary = match (avg_loss, self.batches.mean()) {
            (Some(avg), _) => format_metric("avg_loss", avg),
            (None, Some(mean)) => format_metric("mean_loss", mean),
            (None, None) => String::new(),
        };
        if let Some(bar) = &self.epoch_bar {
            if !self.epochs_wrapped {
                bar.inc(1);
            }
            bar.set_message(self.epoch_message(epoch, &summary));
        }

        let line = self.format.epoch_end(epoch, avg_loss, &self.batches);
        self.line(line);
        Ok(())
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        self.lifecycle.record_batch(batch_idx, loss)?;
        let Some(loss) = loss else {
            return Ok(());
        };
        self.batches.push(loss);
        let metrics = self.batches.describe(self.options.metric);

        match (&self.batch_bar, &self.epoch_bar) {
            (Some(bar), _) => bar.set_message(metrics),
            (None, Some(bar)) => {
                let epoch = self.lifecycle.current_epoch().unwrap_or_default();
                bar.set_message(self.epoch_message(epoch, &metrics));
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn epoch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        self.lifecycle.check_wrap_epochs()?;
        self.epochs_wrapped = true;
        let Some(bar) = &self.epoch_bar else {
            return Ok(Ticker::none());
        };
        if let Some(len) = len {
            bar.set_length(len);
        }
        Ok(Ticker::bar(bar.clone()))
    }

    fn batch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        if self.lifecycle.open_batch()? {
            debug!("ProgressBarStrategy: batch sequence wrapped again, replacing bar");
            self.close_batch_bar();
        }
        let bar = self.new_batch_bar(len);
        if let Some(epoch) = self.lifecycle.current_epoch() {
            bar.set_message(self.epoch_message(epoch, ""));
        }
        self.batch_bar = Some(bar.clone());
        Ok(Ticker::bar(bar))
    }

    fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }
}
