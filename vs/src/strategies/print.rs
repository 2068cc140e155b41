//! PrintStrategy - one plain line per event

use std::io::{self, Stdout, Write};

use tracing::{debug, warn};

use crate::error::Result;
use crate::lifecycle::{Lifecycle, Phase};
use crate::metrics::{RunningMean, format_metric};
use crate::strategy::VerbosityStrategy;
use crate::ticker::Ticker;

/// Line formats shared by the text-based strategies
///
/// Epoch and batch indices are printed exactly as the caller passed them.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct LineFormat {
    num_epochs: u64,
    width: usize,
}

impl LineFormat {
    pub(crate) fn new(num_epochs: u64) -> Self {
        Self {
            num_epochs,
            width: num_epochs.to_string().len(),
        }
    }

    pub(crate) fn train_begin(&self) -> String {
        format!("Starting training for {} epochs...", self.num_epochs)
    }

    pub(crate) fn epoch_begin(&self, epoch: u64) -> String {
        format!("Epoch {:>width$}/{}", epoch, self.num_epochs, width = self.width)
    }

    pub(crate) fn batch_end(&self, batch_idx: u64, loss: Option<f64>) -> String {
        match loss {
            Some(loss) => format!("  Batch {}, {}", batch_idx, format_metric("loss", loss)),
            None => format!("  Batch {}", batch_idx),
        }
    }

    /// Caller-supplied average wins; otherwise the mean of recorded batch losses
    pub(crate) fn epoch_end(&self, epoch: u64, avg_loss: Option<f64>, batches: &RunningMean) -> String {
        let head = format!(
            "Epoch {:>width$}/{} completed",
            epoch,
            self.num_epochs,
            width = self.width
        );
        match (avg_loss, batches.mean()) {
            (Some(avg), _) => format!("{} - {}", head, format_metric("avg_loss", avg)),
            (None, Some(mean)) => format!("{} - {}", head, format_metric("mean_loss", mean)),
            (None, None) => head,
        }
    }

    pub(crate) fn train_end(&self) -> String {
        "Training completed!".to_string()
    }
}

/// Strategy that writes one line per lifecycle event
///
/// Writes to stdout by default; any [`Write`] can be supplied. A failed
/// write is logged once and further output is dropped, training carries on.
pub struct PrintStrategy<W: Write = Stdout> {
    out: W,
    lifecycle: Lifecycle,
    format: LineFormat,
    batches: RunningMean,
    degraded: bool,
}

impl PrintStrategy<Stdout> {
    pub fn new() -> Self {
        debug!("PrintStrategy::new: called");
        Self::with_writer(io::stdout())
    }
}

impl Default for PrintStrategy<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> PrintStrategy<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            lifecycle: Lifecycle::new(),
            format: LineFormat::default(),
            batches: RunningMean::new(),
            degraded: false,
        }
    }

    pub fn writer(&self) -> &W {
        &self.out
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// Whether output has been dropped after a write failure
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn emit(&mut self, line: String) {
        if self.degraded {
            return;
        }
        if let Err(e) = writeln!(self.out, "{}", line).and_then(|_| self.out.flush()) {
            warn!("PrintStrategy: output failed, suppressing further lines: {}", e);
            self.degraded = true;
        }
    }
}

impl<W: Write> VerbosityStrategy for PrintStrategy<W> {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        self.lifecycle.begin_train(num_epochs)?;
        self.format = LineFormat::new(num_epochs);
        let line = self.format.train_begin();
        self.emit(line);
        Ok(())
    }

    fn on_train_end(&mut self) -> Result<()> {
        self.lifecycle.can_end_train()?;
        let line = self.format.train_end();
        self.emit(line);
        self.lifecycle.end_train()
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        self.lifecycle.begin_epoch(epoch)?;
        self.batches.reset();
        let line = self.format.epoch_begin(epoch);
        self.emit(line);
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        self.lifecycle.end_epoch(epoch, avg_loss)?;
        let line = self.format.epoch_end(epoch, avg_loss, &self.batches);
        self.emit(line);
        Ok(())
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        self.lifecycle.record_batch(batch_idx, loss)?;
        if let Some(loss) = loss {
            self.batches.push(loss);
        }
        let line = self.format.batch_end(batch_idx, loss);
        self.emit(line);
        Ok(())
    }

    fn epoch_ticker(&mut self, _len: Option<u64>) -> Result<Ticker> {
        self.lifecycle.check_wrap_epochs()?;
        Ok(Ticker::none())
    }

    fn batch_ticker(&mut self, _len: Option<u64>) -> Result<Ticker> {
        self.lifecycle.open_batch()?;
        Ok(Ticker::none())
    }

    fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }
}
