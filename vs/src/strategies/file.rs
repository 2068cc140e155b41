//! FileLoggingStrategy - timestamped progress lines in a log file

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use super::print::LineFormat;
use crate::error::Result;
use crate::lifecycle::{Lifecycle, Phase};
use crate::metrics::RunningMean;
use crate::strategy::VerbosityStrategy;
use crate::ticker::Ticker;

/// Strategy that appends progress lines to a file
///
/// The file is created (truncated) at train begin, flushed after every line
/// and closed at train end. If it cannot be opened or written, the run
/// continues without file output.
pub struct FileLoggingStrategy {
    path: PathBuf,
    file: Option<BufWriter<File>>,
    lifecycle: Lifecycle,
    format: LineFormat,
    batches: RunningMean,
}

impl FileLoggingStrategy {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "FileLoggingStrategy::new: called");
        Self {
            path,
            file: None,
            lifecycle: Lifecycle::new(),
            format: LineFormat::default(),
            batches: RunningMean::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the log file is currently open
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn open(&mut self) {
        let opened = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| File::create(&self.path));

        match opened {
            Ok(file) => {
                info!(path = %self.path.display(), "Logging training progress to file");
                self.file = Some(BufWriter::new(file));
            }
            Err(e) => {
                warn!("Cannot open progress log {}, continuing without it: {}", self.path.display(), e);
                self.file = None;
            }
        }
    }

    fn log(&mut self, message: String) {
        let Some(file) = self.file.as_mut() else {
            return;
        };
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        if let Err(e) = writeln!(file, "[{}] {}", stamp, message).and_then(|_| file.flush()) {
            warn!("Writing progress log {} failed, closing it: {}", self.path.display(), e);
            self.file = None;
        }
    }
}

impl VerbosityStrategy for FileLoggingStrategy {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        self.lifecycle.begin_train(num_epochs)?;
        self.format = LineFormat::new(num_epochs);
        self.open();
        let line = self.format.train_begin();
        self.log(line);
        Ok(())
    }

    fn on_train_end(&mut self) -> Result<()> {
        self.lifecycle.can_end_train()?;
        let line = self.format.train_end();
        self.log(line);
        // dropping the writer flushes and closes the file
        self.file = None;
        self.lifecycle.end_train()
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        self.lifecycle.begin_epoch(epoch)?;
        self.batches.reset();
        let line = self.format.epoch_begin(epoch);
        self.log(line);
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        self.lifecycle.end_epoch(epoch, avg_loss)?;
        let line = self.format.epoch_end(epoch, avg_loss, &self.batches);
        self.log(line);
        Ok(())
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        self.lifecycle.record_batch(batch_idx, loss)?;
        if let Some(loss) = loss {
            self.batches.push(loss);
        }
        let line = self.format.batch_end(batch_idx, loss);
        self.log(line);
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
