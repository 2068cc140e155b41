//! NotifyingStrategy - remote notifications around another strategy

use tracing::{debug, warn};

use super::telegram::TelegramClient;
use crate::error::Result;
use crate::lifecycle::Phase;
use crate::metrics::RunningMean;
use crate::strategies::LineFormat;
use crate::strategy::VerbosityStrategy;
use crate::ticker::Ticker;

/// Decorator that reports run boundaries to a Telegram chat
///
/// All display is delegated to the inner strategy. A message is sent when
/// training starts and ends and, optionally, after every epoch. Delivery
/// failures are logged and counted, never returned.
#[derive(Debug)]
pub struct NotifyingStrategy<S> {
    inner: S,
    client: TelegramClient,
    epoch_summaries: bool,
    format: LineFormat,
    batches: RunningMean,
    failures: u32,
}

impl<S: VerbosityStrategy> NotifyingStrategy<S> {
    pub fn new(inner: S, client: TelegramClient) -> Self {
        debug!(chat_id = %client.chat_id(), "NotifyingStrategy::new: called");
        Self {
            inner,
            client,
            epoch_summaries: false,
            format: LineFormat::default(),
            batches: RunningMean::new(),
            failures: 0,
        }
    }

    /// Also send a summary line at the end of every epoch
    pub fn with_epoch_summaries(mut self, enabled: bool) -> Self {
        self.epoch_summaries = enabled;
        self
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of notifications that could not be delivered
    pub fn failures(&self) -> u32 {
        self.failures
    }

    fn notify(&mut self, text: &str) {
        if let Err(e) = self.client.send_message(text) {
            warn!("Telegram notification failed: {}", e);
            self.failures += 1;
        }
    }
}

impl<S: VerbosityStrategy> VerbosityStrategy for NotifyingStrategy<S> {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        self.inner.on_train_begin(num_epochs)?;
        self.format = LineFormat::new(num_epochs);
        let text = self.format.train_begin();
        self.notify(&text);
        Ok(())
    }

    fn on_train_end(&mut self) -> Result<()> {
        // rejected calls (never started, already closed) send nothing
        let was = self.inner.phase();
        let result = self.inner.on_train_end();
        if !matches!(was, Phase::Uninitialized | Phase::Closed) {
            let text = self.format.train_end();
            self.notify(&text);
        }
        result
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        self.inner.on_epoch_begin(epoch)?;
        self.batches.reset();
        Ok(())
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        self.inner.on_epoch_end(epoch, avg_loss)?;
        if self.epoch_summaries {
            // code span keeps metric names out of Markdown emphasis
            let text = format!("`{}`", self.format.epoch_end(epoch, avg_loss, &self.batches));
            self.notify(&text);
        }
        Ok(())
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        self.inner.on_batch_end(batch_idx, loss)?;
        if let Some(loss) = loss {
            self.batches.push(loss);
        }
        Ok(())
    }

    fn epoch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        self.inner.epoch_ticker(len)
    }

    fn batch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        self.inner.batch_ticker(len)
    }

    fn phase(&self) -> Phase {
        self.inner.phase()
    }
}
