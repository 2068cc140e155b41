//! SilentStrategy - no output at all

use tracing::debug;

use crate::error::Result;
use crate::lifecycle::{Lifecycle, Phase};
use crate::strategy::VerbosityStrategy;
use crate::ticker::Ticker;

/// Strategy that displays nothing
///
/// Lets call sites stay identical whether or not progress is wanted. Hook
/// ordering is still checked; wrapped iterators are untouched pass-throughs.
#[derive(Debug, Clone, Default)]
pub struct SilentStrategy {
    lifecycle: Lifecycle,
}

impl SilentStrategy {
    pub fn new() -> Self {
        debug!("SilentStrategy::new: called");
        Self::default()
    }
}

impl VerbosityStrategy for SilentStrategy {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        self.lifecycle.begin_train(num_epochs)
    }

    fn on_train_end(&mut self) -> Result<()> {
        self.lifecycle.end_train()
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        self.lifecycle.begin_epoch(epoch)
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        self.lifecycle.end_epoch(epoch, avg_loss).map(|_| ())
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        self.lifecycle.record_batch(batch_idx, loss)
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
