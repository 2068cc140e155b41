//! VerbosityStrategy trait definition

use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::error::Result;
use crate::lifecycle::Phase;
use crate::ticker::{Ticker, Tracked, exact_len};

/// Strategy for reporting training progress
///
/// The loop calls the hooks at fixed points and iterates through the
/// sequences returned by [`WrapIterators`] instead of the raw epoch and batch
/// sequences. Implementors decide what, if anything, is displayed.
///
/// Hooks called out of order fail with an ordering violation; non-finite
/// metrics fail validation. Display trouble never fails a hook.
pub trait VerbosityStrategy {
    /// Called once before the first epoch
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()>;

    /// Called once after the last epoch; releases every display resource
    ///
    /// Resources are released even when an epoch is still open, in which
    /// case an ordering violation is reported afterwards.
    fn on_train_end(&mut self) -> Result<()>;

    /// Called at the start of each epoch with the caller's epoch index
    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()>;

    /// Called at the end of each epoch; closes any batch scope still open
    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()>;

    /// Called after each batch
    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()>;

    /// Display handle advanced once per epoch yielded by a wrapped iterator
    ///
    /// `len` is the exact number of epochs the wrapped sequence will yield,
    /// when known.
    fn epoch_ticker(&mut self, len: Option<u64>) -> Result<Ticker>;

    /// Open a batch scope and return the handle advanced once per batch
    ///
    /// `len` is `None` when the batch source cannot report its length.
    fn batch_ticker(&mut self, len: Option<u64>) -> Result<Ticker>;

    /// Current lifecycle phase
    fn phase(&self) -> Phase;
}

/// Iterator wrapping for every strategy, including `dyn VerbosityStrategy`
pub trait WrapIterators: VerbosityStrategy {
    /// Wrap the epoch sequence; yields exactly its items in order
    fn wrap_epoch_iterator<I: IntoIterator>(&mut self, iterable: I) -> Result<Tracked<I::IntoIter>> {
        let iter = iterable.into_iter();
        let len = exact_len(&iter);
        debug!(?len, "WrapIterators::wrap_epoch_iterator: called");
        let ticker = self.epoch_ticker(len)?;
        Ok(Tracked::new(iter, ticker))
    }

    /// Wrap one epoch's batch sequence; yields exactly its items in order
    fn wrap_batch_iterator<I: IntoIterator>(&mut self, iterable: I) -> Result<Tracked<I::IntoIter>> {
        let iter = iterable.into_iter();
        let len = exact_len(&iter);
        debug!(?len, "WrapIterators::wrap_batch_iterator: called");
        let ticker = self.batch_ticker(len)?;
        Ok(Tracked::new(iter, ticker))
    }
}

impl<S: VerbosityStrategy + ?Sized> WrapIterators for S {}

impl<S: VerbosityStrategy + ?Sized> VerbosityStrategy for Box<S> {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        (**self).on_train_begin(num_epochs)
    }

    fn on_train_end(&mut self) -> Result<()> {
        (**self).on_train_end()
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        (**self).on_epoch_begin(epoch)
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        (**self).on_epoch_end(epoch, avg_loss)
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        (**self).on_batch_end(batch_idx, loss)
    }

    fn epoch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        (**self).epoch_ticker(len)
    }

    fn batch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        (**self).batch_ticker(len)
    }

    fn phase(&self) -> Phase {
        (**self).phase()
    }
}

/// Scope guard for one training run
///
/// Calls `on_train_begin` on creation and guarantees `on_train_end` on every
/// exit path: explicitly through [`TrainingRun::finish`], or on drop when the
/// loop bails out early with `?` or panics.
///
/// ```ignore
/// let mut run = TrainingRun::begin(&mut strategy, 3)?;
/// for epoch in run.wrap_epoch_iterator(0..3)? {
///     run.on_epoch_begin(epoch)?;
///     for (idx, batch) in run.wrap_batch_iterator(&batches)?.enumerate() {
///         run.on_batch_end(idx as u64, Some(step(batch)?))?;
///     }
///     run.on_epoch_end(epoch, None)?;
/// }
/// run.finish()?;
/// ```
pub struct TrainingRun<'a, S: VerbosityStrategy + ?Sized> {
    strategy: &'a mut S,
    finished: bool,
}

impl<'a, S: VerbosityStrategy + ?Sized> TrainingRun<'a, S> {
    pub fn begin(strategy: &'a mut S, num_epochs: u64) -> Result<Self> {
        debug!(%num_epochs, "TrainingRun::begin: called");
        strategy.on_train_begin(num_epochs)?;
        Ok(Self {
            strategy,
            finished: false,
        })
    }

    /// End the run, surfacing any error from `on_train_end`
    pub fn finish(mut self) -> Result<()> {
        debug!("TrainingRun::finish: called");
        self.finished = true;
        self.strategy.on_train_end()
    }
}

impl<S: VerbosityStrategy + ?Sized> Deref for TrainingRun<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.strategy
    }
}

impl<S: VerbosityStrategy + ?Sized> DerefMut for TrainingRun<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.strategy
    }
}

impl<S: VerbosityStrategy + ?Sized> Drop for TrainingRun<'_, S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!(phase = %self.strategy.phase(), "TrainingRun::drop: run abandoned, releasing display");
        if let Err(e) = self.strategy.on_train_end() {
            warn!("Training run ended abnormally: {}", e);
        }
    }
}
