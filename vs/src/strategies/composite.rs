//! CompositeStrategy - fan hooks out to several strategies

use tracing::debug;

use crate::error::{Result, VerbosityError};
use crate::lifecycle::{Lifecycle, Phase};
use crate::strategy::VerbosityStrategy;
use crate::ticker::Ticker;

/// Strategy that forwards every hook to each member in order
///
/// The composite keeps its own [`Lifecycle`] and validates each hook against
/// it before any member sees the call, so a rejected call leaves every member
/// untouched and the members move in lockstep. Members must be idle
/// (never started or closed) when training begins.
///
/// A hook that passes validation reaches every member even when an earlier
/// one fails; the first member error is returned. Wrapped iterators tick
/// every member's display.
#[derive(Default)]
pub struct CompositeStrategy {
    lifecycle: Lifecycle,
    members: Vec<Box<dyn VerbosityStrategy>>,
}

impl CompositeStrategy {
    pub fn new(members: Vec<Box<dyn VerbosityStrategy>>) -> Self {
        debug!(members = members.len(), "CompositeStrategy::new: called");
        Self {
            lifecycle: Lifecycle::new(),
            members,
        }
    }

    /// Add a member; hooks reach members in insertion order
    pub fn with(mut self, member: impl VerbosityStrategy + 'static) -> Self {
        debug!(phase = %member.phase(), "CompositeStrategy::with: called");
        self.members.push(Box::new(member));
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn check_members_idle(&self) -> Result<()> {
        for (idx, member) in self.members.iter().enumerate() {
            match member.phase() {
                Phase::Uninitialized | Phase::Closed => {}
                phase => {
                    return Err(VerbosityError::InvalidArgument(format!(
                        "composite member {} is already {}",
                        idx, phase
                    )));
                }
            }
        }
        Ok(())
    }

    fn each(&mut self, mut hook: impl FnMut(&mut Box<dyn VerbosityStrategy>) -> Result<()>) -> Result<()> {
        let mut first_err = None;
        for (idx, member) in self.members.iter_mut().enumerate() {
            if let Err(e) = hook(member) {
                debug!(%idx, %e, "CompositeStrategy: member failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn merged(&mut self, mut ticker: impl FnMut(&mut Box<dyn VerbosityStrategy>) -> Result<Ticker>) -> Result<Ticker> {
        let mut merged = Ticker::none();
        let mut first_err = None;
        for member in &mut self.members {
            match ticker(member) {
                Ok(t) => merged = merged.merge(t),
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(merged),
        }
    }
}

impl VerbosityStrategy for CompositeStrategy {
    fn on_train_begin(&mut self, num_epochs: u64) -> Result<()> {
        let mut lifecycle = self.lifecycle.clone();
        lifecycle.begin_train(num_epochs)?;
        self.check_members_idle()?;
        self.lifecycle = lifecycle;
        self.each(|m| m.on_train_begin(num_epochs))
    }

    fn on_train_end(&mut self) -> Result<()> {
        self.lifecycle.can_end_train()?;
        let members = self.each(|m| m.on_train_end());
        self.lifecycle.end_train().and(members)
    }

    fn on_epoch_begin(&mut self, epoch: u64) -> Result<()> {
        self.lifecycle.begin_epoch(epoch)?;
        self.each(|m| m.on_epoch_begin(epoch))
    }

    fn on_epoch_end(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<()> {
        self.lifecycle.end_epoch(epoch, avg_loss)?;
        self.each(|m| m.on_epoch_end(epoch, avg_loss))
    }

    fn on_batch_end(&mut self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        self.lifecycle.record_batch(batch_idx, loss)?;
        self.each(|m| m.on_batch_end(batch_idx, loss))
    }

    fn epoch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        self.lifecycle.check_wrap_epochs()?;
        self.merged(|m| m.epoch_ticker(len))
    }

    fn batch_ticker(&mut self, len: Option<u64>) -> Result<Ticker> {
        self.lifecycle.open_batch()?;
        self.merged(|m| m.batch_ticker(len))
    }

    fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }
}
