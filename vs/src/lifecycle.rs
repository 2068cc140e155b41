//! Lifecycle state machine shared by every strategy
//!
//! ```text
//! Uninitialized -> TrainActive -> { EpochActive <-> BatchActive } -> TrainActive -> Closed
//! ```
//!
//! Strategies embed a [`Lifecycle`] and consult it before touching their
//! display, so an out-of-order hook is rejected before any state is mutated.

use std::fmt;

use tracing::debug;

use crate::error::{Result, VerbosityError};

/// Where a strategy instance is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Uninitialized,
    TrainActive,
    EpochActive,
    BatchActive,
    Closed,
}

impl Phase {
    /// Whether an epoch scope is open (with or without a nested batch scope)
    pub fn in_epoch(self) -> bool {
        matches!(self, Phase::EpochActive | Phase::BatchActive)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::TrainActive => "train-active",
            Phase::EpochActive => "epoch-active",
            Phase::BatchActive => "batch-active",
            Phase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Per-run bookkeeping validated on every hook
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    phase: Phase,
    num_epochs: u64,
    current_epoch: Option<u64>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Total epochs announced at train begin
    pub fn num_epochs(&self) -> u64 {
        self.num_epochs
    }

    /// Index of the open epoch, exactly as the caller supplied it
    pub fn current_epoch(&self) -> Option<u64> {
        self.current_epoch
    }

    fn violation(&self, operation: &'static str) -> VerbosityError {
        debug!(%operation, phase = %self.phase, "Lifecycle: ordering violation");
        VerbosityError::OrderingViolation {
            operation,
            phase: self.phase,
        }
    }

    /// Enter `TrainActive`; a closed instance may be reused for a new run
    pub fn begin_train(&mut self, num_epochs: u64) -> Result<()> {
        debug!(%num_epochs, phase = %self.phase, "Lifecycle::begin_train: called");
        match self.phase {
            Phase::Uninitialized | Phase::Closed => {
                self.phase = Phase::TrainActive;
                self.num_epochs = num_epochs;
                self.current_epoch = None;
                Ok(())
            }
            _ => Err(self.violation("on_train_begin")),
        }
    }

    /// Epoch sequences are wrapped between train begin and the first epoch
    pub fn check_wrap_epochs(&self) -> Result<()> {
        debug!(phase = %self.phase, "Lifecycle::check_wrap_epochs: called");
        if self.phase != Phase::TrainActive {
            return Err(self.violation("wrap_epoch_iterator"));
        }
        Ok(())
    }

    pub fn begin_epoch(&mut self, epoch: u64) -> Result<()> {
        debug!(%epoch, phase = %self.phase, "Lifecycle::begin_epoch: called");
        if self.phase != Phase::TrainActive {
            return Err(self.violation("on_epoch_begin"));
        }
        self.phase = Phase::EpochActive;
        self.current_epoch = Some(epoch);
        Ok(())
    }

    /// Open a batch scope; returns true when it replaces one already open
    pub fn open_batch(&mut self) -> Result<bool> {
        debug!(phase = %self.phase, "Lifecycle::open_batch: called");
        match self.phase {
            Phase::EpochActive => {
                self.phase = Phase::BatchActive;
                Ok(false)
            }
            Phase::BatchActive => Ok(true),
            _ => Err(self.violation("wrap_batch_iterator")),
        }
    }

    pub fn record_batch(&self, batch_idx: u64, loss: Option<f64>) -> Result<()> {
        debug!(%batch_idx, ?loss, phase = %self.phase, "Lifecycle::record_batch: called");
        if !self.phase.in_epoch() {
            return Err(self.violation("on_batch_end"));
        }
        check_finite("loss", loss)
    }

    /// Close the epoch scope; returns true when a batch scope was still open
    pub fn end_epoch(&mut self, epoch: u64, avg_loss: Option<f64>) -> Result<bool> {
        debug!(%epoch, ?avg_loss, phase = %self.phase, "Lifecycle::end_epoch: called");
        if !self.phase.in_epoch() {
            return Err(self.violation("on_epoch_end"));
        }
        match self.current_epoch {
            Some(expected) if expected != epoch => {
                return Err(VerbosityError::EpochMismatch { expected, got: epoch });
            }
            _ => {}
        }
        check_finite("avg_loss", avg_loss)?;

        let had_batch = self.phase == Phase::BatchActive;
        self.phase = Phase::TrainActive;
        self.current_epoch = None;
        Ok(had_batch)
    }

    /// Check that `on_train_end` may run at all
    ///
    /// Errors only when there is nothing to release (never started, or
    /// already closed).
    pub fn can_end_train(&self) -> Result<()> {
        match self.phase {
            Phase::Uninitialized | Phase::Closed => Err(self.violation("on_train_end")),
            _ => Ok(()),
        }
    }

    /// Enter `Closed`
    ///
    /// Call after the strategy has released its resources. An epoch left open
    /// is still closed, but reported as an ordering violation.
    pub fn end_train(&mut self) -> Result<()> {
        debug!(phase = %self.phase, "Lifecycle::end_train: called");
        self.can_end_train()?;
        let was = self.phase;
        self.phase = Phase::Closed;
        self.current_epoch = None;
        if was.in_epoch() {
            return Err(VerbosityError::OrderingViolation {
                operation: "on_train_end",
                phase: was,
            });
        }
        Ok(())
    }
}

/// Reject NaN and infinite metric values
pub fn check_finite(name: &'static str, value: Option<f64>) -> Result<()> {
    match value {
        Some(v) if !v.is_finite() => Err(VerbosityError::NonFiniteMetric { name, value: v }),
        _ => Ok(()),
    }
}
