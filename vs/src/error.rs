//! Verbosity error types

use thiserror::Error;

use crate::lifecycle::Phase;

/// Errors raised by a strategy when it is driven incorrectly
///
/// Display problems (no terminal, unwritable log file, unreachable notifier)
/// never show up here: those degrade the display instead of failing a hook.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerbosityError {
    #[error("{operation} called out of order (strategy is {phase})")]
    OrderingViolation { operation: &'static str, phase: Phase },

    #[error("on_epoch_end for epoch {got}, but the open epoch is {expected}")]
    EpochMismatch { expected: u64, got: u64 },

    #[error("Metric {name} must be finite, got {value}")]
    NonFiniteMetric { name: &'static str, value: f64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl VerbosityError {
    /// Check if this error reports hooks called in the wrong order
    pub fn is_ordering_violation(&self) -> bool {
        matches!(
            self,
            VerbosityError::OrderingViolation { .. } | VerbosityError::EpochMismatch { .. }
        )
    }

    /// Check if this error reports a bad argument to an otherwise valid call
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            VerbosityError::NonFiniteMetric { .. } | VerbosityError::InvalidArgument(_)
        )
    }
}

/// Result alias used by every strategy hook
pub type Result<T> = std::result::Result<T, VerbosityError>;
