//! Verbosity strategies - pluggable progress reporting for training loops
//!
//! A training loop owns one [`VerbosityStrategy`], calls its hooks at fixed
//! points and iterates through the sequences returned by
//! [`WrapIterators::wrap_epoch_iterator`] and
//! [`WrapIterators::wrap_batch_iterator`]. Which strategy is injected decides
//! what the user sees: progress bars, plain lines, a log file, nothing, or a
//! combination.
//!
//! # Lifecycle
//!
//! ```text
//! on_train_begin(n)
//! └── for epoch in wrap_epoch_iterator(epochs)
//!     ├── on_epoch_begin(epoch)
//!     ├── for batch in wrap_batch_iterator(batches)
//!     │   └── on_batch_end(idx, loss)
//!     └── on_epoch_end(epoch, avg_loss)
//! on_train_end()
//! ```
//!
//! # Example
//!
//! ```ignore
//! use verbosity_strategy::{ProgressBarStrategy, TrainingRun, WrapIterators};
//!
//! let mut strategy = ProgressBarStrategy::default();
//! let mut run = TrainingRun::begin(&mut strategy, 10)?;
//! for epoch in run.wrap_epoch_iterator(0..10)? {
//!     run.on_epoch_begin(epoch)?;
//!     for (idx, batch) in run.wrap_batch_iterator(&loader)?.enumerate() {
//!         run.on_batch_end(idx as u64, Some(train_step(batch)))?;
//!     }
//!     run.on_epoch_end(epoch, None)?;
//! }
//! run.finish()?;
//! ```

pub mod cli;
pub mod config;
pub mod demo;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod notify;
pub mod strategies;
pub mod strategy;
pub mod ticker;

pub use error::{Result, VerbosityError};
pub use lifecycle::{Lifecycle, Phase};
pub use metrics::{MetricDisplay, RunningMean};
pub use notify::{NotifyError, NotifyingStrategy, TelegramClient};
pub use strategies::{
    CompositeStrategy, DisplayMode, FileLoggingStrategy, Layout, PrintStrategy, ProgressBarOptions,
    ProgressBarStrategy, SilentStrategy,
};
pub use strategy::{TrainingRun, VerbosityStrategy, WrapIterators};
pub use ticker::{Ticker, Tracked};
