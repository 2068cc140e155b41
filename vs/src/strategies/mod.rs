//! Concrete verbosity strategies
//!
//! - [`SilentStrategy`] - no output; call sites stay uniform
//! - [`PrintStrategy`] - one line per event on stdout (or any writer)
//! - [`FileLoggingStrategy`] - timestamped lines in a log file
//! - [`ProgressBarStrategy`] - nested epoch/batch progress bars
//! - [`CompositeStrategy`] - several of the above at once

mod composite;
mod file;
mod print;
mod progress_bar;
mod silent;

pub use composite::CompositeStrategy;
pub use file::FileLoggingStrategy;
pub use print::PrintStrategy;
pub(crate) use print::LineFormat;
pub use progress_bar::{DisplayMode, Layout, ProgressBarOptions, ProgressBarStrategy};
pub use silent::SilentStrategy;
