//! Remote notifications for long-running training

mod strategy;
mod telegram;

pub use strategy::NotifyingStrategy;
pub use telegram::{DEFAULT_BASE_URL, NotifyError, TelegramClient};
