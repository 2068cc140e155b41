//! CLI argument parsing for vs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StrategyKind;

#[derive(Parser, Debug)]
#[command(name = "vs")]
#[command(author, version, about = "Pluggable progress reporting for training loops", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log at DEBUG level
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Drive a simulated training loop through a strategy
    Demo {
        /// Number of epochs
        #[arg(short, long, default_value = "3")]
        epochs: u64,

        /// Batches per epoch
        #[arg(short, long, default_value = "20")]
        batches: u64,

        /// Simulated work per batch in milliseconds
        #[arg(short, long, default_value = "50")]
        delay_ms: u64,

        /// Strategy to use instead of the configured one
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyKind>,

        /// Skip the batch level entirely
        #[arg(long)]
        no_batches: bool,

        /// Feed batches from a source without a known length
        #[arg(long)]
        lazy_batches: bool,
    },

    /// Print the effective configuration as YAML
    Config,
}
