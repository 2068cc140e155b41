//! vs - try out training progress strategies from the command line

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use verbosity_strategy::cli::{Cli, Command};
use verbosity_strategy::config::{Config, build_strategy};
use verbosity_strategy::demo::{DemoOptions, DemoSummary, run_demo};

fn setup_logging(verbose: bool) -> Result<()> {
    // Log to a file so log lines never tear through the progress bars
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("verbosity")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    let log_file = fs::File::create(log_dir.join("vs.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    Ok(())
}

fn print_summary(summary: &DemoSummary) {
    println!(
        "{} {} epochs, {} batches in {:.2?}",
        "✓".green(),
        summary.epochs.to_string().cyan(),
        summary.batches.to_string().cyan(),
        summary.elapsed
    );
    match (summary.first_loss, summary.final_loss) {
        (Some(first), Some(last)) => {
            println!("  loss: {} -> {}", format!("{:.4}", first).yellow(), format!("{:.4}", last).green());
        }
        _ => println!("  {}", "no loss recorded".dimmed()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("vs starting");

    match cli.command {
        Command::Demo {
            epochs,
            batches,
            delay_ms,
            strategy,
            no_batches,
            lazy_batches,
        } => {
            if let Some(kind) = strategy {
                config.strategy = kind;
            }
            let mut strategy = build_strategy(&config).context("Failed to build strategy")?;
            let options = DemoOptions {
                epochs,
                batches,
                delay: Duration::from_millis(delay_ms),
                no_batches,
                lazy_batches,
            };
            let summary = run_demo(strategy.as_mut(), &options).context("Demo run failed")?;
            print_summary(&summary);
        }
        Command::Config => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}
