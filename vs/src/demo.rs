//! Simulated training loop for trying out strategies

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::RunningMean;
use crate::strategy::{TrainingRun, VerbosityStrategy, WrapIterators};

/// Shape of the simulated run
#[derive(Debug, Clone)]
pub struct DemoOptions {
    pub epochs: u64,
    pub batches: u64,
    /// Sleep per batch (or per epoch when batches are skipped)
    pub delay: Duration,
    pub no_batches: bool,
    /// Batch source that cannot report its length
    pub lazy_batches: bool,
}

impl Default for DemoOptions {
    fn default() -> Self {
        Self {
            epochs: 3,
            batches: 20,
            delay: Duration::from_millis(50),
            no_batches: false,
            lazy_batches: false,
        }
    }
}

/// What the simulated run did
#[derive(Debug, Clone, Default)]
pub struct DemoSummary {
    pub epochs: u64,
    pub batches: u64,
    pub first_loss: Option<f64>,
    pub final_loss: Option<f64>,
    pub elapsed: Duration,
}

/// Loss that decays with training progress plus a little noise
fn synthetic_loss(progress: f64, rng: &mut impl Rng) -> f64 {
    2.0 * (-3.0 * progress).exp() + 0.1 + rng.random_range(-0.02..0.02)
}

fn batch_source(options: &DemoOptions) -> Box<dyn Iterator<Item = u64>> {
    let total = options.batches;
    if options.lazy_batches {
        let mut next = 0;
        Box::new(std::iter::from_fn(move || {
            if next < total {
                next += 1;
                Some(next - 1)
            } else {
                None
            }
        }))
    } else {
        Box::new(0..total)
    }
}

/// Drive a full training lifecycle through `strategy`
///
/// Display resources are released on every exit path; hook errors are
/// returned as-is.
pub fn run_demo(strategy: &mut dyn VerbosityStrategy, options: &DemoOptions) -> Result<DemoSummary> {
    debug!(?options, "run_demo: called");
    let start = Instant::now();
    let mut rng = rand::rng();
    let mut summary = DemoSummary::default();

    let steps_per_epoch = if options.no_batches { 1 } else { options.batches.max(1) };
    let total_steps = (options.epochs * steps_per_epoch).max(1) as f64;

    let mut run = TrainingRun::begin(strategy, options.epochs)?;
    for epoch in run.wrap_epoch_iterator(0..options.epochs)? {
        run.on_epoch_begin(epoch)?;

        let avg_loss = if options.no_batches {
            thread::sleep(options.delay);
            synthetic_loss((epoch + 1) as f64 / total_steps, &mut rng)
        } else {
            let mut losses = RunningMean::new();
            for (idx, step) in run.wrap_batch_iterator(batch_source(options))?.enumerate() {
                thread::sleep(options.delay);
                let progress = (epoch * steps_per_epoch + step + 1) as f64 / total_steps;
                let loss = synthetic_loss(progress, &mut rng);
                summary.first_loss.get_or_insert(loss);
                losses.push(loss);
                run.on_batch_end(idx as u64, Some(loss))?;
                summary.batches += 1;
            }
            // an empty epoch reports no average rather than a made-up one
            match losses.mean() {
                Some(mean) => mean,
                None => {
                    run.on_epoch_end(epoch, None)?;
                    summary.epochs += 1;
                    continue;
                }
            }
        };

        summary.first_loss.get_or_insert(avg_loss);
        summary.final_loss = Some(avg_loss);
        run.on_epoch_end(epoch, Some(avg_loss))?;
        summary.epochs += 1;
    }
    run.finish()?;

    summary.elapsed = start.elapsed();
    info!(epochs = summary.epochs, batches = summary.batches, final_loss = ?summary.final_loss, "run_demo: finished");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Phase;
    use crate::strategies::{PrintStrategy, ProgressBarStrategy, SilentStrategy};

    fn quick(epochs: u64, batches: u64) -> DemoOptions {
        DemoOptions {
            epochs,
            batches,
            delay: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_demo_counts() {
        let mut strategy = SilentStrategy::new();
        let summary = run_demo(&mut strategy, &quick(3, 4)).unwrap();

        assert_eq!(summary.epochs, 3);
        assert_eq!(summary.batches, 12);
        assert_eq!(strategy.phase(), Phase::Closed);
    }

    #[test]
    fn test_demo_loss_decays() {
        let mut strategy = SilentStrategy::new();
        let summary = run_demo(&mut strategy, &quick(3, 10)).unwrap();

        let first = summary.first_loss.unwrap();
        let last = summary.final_loss.unwrap();
        assert!(first > last, "{} should exceed {}", first, last);
        assert!(last > 0.0);
    }

    #[test]
    fn test_demo_print_output() {
        let mut strategy = PrintStrategy::with_writer(Vec::new());
        run_demo(&mut strategy, &quick(2, 2)).unwrap();

        let text = String::from_utf8(strategy.into_writer()).unwrap();
        assert!(text.starts_with("Starting training for 2 epochs"));
        assert!(text.contains("Epoch 1/2 completed - avg_loss="));
        assert!(text.ends_with("Training completed!\n"));
    }

    #[test]
    fn test_demo_without_batches() {
        let mut strategy = PrintStrategy::with_writer(Vec::new());
        let options = DemoOptions {
            no_batches: true,
            ..quick(2, 5)
        };
        let summary = run_demo(&mut strategy, &options).unwrap();

        assert_eq!(summary.epochs, 2);
        assert_eq!(summary.batches, 0);
        let text = String::from_utf8(strategy.into_writer()).unwrap();
        assert_eq!(text.matches("completed - avg_loss=").count(), 2);
        assert!(!text.contains("Batch"));
    }

    #[test]
    fn test_demo_progress_bars_hidden() {
        let mut strategy = ProgressBarStrategy::hidden();
        let summary = run_demo(&mut strategy, &quick(2, 3)).unwrap();

        assert_eq!(summary.batches, 6);
        assert_eq!(strategy.phase(), Phase::Closed);
        assert!(strategy.epoch_bar().is_none());
        assert!(strategy.batch_bar().is_none());
    }

    #[test]
    fn test_demo_lazy_batches() {
        let mut strategy = SilentStrategy::new();
        let options = DemoOptions {
            lazy_batches: true,
            ..quick(2, 3)
        };
        let summary = run_demo(&mut strategy, &options).unwrap();
        assert_eq!(summary.batches, 6);
    }

    #[test]
    fn test_demo_zero_batches_per_epoch() {
        let mut strategy = SilentStrategy::new();
        let summary = run_demo(&mut strategy, &quick(2, 0)).unwrap();

        assert_eq!(summary.epochs, 2);
        assert!(summary.final_loss.is_none());
    }

    #[test]
    fn test_demo_rejects_active_strategy() {
        let mut strategy = SilentStrategy::new();
        strategy.on_train_begin(1).unwrap();

        let err = run_demo(&mut strategy, &quick(1, 1)).unwrap_err();
        assert!(err.is_ordering_violation());
    }
}
