//! Metric display helpers

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which loss value a strategy shows while an epoch is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetricDisplay {
    /// The most recent batch loss, labelled `loss`
    #[default]
    Latest,
    /// Mean of the epoch's batch losses so far, labelled `mean_loss`
    RunningMean,
    /// Both of the above
    Both,
}

/// Running mean over the current epoch's batch losses
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    count: u64,
    sum: f64,
    latest: Option<f64>,
}

impl RunningMean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.latest = Some(value);
    }

    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn latest(&self) -> Option<f64> {
        self.latest
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Labelled text for the values selected by `mode`
    ///
    /// Empty until the first value is pushed.
    pub fn describe(&self, mode: MetricDisplay) -> String {
        debug!(?mode, count = %self.count, "RunningMean::describe: called");
        let mut parts = Vec::with_capacity(2);
        let show_latest = matches!(mode, MetricDisplay::Latest | MetricDisplay::Both);
        let show_mean = matches!(mode, MetricDisplay::RunningMean | MetricDisplay::Both);
        if let (true, Some(latest)) = (show_latest, self.latest) {
            parts.push(format_metric("loss", latest));
        }
        if let (true, Some(mean)) = (show_mean, self.mean()) {
            parts.push(format_metric("mean_loss", mean));
        }
        parts.join(" ")
    }
}

/// `name=value` with four decimals
pub fn format_metric(name: &str, value: f64) -> String {
    format!("{}={:.4}", name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut m = RunningMean::new();
        assert_eq!(m.mean(), None);

        m.push(1.0);
        m.push(0.5);
        m.push(0.0);
        assert_eq!(m.count(), 3);
        assert_eq!(m.latest(), Some(0.0));
        assert!((m.mean().unwrap() - 0.5).abs() < 1e-12);

        m.reset();
        assert_eq!(m.count(), 0);
        assert_eq!(m.latest(), None);
    }

    #[test]
    fn test_describe_labels_what_it_shows() {
        let mut m = RunningMean::new();
        assert_eq!(m.describe(MetricDisplay::Both), "");

        m.push(0.25);
        m.push(0.75);
        assert_eq!(m.describe(MetricDisplay::Latest), "loss=0.7500");
        assert_eq!(m.describe(MetricDisplay::RunningMean), "mean_loss=0.5000");
        assert_eq!(m.describe(MetricDisplay::Both), "loss=0.7500 mean_loss=0.5000");
    }

    #[test]
    fn test_metric_display_serde() {
        let d: MetricDisplay = serde_yaml::from_str("running-mean").unwrap();
        assert_eq!(d, MetricDisplay::RunningMean);
        assert_eq!(serde_yaml::to_string(&MetricDisplay::Both).unwrap().trim(), "both");
    }
}
