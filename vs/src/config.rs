//! Configuration types, loading and strategy construction

use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::metrics::MetricDisplay;
use crate::notify::{DEFAULT_BASE_URL, NotifyingStrategy, TelegramClient};
use crate::strategies::{
    CompositeStrategy, DisplayMode, FileLoggingStrategy, Layout, PrintStrategy, ProgressBarOptions,
    ProgressBarStrategy, SilentStrategy,
};
use crate::strategy::VerbosityStrategy;

/// Which strategy to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// No output at all
    Silent,
    /// Plain lines on stdout
    Print,
    /// Timestamped lines in `log-file`
    File,
    /// Epoch and batch progress bars
    #[default]
    Progress,
    /// Every strategy listed in `members`
    Composite,
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Strategy to build
    pub strategy: StrategyKind,

    /// Where progress bars are drawn
    pub display: DisplayMode,

    /// Nested or sequential bars
    pub layout: Layout,

    /// Loss value shown while an epoch runs
    pub metric: MetricDisplay,

    /// Output file for the `file` strategy
    #[serde(rename = "log-file")]
    pub log_file: PathBuf,

    /// Members of the `composite` strategy
    pub members: Vec<StrategyKind>,

    /// Optional Telegram notifications around the chosen strategy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramConfig>,
}

fn default_log_file() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("verbosity")
        .join("training.log")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyKind::default(),
            display: DisplayMode::default(),
            layout: Layout::default(),
            metric: MetricDisplay::default(),
            log_file: default_log_file(),
            members: vec![StrategyKind::Progress, StrategyKind::File],
            telegram: None,
        }
    }
}

impl Config {
    /// Load `config_path`, or the first config found in [`Config::search_paths`]
    ///
    /// An explicit path must load. Found files that fail to parse are skipped
    /// with a warning, and defaults apply when nothing loads.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        match Self::load_first(&Self::search_paths()) {
            Some(config) => Ok(config),
            None => {
                tracing::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Project-local `.verbosity.yml`, then `verbosity/verbosity.yml` in the user config dir
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".verbosity.yml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("verbosity").join("verbosity.yml"));
        }
        paths
    }

    fn load_first(paths: &[PathBuf]) -> Option<Self> {
        for path in paths.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return Some(config),
                Err(e) => tracing::warn!(path = %path.display(), "Config::load: skipping config: {:#}", e),
            }
        }
        None
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        let config = serde_yaml::from_str(&content).context(format!("Failed to parse {}", path.display()))?;
        tracing::info!(path = %path.display(), "Config::load_from_file: loaded");
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_yaml()?;
        fs::write(path, content).context(format!("Failed to write config to {}", path.display()))?;
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config")
    }

    /// Options for the `progress` strategy
    pub fn progress_options(&self) -> ProgressBarOptions {
        ProgressBarOptions {
            display: self.display,
            layout: self.layout,
            metric: self.metric,
            ..Default::default()
        }
    }
}

/// Telegram notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Environment variable containing the bot token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Chat that receives the messages
    #[serde(rename = "chat-id")]
    pub chat_id: String,

    /// Bot API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Send a summary after every epoch, not only at the run boundaries
    #[serde(rename = "epoch-summaries")]
    pub epoch_summaries: bool,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: "TELEGRAM_BOT_TOKEN".to_string(),
            chat_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
            epoch_summaries: false,
        }
    }
}

/// Build the configured strategy, wrapped for notifications when enabled
pub fn build_strategy(config: &Config) -> Result<Box<dyn VerbosityStrategy>> {
    tracing::debug!(strategy = ?config.strategy, telegram = config.telegram.is_some(), "build_strategy: called");
    let strategy = build_kind(config, config.strategy)?;

    let Some(telegram) = &config.telegram else {
        return Ok(strategy);
    };
    if telegram.chat_id.is_empty() {
        bail!("telegram.chat-id must be set when telegram notifications are enabled");
    }
    let client = TelegramClient::from_env(
        &telegram.token_env,
        telegram.chat_id.clone(),
        telegram.base_url.clone(),
        Duration::from_millis(telegram.timeout_ms),
    )
    .context("Failed to set up Telegram notifications")?;
    Ok(Box::new(
        NotifyingStrategy::new(strategy, client).with_epoch_summaries(telegram.epoch_summaries),
    ))
}

fn build_kind(config: &Config, kind: StrategyKind) -> Result<Box<dyn VerbosityStrategy>> {
    let strategy: Box<dyn VerbosityStrategy> = match kind {
        StrategyKind::Silent => Box::new(SilentStrategy::new()),
        StrategyKind::Print => Box::new(PrintStrategy::new()),
        StrategyKind::File => Box::new(FileLoggingStrategy::new(config.log_file.clone())),
        StrategyKind::Progress => Box::new(ProgressBarStrategy::new(config.progress_options())),
        StrategyKind::Composite => {
            if config.members.is_empty() {
                bail!("composite strategy needs at least one member");
            }
            let mut members = Vec::with_capacity(config.members.len());
            for member in &config.members {
                if *member == StrategyKind::Composite {
                    bail!("composite members cannot themselves be composite");
                }
                members.push(build_kind(config, *member)?);
            }
            Box::new(CompositeStrategy::new(members))
        }
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Phase;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.strategy, StrategyKind::Progress);
        assert_eq!(config.display, DisplayMode::Auto);
        assert_eq!(config.layout, Layout::Nested);
        assert_eq!(config.metric, MetricDisplay::Latest);
        assert!(config.log_file.ends_with("verbosity/training.log"));
        assert!(config.telegram.is_none());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
strategy: composite
display: lines
layout: sequential
metric: running-mean
log-file: /tmp/run.log
members: [print, file]
telegram:
  token-env: MY_BOT_TOKEN
  chat-id: "-100123"
  timeout-ms: 2500
  epoch-summaries: true
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.strategy, StrategyKind::Composite);
        assert_eq!(config.display, DisplayMode::Lines);
        assert_eq!(config.layout, Layout::Sequential);
        assert_eq!(config.metric, MetricDisplay::RunningMean);
        assert_eq!(config.log_file, PathBuf::from("/tmp/run.log"));
        assert_eq!(config.members, vec![StrategyKind::Print, StrategyKind::File]);

        let telegram = config.telegram.unwrap();
        assert_eq!(telegram.token_env, "MY_BOT_TOKEN");
        assert_eq!(telegram.chat_id, "-100123");
        assert_eq!(telegram.base_url, DEFAULT_BASE_URL);
        assert_eq!(telegram.timeout_ms, 2500);
        assert!(telegram.epoch_summaries);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("strategy: silent\n").unwrap();

        assert_eq!(config.strategy, StrategyKind::Silent);
        assert_eq!(config.display, DisplayMode::Auto);
        assert_eq!(config.members, vec![StrategyKind::Progress, StrategyKind::File]);
    }

    #[test]
    fn test_unknown_strategy_rejected() {
        let result: std::result::Result<Config, _> = serde_yaml::from_str("strategy: tqdm\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("verbosity.yml");
        fs::write(&path, "strategy: print\nmetric: both\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.strategy, StrategyKind::Print);
        assert_eq!(config.metric, MetricDisplay::Both);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.yml");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("missing.yml"));
    }

    #[test]
    fn test_search_paths_prefer_project_local() {
        let paths = Config::search_paths();
        assert_eq!(paths[0], PathBuf::from(".verbosity.yml"));
        assert!(paths.iter().skip(1).all(|p| p.ends_with("verbosity/verbosity.yml")));
    }

    #[test]
    fn test_load_first_skips_unparseable_file() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.yml");
        let broken = temp.path().join("broken.yml");
        let good = temp.path().join("good.yml");
        fs::write(&broken, "strategy: [unterminated").unwrap();
        fs::write(&good, "strategy: print\n").unwrap();

        let config = Config::load_first(&[missing.clone(), broken, good]).unwrap();
        assert_eq!(config.strategy, StrategyKind::Print);
        assert!(Config::load_first(&[missing]).is_none());
    }

    #[test]
    fn test_save_then_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("saved.yml");
        let config = Config {
            strategy: StrategyKind::File,
            log_file: temp.path().join("out.log"),
            ..Default::default()
        };

        config.save(&path).unwrap();
        let loaded = Config::load(Some(&path)).unwrap();
        assert_eq!(loaded.strategy, StrategyKind::File);
        assert_eq!(loaded.log_file, temp.path().join("out.log"));
    }

    #[test]
    fn test_to_yaml_uses_kebab_keys() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("log-file:"));
        assert!(yaml.contains("strategy: progress"));
        assert!(!yaml.contains("telegram"));
    }

    #[test]
    fn test_build_each_strategy() {
        let temp = TempDir::new().unwrap();
        for kind in [
            StrategyKind::Silent,
            StrategyKind::Print,
            StrategyKind::File,
            StrategyKind::Progress,
            StrategyKind::Composite,
        ] {
            let config = Config {
                strategy: kind,
                display: DisplayMode::Hidden,
                log_file: temp.path().join("run.log"),
                ..Default::default()
            };
            let strategy = build_strategy(&config).unwrap();
            assert_eq!(strategy.phase(), Phase::Uninitialized, "{:?}", kind);
        }
    }

    #[test]
    fn test_build_rejects_bad_composite() {
        let nested = Config {
            strategy: StrategyKind::Composite,
            members: vec![StrategyKind::Silent, StrategyKind::Composite],
            ..Default::default()
        };
        assert!(build_strategy(&nested).is_err());

        let empty = Config {
            strategy: StrategyKind::Composite,
            members: Vec::new(),
            ..Default::default()
        };
        assert!(build_strategy(&empty).is_err());
    }

    #[test]
    fn test_build_telegram_requires_token() {
        let config = Config {
            strategy: StrategyKind::Silent,
            telegram: Some(TelegramConfig {
                token_env: "VS_CONFIG_TEST_TOKEN_UNSET".to_string(),
                chat_id: "1".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };

        match build_strategy(&config) {
            Err(err) => assert!(format!("{:#}", err).contains("VS_CONFIG_TEST_TOKEN_UNSET")),
            Ok(_) => panic!("expected a missing token error"),
        }
    }

    #[test]
    fn test_build_telegram_requires_chat_id() {
        let config = Config {
            strategy: StrategyKind::Silent,
            telegram: Some(TelegramConfig::default()),
            ..Default::default()
        };
        assert!(build_strategy(&config).is_err());
    }
}
