use anyhow::{Result, bail};
use backon::ExponentialBuilder;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub timestamp_service: TimestampServiceSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

/// Block explorer used to look up funding transaction confirmation times
#[derive(Debug, Clone, Deserialize)]
pub struct TimestampServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Total attempts per transaction, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    /// Delay before the first retry; doubles on every subsequent retry
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Pause between consecutive lookups, 0 disables pacing
    #[serde(default)]
    pub request_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportSettings {
    #[serde(default = "default_channels_path")]
    pub channels_path: PathBuf,
    #[serde(default = "default_forwarding_path")]
    pub forwarding_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
}

impl TimestampServiceSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    /// Waits `base * 2^attempt` between attempts, no jitter.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(Duration::from_millis(self.backoff_base_ms))
            .with_max_times(self.max_attempts.saturating_sub(1))
    }
}

impl Settings {
    /// Layers an optional TOML file, then `PEER_REPORT__*` environment variables.
    ///
    /// Without an explicit path, `config/default.toml` is used when it exists.
    pub fn new<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut builder = Config::builder();

        match path {
            Some(file) => {
                builder = builder.add_source(File::from(file.as_ref()).required(true));
            }
            None => {
                builder = builder.add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false));
            }
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("PEER_REPORT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|config| config.try_deserialize())?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let service = &self.timestamp_service;
        if service.base_url.trim().is_empty() {
            bail!("timestamp_service.base_url must not be empty");
        }
        if service.timeout_secs == 0 {
            bail!("timestamp_service.timeout_secs must be greater than 0");
        }
        if service.max_attempts == 0 {
            bail!("timestamp_service.max_attempts must be at least 1");
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            timestamp_service: TimestampServiceSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

impl Default for TimestampServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            request_interval_ms: 0,
        }
    }
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            channels_path: default_channels_path(),
            forwarding_path: default_forwarding_path(),
            output_path: default_output_path(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_base_url() -> String {
    "https://mempool.space/api".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_max_attempts() -> usize {
    3
}

fn default_backoff_base_ms() -> u64 {
    1000 // 1s
}

fn default_channels_path() -> PathBuf {
    PathBuf::from("listChannels")
}

fn default_forwarding_path() -> PathBuf {
    PathBuf::from("fwdingHistory")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("peer_activity_report.csv")
}
