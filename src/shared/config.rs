use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::shared::errors::ConfigError;
use crate::shared::types::TrackedToken;

pub const API_KEY_ENV: &str = "LEVELWATCH_API_KEY";
pub const BOT_TOKEN_ENV: &str = "LEVELWATCH_BOT_TOKEN";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketDataCfg {
    pub base_url: String,
    pub api_key: Option<String>,
    pub network: String,
    pub timeframe: String,
    pub aggregate: u32,
    /// Bars requested per live update
    pub limit: u32,
    /// Bars requested per backfill page
    pub backfill_limit: u32,
    pub backfill_days: Option<u32>,
    pub request_timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub page_delay_ms: u64,
}

impl Default for MarketDataCfg {
    fn default() -> Self {
        Self {
            base_url: "https://pro-api.coingecko.com/api/v3".to_string(),
            api_key: None,
            network: "solana".to_string(),
            timeframe: "minute".to_string(),
            aggregate: 15,
            limit: 10,
            backfill_limit: 1000,
            backfill_days: None,
            request_timeout_secs: 10,
            max_attempts: 3,
            backoff_base_ms: 1000,
            page_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NotifierCfg {
    pub bot_token: Option<String>,
    pub api_base: String,
    pub parse_mode: String,
}

impl Default for NotifierCfg {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base: "https://api.telegram.org".to_string(),
            parse_mode: "HTML".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DetectorCfg {
    pub window: usize,
    pub proximity_threshold: f64,
    pub merge_threshold: f64,
    pub strength_band: f64,
    /// Only the most recent `max_bars` feed detection when set
    pub max_bars: Option<usize>,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            window: 20,
            proximity_threshold: 0.02,
            merge_threshold: 0.20,
            strength_band: 0.02,
            max_bars: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearmPolicy {
    /// Key re-arms only once the cooldown has elapsed
    Cooldown,
    /// Key is cleared as soon as the price leaves the threshold band
    ClearOnDeparture,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsCfg {
    pub alert_threshold: f64,
    pub cooldown_secs: u64,
    pub frequency_floor: usize,
    pub rearm_policy: RearmPolicy,
    pub persist_state: bool,
}

impl Default for AlertsCfg {
    fn default() -> Self {
        Self {
            alert_threshold: 0.01,
            cooldown_secs: 4 * 3600,
            frequency_floor: 3,
            rearm_policy: RearmPolicy::Cooldown,
            persist_state: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    pub max_concurrent_fetches: usize,
    pub run_on_start: bool,
}

impl Default for SchedulerCfg {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            max_concurrent_fetches: 1,
            run_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingCfg {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingCfg {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub data_root: PathBuf,
    #[serde(default)]
    pub market_data: MarketDataCfg,
    #[serde(default)]
    pub notifier: NotifierCfg,
    #[serde(default)]
    pub detector: DetectorCfg,
    #[serde(default)]
    pub alerts: AlertsCfg,
    #[serde(default)]
    pub scheduler: SchedulerCfg,
    #[serde(default)]
    pub logging: LoggingCfg,
    #[serde(default)]
    pub tokens: Vec<TrackedToken>,
}

impl AppConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s)?;
        Ok(cfg)
    }

    /// Fill missing secrets from `LEVELWATCH_API_KEY` / `LEVELWATCH_BOT_TOKEN`.
    pub fn with_env_secrets(mut self) -> Self {
        if self.market_data.api_key.is_none() {
            self.market_data.api_key = std::env::var(API_KEY_ENV).ok();
        }
        if self.notifier.bot_token.is_none() {
            self.notifier.bot_token = std::env::var(BOT_TOKEN_ENV).ok();
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Validation(msg.to_string()));

        if self.detector.window == 0 {
            return invalid("detector.window must be at least 1");
        }
        if self.detector.proximity_threshold <= 0.0 || self.detector.merge_threshold <= 0.0 {
            return invalid("detector thresholds must be positive");
        }
        if self.alerts.alert_threshold <= 0.0 {
            return invalid("alerts.alert_threshold must be positive");
        }
        if self.scheduler.interval_secs == 0 {
            return invalid("scheduler.interval_secs must be positive");
        }
        if self.market_data.max_attempts == 0 {
            return invalid("market_data.max_attempts must be at least 1");
        }
        if self.tokens.is_empty() {
            return invalid("no [[tokens]] configured");
        }

        let mut seen = HashSet::new();
        for token in &self.tokens {
            if !seen.insert(token.symbol.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate token symbol: {}",
                    token.symbol
                )));
            }
        }
        Ok(())
    }

    pub fn token_dir(&self) -> PathBuf {
        self.data_root.join("token")
    }
}
