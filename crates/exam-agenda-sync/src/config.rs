//! Environment configuration.

use std::time::Duration;

use exam_agenda_core::listing::DEFAULT_PAGE_SIZE;
use thiserror::Error;

pub const ENV_API_URL: &str = "EXAM_AGENDA_API_URL";
pub const ENV_TOKEN: &str = "EXAM_AGENDA_TOKEN";
pub const ENV_UNIT_ID: &str = "EXAM_AGENDA_UNIT_ID";
pub const ENV_TIMEOUT_SECS: &str = "EXAM_AGENDA_TIMEOUT_SECS";
pub const ENV_PAGE_SIZE: &str = "EXAM_AGENDA_PAGE_SIZE";
pub const ENV_FETCH_BATCH: &str = "EXAM_AGENDA_FETCH_BATCH";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FETCH_BATCH: usize = 20;

/// Configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AgendaConfig {
    /// Base URL, without trailing slash
    pub api_url: String,
    pub token: Option<String>,
    /// The user's unit; 0 marks a consolidator who sees every clinic
    pub unit_id: Option<i64>,
    pub timeout: Duration,
    pub page_size: usize,
    /// Concurrent catalog lookups per batch
    pub fetch_batch: usize,
}

impl AgendaConfig {
    /// Create a config with defaults for everything but the URL.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
            unit_id: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PAGE_SIZE,
            fetch_batch: DEFAULT_FETCH_BATCH,
        }
    }

    /// Read from the process environment.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through an arbitrary lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_url = get(ENV_API_URL).ok_or(ConfigError::Missing(ENV_API_URL))?;
        let mut config = Self::new(api_url);
        config.token = get(ENV_TOKEN);
        config.unit_id = parse_opt(ENV_UNIT_ID, get(ENV_UNIT_ID))?;
        if let Some(secs) = parse_opt::<u64>(ENV_TIMEOUT_SECS, get(ENV_TIMEOUT_SECS))? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_opt::<usize>(ENV_PAGE_SIZE, get(ENV_PAGE_SIZE))? {
            config.page_size = positive(ENV_PAGE_SIZE, size)?;
        }
        if let Some(batch) = parse_opt::<usize>(ENV_FETCH_BATCH, get(ENV_FETCH_BATCH))? {
            config.fetch_batch = positive(ENV_FETCH_BATCH, batch)?;
        }

        Ok(config)
    }

    pub fn is_consolidator(&self) -> bool {
        self.unit_id == Some(0)
    }

    /// Unit filter for the listing; consolidators see every unit.
    pub fn listing_unit(&self) -> Option<i64> {
        self.unit_id.filter(|id| *id != 0)
    }
}

fn parse_opt<T: std::str::FromStr>(key: &'static str, value: Option<String>) -> ConfigResult<Option<T>> {
    value
        .map(|v| v.parse().map_err(|_| ConfigError::Invalid { key, value: v }))
        .transpose()
}

fn positive(key: &'static str, value: usize) -> ConfigResult<usize> {
    if value == 0 {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    } else {
        Ok(value)
    }
}
