//! Engine configuration.
//!
//! # Responsibility
//! - Hold tunables for storage location, logging and feed pagination.
//! - Load them from JSON or from `PAGENOTE_*` environment variables.
//!
//! # Invariants
//! - Every field has a default; an empty JSON object is a valid config.
//! - Loaded configs are validated before they are returned.

use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_DB_PATH: &str = "PAGENOTE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "PAGENOTE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PAGENOTE_LOG_DIR";

const DEFAULT_DB_PATH: &str = "pagenote.sqlite3";

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

/// Timeline pagination tunables.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Used when a caller passes `limit = 0`.
    pub default_limit: u32,
    pub max_limit: u32,
    /// Each source fetches `limit * over_fetch_factor` rows.
    pub over_fetch_factor: u32,
    pub max_page_images: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            max_limit: 100,
            over_fetch_factor: 2,
            max_page_images: 4,
        }
    }
}

impl FeedConfig {
    /// Applies the default for `0` and caps at `max_limit`.
    pub fn normalize_limit(&self, requested: u32) -> u32 {
        if requested == 0 {
            self.default_limit
        } else {
            requested.min(self.max_limit)
        }
    }

    pub fn fetch_window(&self, limit: u32) -> u32 {
        limit.saturating_mul(self.over_fetch_factor)
    }
}

/// Top-level configuration for the core and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub log_dir: Option<PathBuf>,
    pub feed: FeedConfig,
    pub summary_max_chars: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: crate::logging::default_log_level().to_string(),
            log_dir: None,
            feed: FeedConfig::default(),
            summary_max_chars: 100,
        }
    }
}

impl CoreConfig {
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Defaults overridden by `PAGENOTE_*` variables of the process.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(path) = lookup(ENV_DB_PATH).filter(|value| !value.trim().is_empty()) {
            config.db_path = PathBuf::from(path.trim());
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|value| !value.trim().is_empty()) {
            config.log_level = level.trim().to_string();
        }
        if let Some(dir) = lookup(ENV_LOG_DIR).filter(|value| !value.trim().is_empty()) {
            config.log_dir = Some(PathBuf::from(dir.trim()));
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let feed = &self.feed;
        if feed.max_limit == 0 {
            return Err(ConfigError::Invalid("feed.max_limit must be positive".into()));
        }
        if feed.default_limit == 0 || feed.default_limit > feed.max_limit {
            return Err(ConfigError::Invalid(format!(
                "feed.default_limit must be within 1..={}",
                feed.max_limit
            )));
        }
        if feed.over_fetch_factor == 0 {
            return Err(ConfigError::Invalid(
                "feed.over_fetch_factor must be positive".into(),
            ));
        }
        if self.summary_max_chars == 0 {
            return Err(ConfigError::Invalid(
                "summary_max_chars must be positive".into(),
            ));
        }
        Ok(())
    }
}
