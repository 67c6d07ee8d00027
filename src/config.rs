//! # Configuration Management Module
//!
//! ## Purpose
//! Centralized configuration for the legislative data pipeline: fetch
//! behavior, data directory layout, scrape targets, corpus load policy, and
//! logging.
//!
//! ## Configuration Sources (in order of precedence)
//! 1. Environment variables (`CONGRESS_PIPELINE_*`)
//! 2. Configuration file (TOML)
//! 3. Default values
//!
//! ## Usage
//! ```rust,no_run
//! use congress_pipeline::config::Config;
//!
//! let config = Config::from_file("config.toml").unwrap();
//! println!("data root: {:?}", config.data.root_dir);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::{PipelineError, Result};

/// Main configuration structure containing all pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Fetch cache and HTTP client settings
    pub fetch: FetchConfig,
    /// Data directory layout
    pub data: DataConfig,
    /// Scrape target URLs
    pub scrape: ScrapeConfig,
    /// Corpus load behavior
    pub corpus: CorpusConfig,
    /// Query engine behavior
    pub query: QueryConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// Fetch cache and HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// User agent sent with every request
    pub user_agent: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum concurrent fetches across a scrape batch
    pub max_concurrent_fetches: usize,
    /// Re-download even when a cache file exists
    pub force_reload: bool,
}

/// Data directory layout. Every entity type keeps a `web/` directory of
/// verbatim cached markup and a `json/` directory of persisted records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Root of the on-disk data tree
    pub root_dir: PathBuf,
}

/// The entity families the data tree is partitioned by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Bill,
    Representative,
    Vote,
    Session,
}

impl EntityKind {
    /// Directory name for this entity family
    pub fn dir_name(self) -> &'static str {
        match self {
            EntityKind::Bill => "bills",
            EntityKind::Representative => "reps",
            EntityKind::Vote => "votes",
            EntityKind::Session => "session",
        }
    }
}

impl DataConfig {
    /// Directory holding verbatim cached markup for one entity family
    pub fn cache_dir(&self, kind: EntityKind) -> PathBuf {
        self.root_dir.join(kind.dir_name()).join("web")
    }

    /// Directory holding persisted JSON records for one entity family
    pub fn json_dir(&self, kind: EntityKind) -> PathBuf {
        self.root_dir.join(kind.dir_name()).join("json")
    }
}

/// Scrape target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Root of the legislative site (bill and member pages)
    pub root_url: String,
    /// Roster listing page used to discover member detail URLs
    pub roster_url: String,
    /// Root of the clerk feeds (roll-call and floor-proceedings XML)
    pub clerk_url: String,
    /// Default floor proceedings document
    pub default_floor_source: String,
}

/// Corpus load configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Skip malformed persisted documents instead of aborting the load.
    /// Off by default: a single corrupt document fails the whole load, and
    /// turning this on is logged as a deviation from that behavior.
    pub skip_malformed: bool,
}

/// Query engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Memoize per-(group, key, value) result sets
    pub enable_memo: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Emit JSON-structured log lines
    pub json_format: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            data: DataConfig::default(),
            scrape: ScrapeConfig::default(),
            corpus: CorpusConfig::default(),
            query: QueryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "congress-pipeline/0.1".to_string(),
            timeout_seconds: 30,
            max_concurrent_fetches: num_cpus::get(),
            force_reload: false,
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("data/us/federal/house"),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            root_url: "https://www.congress.gov".to_string(),
            roster_url: "https://www.house.gov/representatives".to_string(),
            clerk_url: "https://clerk.house.gov".to_string(),
            default_floor_source: "HDoc-116-1-FloorProceedings.xml".to_string(),
        }
    }
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            skip_malformed: false,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self { enable_memo: true }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when no file exists
    pub fn load() -> Result<Self> {
        Self::from_file("config.toml")
    }

    /// Load configuration from a specific file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content)?
        } else {
            tracing::warn!("configuration file not found: {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(root) = std::env::var("CONGRESS_PIPELINE_DATA_ROOT") {
            self.data.root_dir = PathBuf::from(root);
        }
        if let Ok(level) = std::env::var("CONGRESS_PIPELINE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(workers) = std::env::var("CONGRESS_PIPELINE_FETCH_WORKERS") {
            self.fetch.max_concurrent_fetches =
                workers.parse().map_err(|_| PipelineError::Config {
                    message: "invalid worker count in CONGRESS_PIPELINE_FETCH_WORKERS".to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.fetch.timeout_seconds == 0 {
            return Err(PipelineError::Config {
                message: "fetch.timeout_seconds cannot be zero".to_string(),
            });
        }
        if self.fetch.max_concurrent_fetches == 0 {
            return Err(PipelineError::Config {
                message: "fetch.max_concurrent_fetches cannot be zero".to_string(),
            });
        }
        for base in [&self.scrape.root_url, &self.scrape.clerk_url] {
            url::Url::parse(base).map_err(|e| PipelineError::Config {
                message: format!("invalid scrape URL {base:?}: {e}"),
            })?;
        }
        Ok(())
    }
}
