//! Configuration loading and catalog path resolution
//!
//! Bootstrap settings come from a TOML file. Every field has a built-in
//! default, so a missing file is not an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable overriding the catalog location
pub const CATALOG_ENV_VAR: &str = "KBASE_CATALOG";

const DEFAULT_CATALOG_FILE: &str = "knowledge_base.json";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Path to the catalog JSON document
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    /// Rendered page served at `GET /` (produced by an external renderer)
    #[serde(default)]
    pub page_path: Option<PathBuf>,

    /// Directory holding cached overlays
    #[serde(default)]
    pub overlay_dir: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub enrichment: EnrichmentConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Upstream source and pacing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentConfig {
    #[serde(default = "default_arxiv_api_url")]
    pub arxiv_api_url: String,

    /// Host whose pages are scraped by the anthology adapter
    #[serde(default = "default_anthology_host")]
    pub anthology_host: String,

    /// Identifiers per bulk arXiv query
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between bulk queries
    #[serde(default = "default_batch_delay_secs")]
    pub batch_delay_secs: f64,

    /// Courtesy pause after each anthology page
    #[serde(default = "default_item_delay_secs")]
    pub item_delay_secs: f64,

    #[serde(default = "default_bulk_timeout_secs")]
    pub bulk_timeout_secs: u64,

    #[serde(default = "default_item_timeout_secs")]
    pub item_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl EnrichmentConfig {
    /// Out-of-range values (see [`Self::validate`]) read as no pause
    pub fn batch_delay(&self) -> Duration {
        delay_from_secs(self.batch_delay_secs)
    }

    pub fn item_delay(&self) -> Duration {
        delay_from_secs(self.item_delay_secs)
    }

    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    /// Reject settings that would stall or break a run
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::Config("enrichment.batch_size must be at least 1".to_string()));
        }
        if self.bulk_timeout_secs == 0 || self.item_timeout_secs == 0 {
            return Err(Error::Config("enrichment timeouts must be non-zero".to_string()));
        }
        for (name, secs) in [
            ("batch_delay_secs", self.batch_delay_secs),
            ("item_delay_secs", self.item_delay_secs),
        ] {
            if !(0.0..=MAX_DELAY_SECS).contains(&secs) {
                return Err(Error::Config(format!(
                    "enrichment.{} must be between 0 and {} seconds, got {}",
                    name, MAX_DELAY_SECS, secs
                )));
            }
        }
        Ok(())
    }
}

/// Longest accepted pause between requests
pub const MAX_DELAY_SECS: f64 = 3600.0;

fn delay_from_secs(secs: f64) -> Duration {
    if (0.0..=MAX_DELAY_SECS).contains(&secs) {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            arxiv_api_url: default_arxiv_api_url(),
            anthology_host: default_anthology_host(),
            batch_size: default_batch_size(),
            batch_delay_secs: default_batch_delay_secs(),
            item_delay_secs: default_item_delay_secs(),
            bulk_timeout_secs: default_bulk_timeout_secs(),
            item_timeout_secs: default_item_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8765
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_arxiv_api_url() -> String {
    "http://export.arxiv.org/api/query".to_string()
}

fn default_anthology_host() -> String {
    "aclanthology.org".to_string()
}

fn default_batch_size() -> usize {
    50
}

fn default_batch_delay_secs() -> f64 {
    3.0
}

fn default_item_delay_secs() -> f64 {
    1.0
}

fn default_bulk_timeout_secs() -> u64 {
    30
}

fn default_item_timeout_secs() -> u64 {
    15
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

/// Default config file: `<config dir>/kbase/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("kbase").join("config.toml"))
}

/// Load the TOML config
///
/// An explicit path must exist. Without one, the default location is tried
/// and built-in defaults are used when it is absent.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            _ => {
                debug!("No config file found, using built-in defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    config.enrichment.validate()?;

    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Catalog path resolution, highest priority first:
/// 1. Command-line argument
/// 2. `KBASE_CATALOG` environment variable
/// 3. TOML `catalog_path`
/// 4. `./knowledge_base.json`
pub fn resolve_catalog_path(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(CATALOG_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.catalog_path {
        return path.clone();
    }

    PathBuf::from(DEFAULT_CATALOG_FILE)
}

/// Overlay cache directory: TOML `overlay_dir`, else `<local data dir>/kbase`
pub fn resolve_overlay_dir(config: &TomlConfig) -> PathBuf {
    if let Some(dir) = &config.overlay_dir {
        return dir.clone();
    }
    dirs::data_local_dir()
        .map(|d| d.join("kbase"))
        .unwrap_or_else(|| PathBuf::from("./kbase_data"))
}
