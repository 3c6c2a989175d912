/// Monitor configuration loader - parses monitor.toml
///
/// Keeps the datastore endpoint, fallback file location, cache lifetime and
/// column-matching vocabulary out of the code. Every key has a default, so
/// a missing file (or a file with only some sections) is fine; a file that
/// exists but is not valid TOML is an error.
///
/// Path lookup order:
///   1. `--config PATH` on the command line
///   2. `MONITOR_CONFIG` (environment or `.env`)
///   3. `monitor.toml` in the working directory

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::ingest::datastore::{FetchPlan, DEFAULT_BASE_URL, KINNERET_RESOURCE_ID};
use crate::loader::{LoaderSettings, DEFAULT_FALLBACK_PATH};
use crate::normalize::columns::ColumnCandidates;

pub const DEFAULT_CONFIG_PATH: &str = "monitor.toml";
pub const CONFIG_PATH_VAR: &str = "MONITOR_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub datastore: DatastoreConfig,
    pub fallback: FallbackConfig,
    pub cache: CacheConfig,
    pub columns: ColumnsConfig,
    pub endpoint: EndpointConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatastoreConfig {
    pub base_url: String,
    pub resource_id: String,
    pub single_page_limit: usize,
    pub batch_size: usize,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        let plan = FetchPlan::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            resource_id: KINNERET_RESOURCE_ID.to_string(),
            single_page_limit: plan.single_page_limit,
            batch_size: plan.batch_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub path: PathBuf,
    pub refresh_on_success: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_FALLBACK_PATH),
            refresh_on_success: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        const MAX_TTL_SECS: u64 = (i64::MAX / 1000) as u64;
        Duration::seconds(self.ttl_secs.min(MAX_TTL_SECS) as i64)
    }
}

/// Extra field-name fragments, appended to the built-in candidate terms.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub extra_date_terms: Vec<String>,
    pub extra_level_terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub port: u16,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl MonitorConfig {
    /// Loader settings derived from the `[datastore]`, `[fallback]` and
    /// `[columns]` sections.
    pub fn loader_settings(&self) -> LoaderSettings {
        LoaderSettings {
            resource_id: self.datastore.resource_id.clone(),
            plan: FetchPlan {
                single_page_limit: self.datastore.single_page_limit,
                batch_size: self.datastore.batch_size,
            },
            fallback_path: self.fallback.path.clone(),
            candidates: ColumnCandidates::default()
                .extended(&self.columns.extra_date_terms, &self.columns.extra_level_terms),
            refresh_fallback_on_success: self.fallback.refresh_on_success,
        }
    }
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<MonitorConfig, ConfigError> {
    Ok(toml::from_str(contents)?)
}

/// Loads configuration from `path`. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<MonitorConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            info!(path = %path.display(), "loaded configuration");
            parse_config(&contents)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no configuration file, using defaults");
            Ok(MonitorConfig::default())
        }
        Err(e) => Err(ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        }),
    }
}

/// Picks the config path: explicit argument, then `MONITOR_CONFIG`, then
/// `monitor.toml`. Loads `.env` first so the variable can live there.
pub fn resolve_config_path(explicit: Option<&str>) -> PathBuf {
    if let Some(path) = explicit {
        return PathBuf::from(path);
    }
    dotenv::dotenv().ok();
    std::env::var(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.datastore.resource_id, KINNERET_RESOURCE_ID);
        assert_eq!(config.cache.ttl(), Duration::hours(1));
        assert_eq!(config.fallback.path, PathBuf::from("water_level.csv"));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [datastore]
            batch_size = 500

            [endpoint]
            port = 9100
            "#,
        )
        .unwrap();
        assert_eq!(config.datastore.batch_size, 500);
        assert_eq!(config.datastore.single_page_limit, 32_000);
        assert_eq!(config.datastore.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.endpoint.port, 9100);
    }

    #[test]
    fn test_loader_settings_carry_extra_terms() {
        let config = parse_config(
            r#"
            [fallback]
            path = "data/levels.csv"
            refresh_on_success = true

            [columns]
            extra_date_terms = ["Measured"]
            extra_level_terms = ["height"]
            "#,
        )
        .unwrap();
        let settings = config.loader_settings();
        assert_eq!(settings.fallback_path, PathBuf::from("data/levels.csv"));
        assert!(settings.refresh_fallback_on_success);
        assert!(settings.candidates.date_terms.contains(&"measured".to_string()));
        assert!(settings.candidates.level_terms.contains(&"height".to_string()));
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let result = parse_config("[datastore\nbatch_size = ");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_wrong_type_is_error() {
        let result = parse_config("[endpoint]\nport = \"eighty\"\n");
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("kinneret_no_config_{}.toml", std::process::id()));
        assert_eq!(load_config_from(&path).unwrap(), MonitorConfig::default());
    }

    #[test]
    fn test_shipped_monitor_toml_matches_defaults() {
        let config = load_config_from(Path::new(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(config, MonitorConfig::default(), "monitor.toml documents the defaults");
    }

    #[test]
    fn test_explicit_path_wins() {
        assert_eq!(resolve_config_path(Some("custom.toml")), PathBuf::from("custom.toml"));
    }
}
