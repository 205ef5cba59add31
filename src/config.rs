use crate::constants::{self, DEFAULT_CACHE_PATH, DEFAULT_CACHE_TTL_SECS, DEFAULT_PORT};
use crate::error::{Result, ScraperError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

pub const CONFIG_PATH_ENV: &str = "BKE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub reference: ReferenceConfig,
    pub sources: SourcesConfig,
    pub normalization: NormalizationConfig,
    pub geocode: GeocodeConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            static_dir: PathBuf::from("static"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// File holding the persisted entry; `None` keeps the cache in memory only
    pub path: Option<PathBuf>,
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: Some(PathBuf::from(DEFAULT_CACHE_PATH)),
            ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            user_agent: constants::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReferenceConfig {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            name: constants::REFERENCE_NAME.to_string(),
            lat: constants::REFERENCE_LAT,
            lng: constants::REFERENCE_LNG,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Source names in registration order; earlier sources win deduplication ties
    pub enabled: Vec<String>,
    /// Serve labelled sample records when a live source fails
    pub fallback_samples: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            enabled: constants::get_supported_sources()
                .into_iter()
                .map(str::to_string)
                .collect(),
            fallback_samples: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatePrecision {
    Day,
    Minute,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub strip_punctuation: bool,
    pub date_precision: DatePrecision,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            strip_punctuation: true,
            date_precision: DatePrecision::Day,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeocodeConfig {
    /// Neighborhood or venue name (matched case-insensitively) -> [lat, lng]
    pub neighborhoods: BTreeMap<String, [f64; 2]>,
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            neighborhoods: constants::default_neighborhoods()
                .into_iter()
                .map(|(name, lat, lng)| (name.to_string(), [lat, lng]))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load from `$BKE_CONFIG` or `config.toml`. A missing file yields defaults.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut config = if config_path.exists() {
            let config_content = fs::read_to_string(&config_path).map_err(|e| {
                ScraperError::Config(format!(
                    "Failed to read config file '{}': {}",
                    config_path.display(),
                    e
                ))
            })?;
            let config = Self::from_toml(&config_content)?;
            info!("Loaded configuration from {}", config_path.display());
            config
        } else {
            info!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            Self::default()
        };

        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(port) => config.server.port = port,
                Err(_) => warn!("Ignoring invalid PORT value '{}'", port),
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.reference.lat)
            || !(-180.0..=180.0).contains(&self.reference.lng)
        {
            return Err(ScraperError::Config(format!(
                "reference point ({}, {}) is out of range",
                self.reference.lat, self.reference.lng
            )));
        }
        if self.cache.ttl_secs == 0 {
            return Err(ScraperError::Config("cache.ttl_secs must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.cache.ttl(), Duration::from_secs(3600));
        assert_eq!(config.sources.enabled.len(), 5);
        assert!(config.geocode.neighborhoods.contains_key("prospect park"));
        assert_eq!(config.normalization.date_precision, DatePrecision::Day);
    }

    #[test]
    fn partial_sections_override_only_named_keys() {
        let config = Config::from_toml(
            r#"
            [cache]
            ttl_secs = 120

            [sources]
            enabled = ["wagmag"]

            [normalization]
            date_precision = "minute"

            [geocode.neighborhoods]
            "bushwick" = [40.6944, -73.9213]
            "#,
        )
        .unwrap();

        assert_eq!(config.cache.ttl_secs, 120);
        assert_eq!(config.cache.path, Some(PathBuf::from(DEFAULT_CACHE_PATH)));
        assert_eq!(config.sources.enabled, vec!["wagmag".to_string()]);
        assert!(config.sources.fallback_samples);
        assert_eq!(config.normalization.date_precision, DatePrecision::Minute);
        assert!(config.normalization.strip_punctuation);
        assert_eq!(config.geocode.neighborhoods.len(), 1);
        assert_eq!(config.geocode.neighborhoods["bushwick"], [40.6944, -73.9213]);
    }

    #[test]
    fn rejects_out_of_range_reference() {
        let config = Config::from_toml("[reference]\nlat = 120.0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
