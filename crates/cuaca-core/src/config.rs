use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream API base URLs
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Weather cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Weather preferences
    #[serde(default)]
    pub weather: WeatherConfig,
}

/// Base URLs for the three upstream endpoint families.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Serves `/prakiraan-cuaca?adm4={region}`
    #[serde(default = "default_forecast_base_url")]
    pub forecast_base_url: String,
    /// Serves `/autogempa.json`
    #[serde(default = "default_warning_base_url")]
    pub warning_base_url: String,
    /// Serves `/perairan`
    #[serde(default = "default_maritime_base_url")]
    pub maritime_base_url: String,
}

fn default_forecast_base_url() -> String {
    "https://api.bmkg.go.id/publik".to_string()
}

fn default_warning_base_url() -> String {
    "https://data.bmkg.go.id/DataMKG/TEWS".to_string()
}

fn default_maritime_base_url() -> String {
    "https://peta-maritim.bmkg.go.id/public_api".to_string()
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            forecast_base_url: default_forecast_base_url(),
            warning_base_url: default_warning_base_url(),
            maritime_base_url: default_maritime_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request deadline in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("Cuaca/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Directory holding one `{key}.json` file per cache entry
    #[serde(default = "default_cache_directory")]
    pub directory: PathBuf,

    /// Use the directory when it is writable. `false` forces the in-memory cache.
    #[serde(default = "default_prefer_durable")]
    pub prefer_durable: bool,

    #[serde(default = "default_forecast_ttl")]
    pub forecast_ttl_minutes: u64,

    #[serde(default = "default_warning_ttl")]
    pub warning_ttl_minutes: u64,

    #[serde(default = "default_maritime_ttl")]
    pub maritime_ttl_minutes: u64,
}

fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cuaca")
        .join("weather_cache")
}

fn default_prefer_durable() -> bool {
    true
}

fn default_forecast_ttl() -> u64 {
    30
}

fn default_warning_ttl() -> u64 {
    10
}

fn default_maritime_ttl() -> u64 {
    30
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: default_cache_directory(),
            prefer_durable: default_prefer_durable(),
            forecast_ttl_minutes: default_forecast_ttl(),
            warning_ttl_minutes: default_warning_ttl(),
            maritime_ttl_minutes: default_maritime_ttl(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// adm4 region code used when none is given
    #[serde(default = "default_region")]
    pub default_region: String,
}

fn default_region() -> String {
    "3171031001".to_string()
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            default_region: default_region(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config_path = Self::config_path()?;
        Self::load_validated_from(&config_path)
    }

    /// [`Config::load_validated`] against an explicit path.
    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(config_path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.endpoints.forecast_base_url,
            "endpoints.forecast_base_url",
            &mut result,
        );
        self.validate_url(
            &self.endpoints.warning_base_url,
            "endpoints.warning_base_url",
            &mut result,
        );
        self.validate_url(
            &self.endpoints.maritime_base_url,
            "endpoints.maritime_base_url",
            &mut result,
        );

        if self.http.request_timeout_secs == 0 {
            result.add_error(
                "http.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        } else if self.http.request_timeout_secs > 120 {
            result.add_warning(
                "http.request_timeout_secs",
                "Request timeout is unusually long (>120s)",
            );
        }

        for (field, minutes) in [
            ("cache.forecast_ttl_minutes", self.cache.forecast_ttl_minutes),
            ("cache.warning_ttl_minutes", self.cache.warning_ttl_minutes),
            ("cache.maritime_ttl_minutes", self.cache.maritime_ttl_minutes),
        ] {
            if minutes == 0 {
                result.add_warning(field, "Caching disabled (0 minutes)");
            } else if minutes > 1440 {
                result.add_warning(field, "Cache lifetime is more than 24 hours");
            }
        }

        if !self.cache.prefer_durable {
            result.add_warning(
                "cache.prefer_durable",
                "Durable cache disabled - cached data will not survive restarts",
            );
        }

        let region = self.weather.default_region.trim();
        if region.is_empty() {
            result.add_error("weather.default_region", "Region code must not be empty");
        } else if !region.chars().all(|c| c.is_ascii_digit() || c == '.') {
            result.add_warning(
                "weather.default_region",
                format!("Region code looks unusual: {}", region),
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::NotFound("no platform config directory".to_string()))?
            .join("cuaca");

        Ok(config_dir.join("config.toml"))
    }
}
