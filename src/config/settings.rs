use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::paths::Paths;
use crate::api::{Coordinates, Endpoints, Units, DEFAULT_TIMEOUT_SECS};
use crate::error::{Error, Result};
use crate::query::RetryPolicy;

/// Keys accepted by `skycast config set`
pub const SETTABLE_KEYS: &[&str] = &[
    "api.base_url",
    "api.forecast_url",
    "api.archive_url",
    "api.marine_url",
    "api.air_quality_url",
    "api.flood_url",
    "api.geocoding_url",
    "api.api_key",
    "api.timeout_secs",
    "units.temperature",
    "units.wind_speed",
    "units.precipitation",
    "units.timezone",
    "cache.retries",
    "cache.retry_base_ms",
    "cache.retry_max_ms",
    "defaults.latitude",
    "defaults.longitude",
    "defaults.name",
    "output.format",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub units: Units,

    #[serde(default)]
    pub cache: CacheConfig,

    /// Location used when a command names none
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Upstream API settings
///
/// `base_url` points every endpoint at one host (a self-hosted instance);
/// the per-endpoint URLs override it individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marine_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub air_quality_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flood_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocoding_url: Option<String>,
    /// Commercial API key, sent as `apikey`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            forecast_url: None,
            archive_url: None,
            marine_url: None,
            air_quality_url: None,
            flood_url: None,
            geocoding_url: None,
            api_key: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl ApiConfig {
    /// Resolved endpoint URLs
    pub fn endpoints(&self) -> Endpoints {
        let base = match &self.base_url {
            Some(base) => Endpoints::with_base(base),
            None => Endpoints::default(),
        };
        let pick = |url: &Option<String>, fallback: String| url.clone().unwrap_or(fallback);

        Endpoints {
            forecast: pick(&self.forecast_url, base.forecast),
            archive: pick(&self.archive_url, base.archive),
            marine: pick(&self.marine_url, base.marine),
            air_quality: pick(&self.air_quality_url, base.air_quality),
            flood: pick(&self.flood_url, base.flood),
            geocoding: pick(&self.geocoding_url, base.geocoding),
        }
    }
}

/// Retry settings for failed fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            retries: retry.retries,
            retry_base_ms: retry.base_delay.as_millis() as u64,
            retry_max_ms: retry.max_delay.as_millis() as u64,
        }
    }
}

impl CacheConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_delay: Duration::from_millis(self.retry_max_ms),
        }
    }
}

/// Default location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Display name of the default location
    pub name: Option<String>,
}

impl DefaultsConfig {
    /// The default location, when both coordinates are set
    pub fn location(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// Output formatting preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let paths = Paths::new()?;
        Self::load_from(&paths)
    }

    /// Load configuration from a specific paths instance
    pub fn load_from(paths: &Paths) -> Result<Self> {
        if !paths.config_exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&paths.config_file)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let paths = Paths::new()?;
        self.save_to(&paths)
    }

    /// Save configuration to a specific paths instance
    pub fn save_to(&self, paths: &Paths) -> Result<()> {
        paths.ensure_dirs()?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&paths.config_file, &contents)?;

        // May hold an API key
        #[cfg(unix)]
        {
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&paths.config_file, perms)?;
        }

        Ok(())
    }

    /// Set one dotted key from its string form, validating the value
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "api.base_url" => self.api.base_url = Some(parse_url(key, value)?),
            "api.forecast_url" => self.api.forecast_url = Some(parse_url(key, value)?),
            "api.archive_url" => self.api.archive_url = Some(parse_url(key, value)?),
            "api.marine_url" => self.api.marine_url = Some(parse_url(key, value)?),
            "api.air_quality_url" => self.api.air_quality_url = Some(parse_url(key, value)?),
            "api.flood_url" => self.api.flood_url = Some(parse_url(key, value)?),
            "api.geocoding_url" => self.api.geocoding_url = Some(parse_url(key, value)?),
            "api.api_key" => self.api.api_key = (!value.is_empty()).then(|| value.to_string()),
            "api.timeout_secs" => self.api.timeout_secs = parse_number(key, value)?,
            "units.temperature" => {
                self.units.temperature = one_of(key, value, &["celsius", "fahrenheit"])?
            }
            "units.wind_speed" => {
                self.units.wind_speed = one_of(key, value, &["kmh", "ms", "mph", "kn"])?
            }
            "units.precipitation" => {
                self.units.precipitation = one_of(key, value, &["mm", "inch"])?
            }
            "units.timezone" => self.units.timezone = non_empty(key, value)?,
            "cache.retries" => self.cache.retries = parse_number(key, value)?,
            "cache.retry_base_ms" => self.cache.retry_base_ms = parse_number(key, value)?,
            "cache.retry_max_ms" => self.cache.retry_max_ms = parse_number(key, value)?,
            "defaults.latitude" => {
                self.defaults.latitude = Some(parse_coordinate(key, value, 90.0)?)
            }
            "defaults.longitude" => {
                self.defaults.longitude = Some(parse_coordinate(key, value, 180.0)?)
            }
            "defaults.name" => self.defaults.name = (!value.is_empty()).then(|| value.to_string()),
            "output.format" => self.output.format = one_of(key, value, &["pretty", "json"])?,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "Unknown config key '{}'. Valid keys: {}",
                    key,
                    SETTABLE_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn invalid(key: &str, message: impl std::fmt::Display) -> Error {
    Error::InvalidArgument(format!("{}: {}", key, message))
}

fn parse_url(key: &str, value: &str) -> Result<String> {
    url::Url::parse(value).map_err(|e| invalid(key, e))?;
    Ok(value.trim_end_matches('/').to_string())
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| invalid(key, e))
}

fn parse_coordinate(key: &str, value: &str, limit: f64) -> Result<f64> {
    let parsed: f64 = parse_number(key, value)?;
    if !parsed.is_finite() || parsed.abs() > limit {
        return Err(invalid(key, format!("must be between -{limit} and {limit}")));
    }
    Ok(parsed)
}

fn one_of(key: &str, value: &str, allowed: &[&str]) -> Result<String> {
    let lower = value.to_lowercase();
    if allowed.contains(&lower.as_str()) {
        Ok(lower)
    } else {
        Err(invalid(key, format!("expected one of {}", allowed.join(", "))))
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Err(invalid(key, "must not be empty"));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_test_paths(temp_dir: &TempDir) -> Paths {
        Paths::in_dir(temp_dir.path().to_path_buf())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Default Value Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.api.api_key.is_none());
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.units, Units::default());
        assert_eq!(config.cache.retry_policy(), RetryPolicy::default());
        assert!(config.defaults.location().is_none());
        assert_eq!(config.output.format, "pretty");
    }

    #[test]
    fn test_default_endpoints() {
        let endpoints = ApiConfig::default().endpoints();
        assert_eq!(endpoints, Endpoints::default());
        assert_eq!(endpoints.forecast, "https://api.open-meteo.com/v1/forecast");
    }

    #[test]
    fn test_endpoint_overrides() {
        let api = ApiConfig {
            base_url: Some("http://localhost:8080".to_string()),
            geocoding_url: Some("https://geo.example.com/search".to_string()),
            ..Default::default()
        };
        let endpoints = api.endpoints();
        assert_eq!(endpoints.forecast, "http://localhost:8080/v1/forecast");
        assert_eq!(endpoints.geocoding, "https://geo.example.com/search");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Load/Save Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_returns_default_when_no_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        let config = Config::load_from(&paths).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        let mut config = Config::default();
        config.api.api_key = Some("key-123".to_string());
        config.units.temperature = "fahrenheit".to_string();
        config.cache.retries = 4;
        config.defaults.latitude = Some(52.52);
        config.defaults.longitude = Some(13.41);
        config.defaults.name = Some("Berlin".to_string());
        config.output.format = "json".to_string();

        config.save_to(&paths).unwrap();

        let loaded = Config::load_from(&paths).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.defaults.location(), Some(Coordinates::new(52.52, 13.41)));
    }

    #[test]
    fn test_load_partial_config() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        fs::create_dir_all(&paths.root).unwrap();
        fs::write(
            &paths.config_file,
            r#"
[units]
temperature = "fahrenheit"

[cache]
retries = 0
"#,
        )
        .unwrap();

        let config = Config::load_from(&paths).unwrap();
        assert_eq!(config.units.temperature, "fahrenheit");
        assert_eq!(config.units.wind_speed, "kmh");
        assert_eq!(config.cache.retries, 0);
        assert_eq!(config.cache.retry_base_ms, 1000);
        assert_eq!(config.api.timeout_secs, 30);
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        fs::create_dir_all(&paths.root).unwrap();
        fs::write(&paths.config_file, "[units\ntemperature = 1").unwrap();

        let err = Config::load_from(&paths).unwrap_err();
        assert!(matches!(err, Error::Toml(_)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_load_empty_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        fs::create_dir_all(&paths.root).unwrap();
        fs::write(&paths.config_file, "").unwrap();

        let config = Config::load_from(&paths).unwrap();
        assert_eq!(config, Config::default());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Set Value Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_set_value_valid() {
        let mut config = Config::default();
        config.set_value("units.temperature", "Fahrenheit").unwrap();
        config.set_value("defaults.latitude", "48.85").unwrap();
        config.set_value("defaults.longitude", "2.35").unwrap();
        config.set_value("cache.retry_max_ms", "5000").unwrap();
        config.set_value("api.base_url", "http://localhost:8080/").unwrap();

        assert_eq!(config.units.temperature, "fahrenheit");
        assert_eq!(config.defaults.location(), Some(Coordinates::new(48.85, 2.35)));
        assert_eq!(config.cache.retry_policy().max_delay, Duration::from_secs(5));
        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn test_set_value_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set_value("units.temperature", "kelvin").is_err());
        assert!(config.set_value("defaults.latitude", "91").is_err());
        assert!(config.set_value("defaults.longitude", "NaN").is_err());
        assert!(config.set_value("cache.retries", "-1").is_err());
        assert!(config.set_value("api.forecast_url", "not a url").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_set_value_unknown_key() {
        let mut config = Config::default();
        let err = config.set_value("api.token", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown config key 'api.token'"));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_empty_api_key_clears_it() {
        let mut config = Config::default();
        config.set_value("api.api_key", "secret").unwrap();
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        config.set_value("api.api_key", "").unwrap();
        assert!(config.api.api_key.is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // File Permissions Tests (Unix only)
    // ─────────────────────────────────────────────────────────────────────────

    #[cfg(unix)]
    #[test]
    fn test_save_sets_restrictive_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let paths = make_test_paths(&temp_dir);

        let mut config = Config::default();
        config.api.api_key = Some("secret".to_string());
        config.save_to(&paths).unwrap();

        let metadata = fs::metadata(&paths.config_file).unwrap();
        let mode = metadata.permissions().mode() & 0o777;
        assert_eq!(mode, 0o600, "Config file should have 0600 permissions");
    }
}
