use std::sync::Arc;

use thiserror::Error;

/// Result type alias for skycast operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while fetching, caching or presenting weather data
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing required configuration
    #[error("{0}")]
    ConfigMissing(String),

    /// Weather API error, either a non-2xx status or an error body
    #[error("Weather API error (HTTP {status}): {}", .reason.as_deref().unwrap_or("no reason given"))]
    Api { status: u16, reason: Option<String> },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("Failed to write config file: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Environment variable error
    #[error("Environment error: {0}")]
    Env(#[from] std::env::VarError),

    /// No usable location was given or configured
    #[error("No location given. Pass --lat/--lon or --place, or set defaults.latitude/defaults.longitude.")]
    NoLocation,

    /// A disabled query was asked to fetch
    #[error("Query is disabled until its required parameters are set")]
    QueryDisabled,

    /// Refetch was requested for a key no query has registered
    #[error("No fetch function registered for {key}")]
    UnknownQuery { key: String },

    /// Cached data for a key was read back as a different type
    #[error("Cached data for {key} has a different type than requested")]
    TypeMismatch { key: String },

    /// An error shared out of the query cache
    #[error(transparent)]
    Cached(Arc<Error>),
}

impl Error {
    /// Create an API error from HTTP status and an optional server reason
    pub fn api(status: u16, reason: Option<String>) -> Self {
        Self::Api { status, reason }
    }

    /// Create a config missing error with helpful message
    pub fn config_missing(message: impl Into<String>) -> Self {
        Self::ConfigMissing(message.into())
    }

    /// The reason string reported by the weather API, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Api { reason, .. } => reason.as_deref(),
            Self::Cached(inner) => inner.reason(),
            _ => None,
        }
    }

    /// The HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Cached(inner) => inner.status(),
            _ => None,
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_)
            | Self::ConfigMissing(_)
            | Self::Toml(_)
            | Self::InvalidArgument(_)
            | Self::NoLocation => 2,
            Self::Api { .. } | Self::Http(_) | Self::Json(_) => 3,
            Self::Cached(inner) => inner.exit_code(),
            _ => 1,
        }
    }
}

impl From<Arc<Error>> for Error {
    fn from(err: Arc<Error>) -> Self {
        Self::Cached(err)
    }
}
