//! Addon options, loaded from environment variables or built in code.
//!
//! # Configuration Hierarchy
//!
//! `Options::default()` gives development defaults. `Options::from_env()`
//! overrides them from environment variables (or a `.env` file).
//!
//! # Server
//!
//! - `ADDON_BIND_ADDR`: Bind address (default: `0.0.0.0`)
//! - `ADDON_PORT`: Listen port (default: 8080)
//! - `SHUTDOWN_GRACE_SECS`: How long in-flight requests may run after a shutdown signal (default: 10)
//!
//! # Logging
//!
//! - `LOG_LEVEL`: `debug`, `info`, `warn` or `error` (default: `info`)
//! - `LOG_ENCODING`: `console` or `json` (default: `console`)
//! - `DISABLE_REQUEST_LOGGING`, `LOG_IPS`, `LOG_USER_AGENT`, `LOG_MEDIA_NAME`
//!
//! # Caching
//!
//! - `CACHE_AGE_CATALOGS_SECS`, `CACHE_AGE_STREAMS_SECS`: `Cache-Control` max-age (0 = no cache headers)
//! - `CACHE_PUBLIC_CATALOGS`, `CACHE_PUBLIC_STREAMS`: Add `public` to `Cache-Control`
//! - `HANDLE_ETAG_CATALOGS`, `HANDLE_ETAG_STREAMS`: Send `ETag` and answer `If-None-Match` with 304
//!
//! # Other
//!
//! - `PUT_META_IN_CONTEXT`, `CINEMETA_TIMEOUT_SECS`: Metadata enrichment
//! - `METRICS_PORT`: Prometheus exporter port (default: 0 = disabled)
//! - `REDIRECT_URL`: Target of a `301` for `GET /`
//! - `USER_DATA_BASE64`: Expect base64url user data instead of percent-encoded JSON
//! - `STREAM_ID_REGEX`: Only serve stream requests whose ID matches this pattern

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::CachePolicy;
use crate::error::ConfigError;

/// Default bind address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default log level when none is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default timeout for the built-in Cinemeta client.
pub const DEFAULT_CINEMETA_TIMEOUT: Duration = Duration::from_secs(2);

/// Default grace period for in-flight requests during shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// How user data is encoded in the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserDataEncoding {
    /// Percent-encoded JSON text (Stremio's default).
    #[default]
    PercentEncodedJson,
    /// URL-safe base64 of the JSON text, padding optional.
    Base64Url,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogEncoding {
    #[default]
    Console,
    Json,
}

impl FromStr for LogEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log encoding '{other}'")),
        }
    }
}

/// Options for an addon.
///
/// Immutable once the addon is built.
#[derive(Debug, Clone)]
pub struct Options {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Bind address (default: "0.0.0.0")
    pub bind_addr: String,

    /// Listen port (default: 8080)
    pub port: u16,

    /// Time in-flight requests get to finish after a shutdown signal
    pub shutdown_grace: Duration,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Log level; `None` means "info" unless `custom_logger` is set
    pub logging_level: Option<String>,

    /// Console or JSON log lines
    pub log_encoding: LogEncoding,

    /// The caller installed its own tracing subscriber
    pub custom_logger: bool,

    pub disable_request_logging: bool,
    pub log_ips: bool,
    pub log_user_agent: bool,
    pub log_media_name: bool,

    // =========================================================================
    // Caching Configuration
    // =========================================================================
    pub cache_age_catalogs: Duration,
    pub cache_age_streams: Duration,

    /// Send `public` in `Cache-Control` (useful behind a CDN)
    pub cache_public_catalogs: bool,
    pub cache_public_streams: bool,

    /// Compute ETags and answer matching `If-None-Match` with 304
    pub handle_etag_catalogs: bool,
    pub handle_etag_streams: bool,

    // =========================================================================
    // Metadata Configuration
    // =========================================================================
    /// Timeout for the built-in Cinemeta client. Must stay `None` with a custom fetcher.
    pub cinemeta_timeout: Option<Duration>,

    /// Fetch metadata before the stream handler runs and hand it to the handler
    pub put_meta_in_context: bool,

    // =========================================================================
    // Other
    // =========================================================================
    /// Port for the Prometheus exporter (0 = disabled)
    pub metrics_port: u16,

    /// Redirect target for `GET /`
    pub redirect_url: Option<String>,

    pub user_data_encoding: UserDataEncoding,

    /// Stream requests with IDs not matching this pattern are rejected with 400
    pub stream_id_regex: Option<String>,
}

impl Options {
    /// Load options from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnv` if a variable can't be parsed, or any
    /// other `ConfigError` if the resulting options are inconsistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let options = Self {
            // Server
            bind_addr: env::var("ADDON_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            port: Self::parse_env("ADDON_PORT", DEFAULT_PORT)?,
            shutdown_grace: Duration::from_secs(Self::parse_env(
                "SHUTDOWN_GRACE_SECS",
                DEFAULT_SHUTDOWN_GRACE.as_secs(),
            )?),

            // Logging
            logging_level: Self::optional_env("LOG_LEVEL"),
            log_encoding: Self::parse_env("LOG_ENCODING", LogEncoding::Console)?,
            custom_logger: false,
            disable_request_logging: Self::parse_env("DISABLE_REQUEST_LOGGING", false)?,
            log_ips: Self::parse_env("LOG_IPS", false)?,
            log_user_agent: Self::parse_env("LOG_USER_AGENT", false)?,
            log_media_name: Self::parse_env("LOG_MEDIA_NAME", false)?,

            // Caching
            cache_age_catalogs: Duration::from_secs(Self::parse_env("CACHE_AGE_CATALOGS_SECS", 0)?),
            cache_age_streams: Duration::from_secs(Self::parse_env("CACHE_AGE_STREAMS_SECS", 0)?),
            cache_public_catalogs: Self::parse_env("CACHE_PUBLIC_CATALOGS", false)?,
            cache_public_streams: Self::parse_env("CACHE_PUBLIC_STREAMS", false)?,
            handle_etag_catalogs: Self::parse_env("HANDLE_ETAG_CATALOGS", false)?,
            handle_etag_streams: Self::parse_env("HANDLE_ETAG_STREAMS", false)?,

            // Metadata
            cinemeta_timeout: Self::optional_env("CINEMETA_TIMEOUT_SECS")
                .map(|v| {
                    v.parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|e| ConfigError::InvalidEnv(format!("CINEMETA_TIMEOUT_SECS: {e}")))
                })
                .transpose()?,
            put_meta_in_context: Self::parse_env("PUT_META_IN_CONTEXT", false)?,

            // Other
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
            redirect_url: Self::optional_env("REDIRECT_URL"),
            user_data_encoding: if Self::parse_env("USER_DATA_BASE64", false)? {
                UserDataEncoding::Base64Url
            } else {
                UserDataEncoding::PercentEncodedJson
            },
            stream_id_regex: Self::optional_env("STREAM_ID_REGEX"),
        };

        options.validate()?;

        Ok(options)
    }

    /// Validate option combinations that don't depend on the manifest or handlers.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as a `ConfigError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.cache_public_catalogs && self.cache_age_catalogs.is_zero())
            || (self.cache_public_streams && self.cache_age_streams.is_zero())
        {
            return Err(ConfigError::PublicCacheWithoutAge);
        }

        if (self.handle_etag_catalogs && self.cache_age_catalogs.is_zero())
            || (self.handle_etag_streams && self.cache_age_streams.is_zero())
        {
            return Err(ConfigError::EtagWithoutAge);
        }

        if self.disable_request_logging && (self.log_ips || self.log_user_agent) {
            return Err(ConfigError::RequestDetailsWithoutLogging);
        }

        if self.custom_logger && self.logging_level.is_some() {
            return Err(ConfigError::LevelWithCustomLogger);
        }

        if self.disable_request_logging && self.log_media_name {
            return Err(ConfigError::MediaNameWithoutLogging);
        }

        if let Some(level) = &self.logging_level
            && !matches!(level.as_str(), "debug" | "info" | "warn" | "error")
        {
            return Err(ConfigError::InvalidLogLevel(level.clone()));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    /// Whether any stage needs a metadata fetcher.
    pub fn meta_enabled(&self) -> bool {
        self.log_media_name || self.put_meta_in_context
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address, `None` if metrics are disabled.
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        if self.metrics_enabled() {
            Some(SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
        } else {
            None
        }
    }

    /// Effective log level.
    pub fn log_level(&self) -> &str {
        self.logging_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Cache policy for catalog responses.
    pub fn catalog_cache(&self) -> CachePolicy {
        CachePolicy::new(
            self.cache_age_catalogs,
            self.cache_public_catalogs,
            self.handle_etag_catalogs,
        )
    }

    /// Cache policy for stream and subtitle responses.
    pub fn stream_cache(&self) -> CachePolicy {
        CachePolicy::new(
            self.cache_age_streams,
            self.cache_public_streams,
            self.handle_etag_streams,
        )
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidEnv(format!("{name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    fn optional_env(name: &str) -> Option<String> {
        env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            // Server
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            port: DEFAULT_PORT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            // Logging
            logging_level: None,
            log_encoding: LogEncoding::Console,
            custom_logger: false,
            disable_request_logging: false,
            log_ips: false,
            log_user_agent: false,
            log_media_name: false,
            // Caching
            cache_age_catalogs: Duration::ZERO,
            cache_age_streams: Duration::ZERO,
            cache_public_catalogs: false,
            cache_public_streams: false,
            handle_etag_catalogs: false,
            handle_etag_streams: false,
            // Metadata
            cinemeta_timeout: None,
            put_meta_in_context: false,
            // Other
            metrics_port: 0,
            redirect_url: None,
            user_data_encoding: UserDataEncoding::PercentEncodedJson,
            stream_id_regex: None,
        }
    }
}
