use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Construction-time configuration errors.
///
/// Every variant is fatal: an addon that fails validation is never routed
/// or served.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("An empty manifest was passed (id, name, description and version are required)")]
    EmptyManifest,

    #[error("No handler was passed")]
    NoHandlers,

    #[error("Enabling public caching only makes sense when also setting a cache age")]
    PublicCacheWithoutAge,

    #[error("ETag handling only makes sense when also setting a cache age")]
    EtagWithoutAge,

    #[error("Enabling IP or user agent logging doesn't make sense when disabling request logging")]
    RequestDetailsWithoutLogging,

    #[error("Enabling media name logging doesn't make sense when disabling request logging")]
    MediaNameWithoutLogging,

    #[error(
        "Setting a logging level in the options doesn't make sense when you already set a custom logger"
    )]
    LevelWithCustomLogger,

    #[error(
        "Setting a meta fetcher when neither logging the media name nor putting meta in the context doesn't make sense"
    )]
    UnusedMetaFetcher,

    #[error("Setting a Cinemeta timeout doesn't make sense when you already set a meta fetcher")]
    CinemetaTimeoutWithFetcher,

    #[error("Requiring a configuration only makes sense when also making the addon configurable")]
    ConfigurationRequiredWithoutConfigurable,

    #[error("Invalid stream ID regex: {0}")]
    InvalidStreamIdPattern(#[from] regex::Error),

    #[error("Invalid log level '{0}' (expected debug, info, warn or error)")]
    InvalidLogLevel(String),

    #[error("Failed to create the Cinemeta client: {0}")]
    MetaClient(String),

    #[error("Invalid environment value: {0}")]
    InvalidEnv(String),
}

/// Error returned by catalog, stream and subtitle handlers.
///
/// `NotFound` is the sentinel for "no content for this id" and is answered
/// with `404`. Anything else becomes a `500` whose detail stays in the logs.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl HandlerError {
    /// Wrap an arbitrary error as an internal handler failure.
    pub fn internal<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal(anyhow::Error::new(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Result type returned by addon handlers.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Per-request errors with their HTTP status codes.
///
/// Bodies are short plain-text messages. Internal details are logged
/// server-side and never sent to the client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(&'static str),

    #[error("Not found")]
    NotFound,

    #[error("Internal error ({public}): {detail}")]
    Internal {
        /// Message sent to the client.
        public: &'static str,
        /// Message kept in the logs.
        detail: String,
    },

    /// A status chosen by addon code (manifest callback) and passed through verbatim.
    #[error("Rejected with status {0}")]
    Status(StatusCode),
}

impl ApiError {
    pub fn internal(public: &'static str, detail: impl ToString) -> Self {
        Self::Internal {
            public,
            detail: detail.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Status(status) => *status,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message: &str = match &self {
            ApiError::BadRequest(msg) => *msg,
            ApiError::NotFound => "Not found",
            ApiError::Internal { public, detail } => {
                tracing::error!(error = %detail, "{public}");
                *public
            }
            ApiError::Status(status) => status.canonical_reason().unwrap_or("Request rejected"),
        };

        (status, message.to_string()).into_response()
    }
}

/// Errors that end the serving lifecycle.
#[derive(Error, Debug)]
pub enum ServeError {
    #[error("Couldn't bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Convenience type alias for request-level results.
pub type ApiResult<T> = Result<T, ApiError>;
