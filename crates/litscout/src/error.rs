//! Error types for the literature discovery engine.
//!
//! Uses `thiserror` for structured error handling with automatic `From` implementations.
//! Two layers: [`ApiError`] for the HTTP transport, [`EngineError`] for public
//! engine operations.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Errors from the HTTP client layer.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// HTTP transport error (connection, DNS, TLS, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Middleware error
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// Rate limited by an upstream API (429 response)
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Suggested wait time before retry
        retry_after: Duration,
    },

    /// Upstream reports it is temporarily overloaded (503 or provider signal)
    #[error("Upstream overloaded: {message}")]
    Overloaded {
        /// Message from the upstream service
        message: String,
    },

    /// A credential's daily quota is spent (provider quota error)
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        /// Error message from the provider
        message: String,
    },

    /// Resource not found (404 response)
    #[error("Resource not found: {resource}")]
    NotFound {
        /// Description of the missing resource
        resource: String,
    },

    /// Invalid request parameters (400 response)
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message from API
        message: String,
    },

    /// JSON parsing error
    #[error("Failed to parse response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Server error (5xx response)
    #[error("Server error ({status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },

    /// Unexpected HTTP status
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body or message
        message: String,
    },
}

impl ApiError {
    /// Create a rate limited error with retry-after duration.
    #[must_use]
    pub fn rate_limited(seconds: u64) -> Self {
        Self::RateLimited { retry_after: Duration::from_secs(seconds) }
    }

    /// Create an overloaded error.
    #[must_use]
    pub fn overloaded(message: impl Into<String>) -> Self {
        Self::Overloaded { message: message.into() }
    }

    /// Create a quota exceeded error.
    #[must_use]
    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::QuotaExceeded { message: message.into() }
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound { resource: resource.into() }
    }

    /// Create a bad request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest { message: message.into() }
    }

    /// Create a server error.
    #[must_use]
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server { status, message: message.into() }
    }

    /// Returns true if this failure is transient: a rate limit (429), a 503,
    /// or an upstream overload signal. Transient failures are candidates for
    /// credential rotation and backoff; everything else propagates immediately.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Overloaded { .. } | Self::Server { status: 503, .. }
        )
    }

    /// Get the retry-after duration if this is a rate limit error.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Errors from public engine operations.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    /// Every credential in the pool is quota-exhausted
    #[error("All credentials exhausted; earliest reset at {reset_at}")]
    AllCredentialsExhausted {
        /// When the first credential becomes usable again
        reset_at: DateTime<Utc>,
    },

    /// The requested paper could not be resolved
    #[error("Paper not found: {query}")]
    PaperNotFound {
        /// The identifier or DOI that failed to resolve
        query: String,
    },

    /// Upstream returned a non-success status the engine cannot recover from
    #[error("Upstream error ({status}): {message}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Upstream message (parsed from JSON body when possible)
        message: String,
    },

    /// Text generation failed in a way the caller must see
    #[error("Generation error: {message}")]
    Generation {
        /// What went wrong
        message: String,
    },

    /// Error from the API client layer
    #[error("API error: {0}")]
    Api(ApiError),
}

impl EngineError {
    /// Create a paper-not-found error.
    #[must_use]
    pub fn paper_not_found(query: impl Into<String>) -> Self {
        Self::PaperNotFound { query: query.into() }
    }

    /// Create a generation error.
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation { message: message.into() }
    }

    /// Convert to a user-friendly message for presentation layers.
    #[must_use]
    pub fn to_user_message(&self) -> String {
        match self {
            Self::AllCredentialsExhausted { reset_at } => {
                format!(
                    "All API credentials have hit their daily quota. The first one resets at {}.",
                    reset_at.format("%Y-%m-%d %H:%M UTC")
                )
            }
            Self::PaperNotFound { query } => {
                format!("No paper matched '{query}'. Check the identifier or DOI.")
            }
            Self::Upstream { status, message } => {
                format!("The bibliographic service returned an error ({status}): {message}")
            }
            _ => self.to_string(),
        }
    }
}

impl From<ApiError> for EngineError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Server { status, message }
            | ApiError::UnexpectedStatus { status, message } => Self::Upstream { status, message },
            other => Self::Api(other),
        }
    }
}

/// Result type alias for client operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
