//! Error types for PromptScroll
//!
//! All errors in the crate are converted to `AppError`. Fetch errors are
//! captured into query state by the pagination engine, action errors are
//! returned to the caller of the action.

use thiserror::Error;

/// Crate-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found
    #[error("Resource not found")]
    NotFound,

    /// Authentication required
    #[error("Authentication required")]
    Unauthorized,

    /// Validation error (prompt submission)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote gateway answered with a non-success status
    #[error("Gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    /// HTTP client error (network, TLS, timeout)
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local persisted storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Clipboard write failed
    #[error("Clipboard error: {0}")]
    Clipboard(String),

    /// The same action is already running for this entity
    #[error("Action '{action}' already in flight for {entity_id}")]
    ActionInFlight { entity_id: String, action: String },

    /// Server-side vote limiter refused the vote
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl AppError {
    /// Stable label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound => "not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::Gateway { .. } => "gateway",
            AppError::HttpClient(_) => "http_client",
            AppError::Serialization(_) => "serialization",
            AppError::Storage(_) => "storage",
            AppError::Clipboard(_) => "clipboard",
            AppError::ActionInFlight { .. } => "action_in_flight",
            AppError::RateLimited(_) => "rate_limited",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    /// Whether a user-initiated retry may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::HttpClient(_) => true,
            AppError::Gateway { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Record this error in the error counter and hand it back
    pub(crate) fn record(self) -> Self {
        crate::metrics::ERRORS_TOTAL
            .with_label_values(&[self.kind()])
            .inc();
        self
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
