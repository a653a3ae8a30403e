//! Error handling for the application

use thiserror::Error;

/// Market-data fetch errors
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Malformed OHLCV payload: {0}")]
    MalformedPayload(String),
}

impl FetchError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout | FetchError::RateLimited => true,
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::MalformedPayload(_) => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::MalformedPayload(err.to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed table {path}: {reason}")]
    Malformed { path: String, reason: String },
}

/// Notification errors
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("No destinations registered")]
    NoDestinations,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Bot API rejected message to {destination}: {description}")]
    Rejected {
        destination: String,
        description: String,
    },
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Request(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// General application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Unknown token: {0}")]
    UnknownToken(String),
}
