//! Error types for nearby-core.

use thiserror::Error;

/// Core error type for discovery operations.
///
/// Runtime failures inside the receive loop never surface through this type;
/// they are handled on the worker and reported to the listener instead.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery is already running")]
    AlreadyRunning,

    #[error("Discovery is not running")]
    NotRunning,

    #[error("Failed to bind UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
