//! Error types for the nearby CLI.
//!
//! CliError wraps DiscoveryError from the core library and adds CLI-specific variants.

use nearby_core::error::{ConfigError, DiscoveryError};
use thiserror::Error;

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NETWORK_ERROR: i32 = 2;
    pub const INVALID_ARGS: i32 = 4;
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Discovery error: {0}")]
    Core(#[from] DiscoveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No peers found")]
    NoPeersFound,
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) => match e {
                DiscoveryError::Bind { .. } | DiscoveryError::Io(_) => exit_codes::NETWORK_ERROR,
                DiscoveryError::Config(_) => exit_codes::INVALID_ARGS,
                DiscoveryError::AlreadyRunning | DiscoveryError::NotRunning => {
                    exit_codes::GENERAL_ERROR
                }
            },
            CliError::Io(_) => exit_codes::GENERAL_ERROR,
            CliError::InvalidArgument(_) => exit_codes::INVALID_ARGS,
            CliError::NoPeersFound => exit_codes::GENERAL_ERROR,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Core(DiscoveryError::Config(e))
    }
}
