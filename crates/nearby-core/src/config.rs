//! Discovery configuration.
//!
//! Defaults match the wire protocol used by existing announcers: UDP port
//! 8888, a 15000 byte receive buffer and a 10 second staleness interval.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default UDP discovery port
pub const DISCOVERY_PORT: u16 = 8888;

/// Default receive buffer size in bytes
pub const RECV_BUFFER_SIZE: usize = 15000;

/// Largest receive buffer accepted; no UDP payload is bigger
pub const MAX_RECV_BUFFER_SIZE: usize = 65_535;

/// Time without an announcement after which a host is evicted
pub const STALE_INTERVAL: Duration = Duration::from_millis(10_000);

/// Pause after a socket error before the loop runs again
pub const ERROR_BACKOFF: Duration = Duration::from_millis(250);

/// Settings for a discovery session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryConfig {
    /// UDP port to listen on
    pub port: u16,
    /// Size of the datagram receive buffer
    pub recv_buffer_size: usize,
    /// Staleness interval
    #[serde(rename = "staleIntervalMs", with = "duration_ms")]
    pub stale_interval: Duration,
    /// Backoff after setup or receive errors
    #[serde(rename = "errorBackoffMs", with = "duration_ms")]
    pub error_backoff: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            port: DISCOVERY_PORT,
            recv_buffer_size: RECV_BUFFER_SIZE,
            stale_interval: STALE_INTERVAL,
            error_backoff: ERROR_BACKOFF,
        }
    }
}

impl DiscoveryConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: DiscoveryConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the values can drive a session.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid {
                field: "port",
                message: "must not be zero".to_string(),
            });
        }

        if self.recv_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "recvBufferSize",
                message: "must not be zero".to_string(),
            });
        }
        if self.recv_buffer_size > MAX_RECV_BUFFER_SIZE {
            return Err(ConfigError::Invalid {
                field: "recvBufferSize",
                message: format!("must be at most {} bytes", MAX_RECV_BUFFER_SIZE),
            });
        }

        if self.stale_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "staleIntervalMs",
                message: "must not be zero".to_string(),
            });
        }

        Ok(())
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
