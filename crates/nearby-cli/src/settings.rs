//! Resolves the discovery config from file, environment and flags.
//!
//! Precedence, lowest first: built-in defaults, the JSON config file
//! (`--config`, else `config.json` in the platform config directory if it
//! exists), then `--port` / `--stale-ms` and their environment variables.

use std::path::PathBuf;
use std::time::Duration;

use nearby_core::DiscoveryConfig;

use crate::cli::Cli;
use crate::error::CliError;

/// Default location of the config file.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "nearby", "nearby")
        .map(|dirs| dirs.config_dir().join("config.json"))
}

/// Build the discovery config for this invocation.
pub fn load_config(cli: &Cli) -> Result<DiscoveryConfig, CliError> {
    let path = cli
        .config
        .clone()
        .or_else(|| default_config_path().filter(|p| p.exists()));

    let mut config = match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading config file");
            DiscoveryConfig::from_json_file(&path)?
        }
        None => DiscoveryConfig::default(),
    };

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(stale_ms) = cli.stale_ms {
        config.stale_interval = Duration::from_millis(stale_ms);
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"port": 7000, "staleIntervalMs": 4000}}"#).unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from(["nearby", "--config", &path, "--port", "7100", "interfaces"]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.port, 7100);
        assert_eq!(config.stale_interval, Duration::from_millis(4000));
    }

    #[test]
    fn test_zero_staleness_rejected() {
        let cli = Cli::parse_from(["nearby", "--stale-ms", "0", "interfaces"]);
        let err = load_config(&cli).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::exit_codes::INVALID_ARGS);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let cli = Cli::parse_from(["nearby", "--config", path.to_str().unwrap(), "interfaces"]);

        assert!(load_config(&cli).is_err());
    }
}
