//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides;
//! command-line arguments take precedence over both (applied in main.rs).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port the broadcast listener binds.
    /// Override: `RIPCAST_PORT`
    pub port: Option<u16>,

    /// Directory scanned once at startup for `.rip` tracks.
    /// Override: `RIPCAST_PLAYLIST`
    pub playlist: Option<PathBuf>,

    /// Maximum simultaneously connected clients.
    /// Override: `RIPCAST_MAX_CLIENTS` (handled by clap via `#[arg(env)]`)
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: None,
            playlist: None,
            max_clients: ripcast_core::protocol_constants::MAX_CLIENTS,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment
    /// overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RIPCAST_PORT") {
            if let Ok(port) = val.parse() {
                self.port = Some(port);
            }
        }

        if let Ok(val) = std::env::var("RIPCAST_PLAYLIST") {
            self.playlist = Some(PathBuf::from(val));
        }

        // Note: RIPCAST_MAX_CLIENTS and RIPCAST_LOG_LEVEL are handled by
        // clap via #[arg(env = ...)] in main.rs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_leave_required_settings_unset() {
        let config = ServerConfig::default();
        assert_eq!(config.port, None);
        assert_eq!(config.playlist, None);
        assert_eq!(
            config.max_clients,
            ripcast_core::protocol_constants::MAX_CLIENTS
        );
    }

    #[test]
    fn loads_a_full_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "port: 8910").expect("write");
        writeln!(file, "playlist: /srv/tracks").expect("write");
        writeln!(file, "max_clients: 8").expect("write");

        let config = ServerConfig::load(Some(file.path())).expect("load should succeed");

        assert_eq!(config.port, Some(8910));
        assert_eq!(config.playlist, Some(PathBuf::from("/srv/tracks")));
        assert_eq!(config.max_clients, 8);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "port: 8910").expect("write");

        let config = ServerConfig::load(Some(file.path())).expect("load should succeed");

        assert_eq!(config.port, Some(8910));
        assert_eq!(config.playlist, None);
        assert_eq!(
            config.max_clients,
            ripcast_core::protocol_constants::MAX_CLIENTS
        );
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "port: [not a port]").expect("write");

        assert!(ServerConfig::load(Some(file.path())).is_err());
    }
}
