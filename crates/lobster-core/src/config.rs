//! Configuration management for the LobsterFoundry agent.
//!
//! Loads configuration from ${LOBSTER_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the configured server.
pub const SERVER_ENV: &str = "LOBSTER_SERVER";

pub mod paths {
    //! Path resolution for configuration and credential files.
    //!
    //! LOBSTER_HOME resolution order:
    //! 1. LOBSTER_HOME environment variable (if set)
    //! 2. ~/.config/lobsterfoundry (default)

    use std::path::PathBuf;

    /// Returns the agent home directory.
    pub fn lobster_home() -> PathBuf {
        if let Ok(home) = std::env::var("LOBSTER_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("lobsterfoundry")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        lobster_home().join("config.toml")
    }

    /// Returns the path to the persisted bot identity.
    pub fn credentials_path() -> PathBuf {
        lobster_home().join("credentials.json")
    }
}

fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// World server base URL. `None` defers to the stored identity.
    pub server: Option<String>,

    /// Live channel override.
    pub ws_url: Option<String>,

    /// Name requested when registering.
    pub agent_name: String,

    pub agent_type: String,
    pub agent_version: String,

    /// Timeout for request/response calls in seconds.
    pub request_timeout_secs: u64,

    /// Total wait for the live handshake in milliseconds.
    pub handshake_timeout_ms: u64,

    /// Poll interval while waiting for the handshake in milliseconds.
    pub handshake_poll_ms: u64,

    /// Pause between chained real-time actions in milliseconds.
    pub action_pacing_ms: u64,
}

impl Config {
    pub const DEFAULT_SERVER: &str = "http://localhost:5173";
    const DEFAULT_AGENT_NAME: &str = "PaxAgent";
    const DEFAULT_AGENT_TYPE: &str = "openclaw";
    const DEFAULT_AGENT_VERSION: &str = "1.0.0";
    const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
    const DEFAULT_HANDSHAKE_TIMEOUT_MS: u64 = 5_000;
    const DEFAULT_HANDSHAKE_POLL_MS: u64 = 100;
    const DEFAULT_ACTION_PACING_MS: u64 = 1_000;

    /// Loads configuration from the default config path, then applies env overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&paths::config_path())?;
        config.apply_server_override(std::env::var(SERVER_ENV).ok().as_deref());
        Ok(config)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|err| {
            Error::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        toml::from_str(&contents)
            .map_err(|err| Error::Config(format!("failed to parse {}: {err}", path.display())))
    }

    /// Replaces the configured server when `value` is a non-blank URL.
    pub fn apply_server_override(&mut self, value: Option<&str>) {
        if let Some(server) = value.map(str::trim).filter(|s| !s.is_empty()) {
            self.server = Some(server.trim_end_matches('/').to_string());
        }
    }

    /// Server to talk to, given the server recorded in a stored identity.
    pub fn resolve_server(&self, identity_server: Option<&str>) -> String {
        self.server
            .as_deref()
            .or(identity_server.filter(|s| !s.trim().is_empty()))
            .unwrap_or(Self::DEFAULT_SERVER)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn handshake_poll(&self) -> Duration {
        Duration::from_millis(self.handshake_poll_ms.max(1))
    }

    pub fn action_pacing(&self) -> Duration {
        Duration::from_millis(self.action_pacing_ms)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Config(format!(
                "Config file already exists at {}",
                path.display()
            )));
        }

        Self::write_config(path, default_config_template())
    }

    /// Writes config content atomically (temp file + rename).
    fn write_config(path: &Path, content: &str) -> Result<()> {
        let io_err = |what: &str, target: &Path, err: std::io::Error| {
            Error::Config(format!("failed to {what} {}: {err}", target.display()))
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| io_err("create", parent, err))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content).map_err(|err| io_err("write", &tmp_path, err))?;
        fs::rename(&tmp_path, path).map_err(|err| io_err("rename into", path, err))?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: None,
            ws_url: None,
            agent_name: Self::DEFAULT_AGENT_NAME.to_string(),
            agent_type: Self::DEFAULT_AGENT_TYPE.to_string(),
            agent_version: Self::DEFAULT_AGENT_VERSION.to_string(),
            request_timeout_secs: Self::DEFAULT_REQUEST_TIMEOUT_SECS,
            handshake_timeout_ms: Self::DEFAULT_HANDSHAKE_TIMEOUT_MS,
            handshake_poll_ms: Self::DEFAULT_HANDSHAKE_POLL_MS,
            action_pacing_ms: Self::DEFAULT_ACTION_PACING_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nonexistent.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.handshake_timeout(), Duration::from_secs(5));
        assert_eq!(config.handshake_poll(), Duration::from_millis(100));
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(
            &config_path,
            "server = \"https://foundry.example\"\nhandshake_timeout_ms = 250\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.server.as_deref(), Some("https://foundry.example"));
        assert_eq!(config.handshake_timeout_ms, 250);
        assert_eq!(config.agent_name, "PaxAgent");
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "server = [").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_init_creates_template_and_refuses_overwrite() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nested").join("config.toml");

        Config::init(&config_path).unwrap();
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("agent_name = \"PaxAgent\""));
        assert!(contents.contains("# server ="));
        assert!(!config_path.with_extension("toml.tmp").exists());

        // template parses back to defaults
        assert_eq!(Config::load_from(&config_path).unwrap(), Config::default());

        assert!(Config::init(&config_path).is_err());
    }

    #[test]
    fn test_server_resolution_order() {
        let mut config = Config::default();
        assert_eq!(config.resolve_server(None), "http://localhost:5173");
        assert_eq!(
            config.resolve_server(Some("http://stored:9000/")),
            "http://stored:9000"
        );

        config.apply_server_override(Some("  "));
        assert_eq!(config.server, None);

        config.apply_server_override(Some("http://override:1/"));
        assert_eq!(
            config.resolve_server(Some("http://stored:9000")),
            "http://override:1"
        );
    }
}
