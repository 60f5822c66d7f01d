//! TOML-based configuration for the connection manager and the echo binary.
//!
//! ```toml
//! [manager]
//! event_queue_capacity = 1024
//! log_level = "debug"
//! local_identity = 76561197960265729
//!
//! [echo]
//! port = 27015
//! virtual_port = 0
//! tick_ms = 16
//! max_ticks = 300
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so a partial file (or no file at
//! all) still yields a complete configuration.

use std::path::{Path, PathBuf};

use netbridge_core::PeerIdentity;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetbridgeConfig {
    #[serde(default)]
    pub manager: ManagerConfig,
    #[serde(default)]
    pub echo: EchoConfig,
}

/// Settings for [`NetworkManager`](crate::NetworkManager) and its transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManagerConfig {
    /// Maximum number of queued events; absent means unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_queue_capacity: Option<usize>,
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Identity the in-process transport answers to.
    #[serde(default = "default_local_identity")]
    pub local_identity: u64,
}

/// Settings for the `netbridge-echo` binary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EchoConfig {
    /// UDP port the echo server listens on in IP mode.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Virtual port the echo server listens on in identity mode.
    #[serde(default)]
    pub virtual_port: i32,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Ticks to run before exiting; `0` runs until Ctrl-C.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_local_identity() -> u64 {
    PeerIdentity::DEFAULT_LOCAL.raw()
}
fn default_port() -> u16 {
    27015
}
fn default_tick_ms() -> u64 {
    16
}
fn default_max_ticks() -> u64 {
    300
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: None,
            log_level: default_log_level(),
            local_identity: default_local_identity(),
        }
    }
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            virtual_port: 0,
            tick_ms: default_tick_ms(),
            max_ticks: default_max_ticks(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads the config at `path`, returning [`NetbridgeConfig::default()`] if
/// the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<NetbridgeConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(NetbridgeConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path` as pretty TOML, creating parent directories.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &NetbridgeConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_default_config_has_expected_echo_settings() {
        // Arrange / Act
        let cfg = NetbridgeConfig::default();

        // Assert
        assert_eq!(cfg.echo.port, 27015);
        assert_eq!(cfg.echo.virtual_port, 0);
        assert_eq!(cfg.echo.tick_ms, 16);
        assert_eq!(cfg.echo.max_ticks, 300);
    }

    #[test]
    fn test_default_manager_config_is_unbounded_at_info() {
        let cfg = ManagerConfig::default();
        assert_eq!(cfg.event_queue_capacity, None);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.local_identity, 76_561_197_960_265_729);
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_partial_toml_fills_missing_fields_with_defaults() {
        let cfg: NetbridgeConfig = toml::from_str("[echo]\nport = 4000\n").unwrap();

        assert_eq!(cfg.echo.port, 4000);
        assert_eq!(cfg.echo.tick_ms, 16);
        assert_eq!(cfg.manager, ManagerConfig::default());
    }

    #[test]
    fn test_empty_toml_is_default_config() {
        let cfg: NetbridgeConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, NetbridgeConfig::default());
    }

    #[test]
    fn test_queue_capacity_is_read_when_present() {
        let cfg: NetbridgeConfig = toml::from_str("[manager]\nevent_queue_capacity = 8\n").unwrap();
        assert_eq!(cfg.manager.event_queue_capacity, Some(8));
    }

    // ── File persistence ──────────────────────────────────────────────────────

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(cfg, NetbridgeConfig::default());
    }

    #[test]
    fn test_save_then_load_preserves_values() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("netbridge.toml");
        let mut cfg = NetbridgeConfig::default();
        cfg.manager.event_queue_capacity = Some(64);
        cfg.manager.log_level = "debug".into();
        cfg.echo.max_ticks = 0;

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[echo\nport = ").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
