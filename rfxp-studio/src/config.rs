//! Configuration for the studio web viewer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Tile storage settings.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub listen_addr: String,
    /// TCP port to bind.
    pub port: u16,
}

/// Tile storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory working images are resolved under.
    pub tile_dir: PathBuf,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1".into(),
            port: 8085,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            tile_dir: PathBuf::from("tiles"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl StudioConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// The `host:port` string the server binds.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.listen_addr, self.server.port)
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let cfg = StudioConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        assert!(text.contains("listen_addr"));
        assert!(text.contains("tile_dir"));
    }

    #[test]
    fn roundtrip_config() {
        let cfg = StudioConfig::default();
        let text = toml::to_string_pretty(&cfg).unwrap();
        let parsed: StudioConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.server.port, 8085);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let parsed: StudioConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.server.listen_addr, "127.0.0.1");
        assert_eq!(parsed.storage.tile_dir, PathBuf::from("tiles"));
    }

    #[test]
    fn bind_addr_joins_host_and_port() {
        assert_eq!(StudioConfig::default().bind_addr(), "127.0.0.1:8085");
    }
}
