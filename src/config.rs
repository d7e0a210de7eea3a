//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EMAILCLIPPER_CONFIG` (environment variable)
//! 2. `~/.config/emailclipper/config.toml` (Linux/macOS)
//!    `%APPDATA%\emailclipper\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Where and how to reach the clipper service.
    pub service: ServiceConfig,
    /// Note rendering options.
    pub note: NoteConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Override data directory for the recent-notebooks file.
    pub data_dir: Option<PathBuf>,
}

/// Clipper service location and request policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Host the service listens on.
    pub host: String,
    /// First candidate port.
    pub base_port: u16,
    /// Number of ports probed after `base_port` (inclusive range end offset).
    pub port_span: u16,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Pause between two discovery passes in milliseconds.
    pub retry_delay_ms: u64,
    /// API token, sent as the `token` query parameter when set.
    pub token: Option<String>,
}

/// Note rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteConfig {
    /// Render the Date row when the message carries a date.
    pub include_date: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            cache_dir: None,
            data_dir: None,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            base_port: 41184,
            port_span: 10,
            timeout_ms: 10_000,
            retry_delay_ms: 1_000,
            token: None,
        }
    }
}

impl Default for NoteConfig {
    fn default() -> Self {
        Self { include_date: true }
    }
}

impl ServiceConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Pause between discovery passes.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Candidate ports in probing order. Saturates at `u16::MAX`.
    pub fn ports(&self) -> std::ops::RangeInclusive<u16> {
        self.base_port..=self.base_port.saturating_add(self.port_span)
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location and return the path written.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EMAILCLIPPER_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("emailclipper").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emailclipper")
}

/// Return the data directory holding persisted picks.
pub fn data_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.data_dir {
        return dir.clone();
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("emailclipper")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("emailclipper.log")
}

/// Return the recent-notebooks file path.
pub fn recent_picks_path(config: &Config) -> PathBuf {
    data_dir(config).join("recent_notebooks.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.service.host, "127.0.0.1");
        assert_eq!(cfg.service.base_port, 41184);
        assert_eq!(cfg.service.timeout(), Duration::from_secs(10));
        assert_eq!(cfg.service.retry_delay(), Duration::from_millis(1000));
        assert!(cfg.service.token.is_none());
        assert!(cfg.note.include_date);
    }

    #[test]
    fn test_default_port_range_has_eleven_candidates() {
        let ports: Vec<u16> = ServiceConfig::default().ports().collect();
        assert_eq!(ports.len(), 11);
        assert_eq!(ports.first(), Some(&41184));
        assert_eq!(ports.last(), Some(&41194));
    }

    #[test]
    fn test_port_range_saturates() {
        let cfg = ServiceConfig {
            base_port: u16::MAX - 2,
            ..ServiceConfig::default()
        };
        assert_eq!(cfg.ports().count(), 3);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.service.token = Some("abc".to_string());
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.service.base_port, cfg.service.base_port);
        assert_eq!(parsed.service.token.as_deref(), Some("abc"));
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[service]
base_port = 50000

[note]
include_date = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.service.base_port, 50000);
        assert!(!cfg.note.include_date);
        // Other fields use defaults
        assert_eq!(cfg.service.port_span, 10);
        assert_eq!(cfg.service.timeout_ms, 10_000);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_paths_follow_overrides() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/ec-cache"));
        cfg.general.data_dir = Some(PathBuf::from("/tmp/ec-data"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/ec-cache/emailclipper.log")
        );
        assert_eq!(
            recent_picks_path(&cfg),
            PathBuf::from("/tmp/ec-data/recent_notebooks.json")
        );
    }
}
