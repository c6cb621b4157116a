//! Server configuration

use crate::api::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL_SECS};
use anyhow::{Context, Result};
use pcos_core::history::HISTORY_FILE_NAME;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration, read from `pcos.toml` (optional) and `PCOS_*` variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Name reported in structured logs
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// JSON manifest of the classifier bundle
    #[serde(default = "default_model_manifest")]
    pub model_manifest: PathBuf,

    /// CSV prediction history
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,

    /// `json` or `text`
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Idle time before a form session is dropped
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "pcos-server".to_string())
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_model_manifest() -> PathBuf {
    PathBuf::from("model/model.json")
}

fn default_history_path() -> PathBuf {
    PathBuf::from(HISTORY_FILE_NAME)
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_session_ttl() -> u64 {
    DEFAULT_SESSION_TTL_SECS
}

fn default_max_sessions() -> usize {
    DEFAULT_MAX_SESSIONS
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            instance_name: default_instance_name(),
            host: default_host(),
            port: default_port(),
            model_manifest: default_model_manifest(),
            history_path: default_history_path(),
            log_format: default_log_format(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("pcos").required(false))
            .add_source(config::Environment::with_prefix("PCOS").try_parsing(true))
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn text_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("text")
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.history_path, PathBuf::from("riwayat_prediksi_pcos.csv"));
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert!(!config.text_logs());
    }

    #[test]
    fn test_empty_source_uses_defaults() {
        let config: ServerConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.model_manifest, PathBuf::from("model/model.json"));
        assert_eq!(config.log_format, "json");
        assert_eq!(config.session_ttl(), Duration::from_secs(30 * 60));
        assert_eq!(config.max_sessions, 1000);
    }

    #[test]
    fn test_session_limits_override() {
        let config: ServerConfig = config::Config::builder()
            .set_override("session_ttl_secs", 90)
            .unwrap()
            .set_override("max_sessions", 5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.session_ttl(), Duration::from_secs(90));
        assert_eq!(config.max_sessions, 5);
    }
}
