//! Node configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use starreg_verification::{
    ExpiryPolicy, QueueConfig, DEFAULT_PROTOCOL_TAG, DEFAULT_VALIDATION_WINDOW_MS,
};

use crate::logging::LogFormat;
use crate::NodeError;

/// Configuration for a star registry node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in megabytes.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// Interface the HTTP server binds to.
    #[serde(default = "default_rpc_host")]
    pub rpc_host: String,

    #[serde(default = "default_rpc_port")]
    pub rpc_port: u16,

    /// Whether to answer cross-origin requests from any origin.
    #[serde(default)]
    pub rpc_cors: bool,

    /// How long a challenge stays open, in milliseconds.
    #[serde(default = "default_validation_window_ms")]
    pub validation_window_ms: u64,

    /// Suffix of every challenge message.
    #[serde(default = "default_protocol_tag")]
    pub protocol_tag: String,

    /// Whether authorizations must still be inside their window when used.
    #[serde(default)]
    pub expiry_policy: ExpiryPolicy,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./starreg_data")
}

fn default_map_size_mb() -> usize {
    64
}

fn default_rpc_host() -> String {
    "127.0.0.1".to_string()
}

fn default_rpc_port() -> u16 {
    8000
}

fn default_validation_window_ms() -> u64 {
    DEFAULT_VALIDATION_WINDOW_MS
}

fn default_protocol_tag() -> String {
    DEFAULT_PROTOCOL_TAG.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, NodeError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| NodeError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        let config: Self = toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), NodeError> {
        if self.validation_window_ms == 0 {
            return Err(NodeError::Config(
                "validation_window_ms must be positive".into(),
            ));
        }
        if self.protocol_tag.is_empty() || self.protocol_tag.contains(':') {
            return Err(NodeError::Config(
                "protocol_tag must be non-empty and contain no ':'".into(),
            ));
        }
        if self.map_size_mb == 0 {
            return Err(NodeError::Config("map_size_mb must be positive".into()));
        }
        Ok(())
    }

    /// `host:port` for the HTTP listener.
    pub fn rpc_bind_addr(&self) -> String {
        format!("{}:{}", self.rpc_host, self.rpc_port)
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            validation_window_ms: self.validation_window_ms,
            protocol_tag: self.protocol_tag.clone(),
            expiry_policy: self.expiry_policy,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            rpc_host: default_rpc_host(),
            rpc_port: default_rpc_port(),
            rpc_cors: false,
            validation_window_ms: default_validation_window_ms(),
            protocol_tag: default_protocol_tag(),
            expiry_policy: ExpiryPolicy::default(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = NodeConfig::default();
        let toml_str = config.to_toml_string().unwrap();
        let parsed = NodeConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed.rpc_port, config.rpc_port);
        assert_eq!(parsed.validation_window_ms, config.validation_window_ms);
        assert_eq!(parsed.expiry_policy, config.expiry_policy);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = NodeConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.rpc_port, 8000);
        assert_eq!(config.validation_window_ms, 300_000);
        assert_eq!(config.protocol_tag, "starRegistry");
        assert_eq!(config.expiry_policy, ExpiryPolicy::AtSubmission);
        assert_eq!(config.log_format, LogFormat::Human);
        assert_eq!(config.data_dir, PathBuf::from("./starreg_data"));
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            rpc_port = 9999
            validation_window_ms = 60000
            expiry_policy = "at_submission_and_write"
            log_format = "json"
        "#;
        let config = NodeConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.rpc_port, 9999);
        assert_eq!(config.validation_window_ms, 60_000);
        assert_eq!(config.expiry_policy, ExpiryPolicy::AtSubmissionAndWrite);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.log_level, "info"); // default
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = NodeConfig::from_toml_str("validation_window_ms = 0").unwrap_err();
        assert!(matches!(err, NodeError::Config(_)));
    }

    #[test]
    fn tag_with_separator_is_rejected() {
        assert!(NodeConfig::from_toml_str("protocol_tag = \"a:b\"").is_err());
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(NodeConfig::from_toml_str("expiry_policy = \"never\"").is_err());
    }

    #[test]
    fn queue_config_carries_settings() {
        let config = NodeConfig {
            validation_window_ms: 1_000,
            protocol_tag: "tag".into(),
            ..NodeConfig::default()
        };
        let queue = config.queue_config();
        assert_eq!(queue.validation_window_ms, 1_000);
        assert_eq!(queue.protocol_tag, "tag");
        assert_eq!(config.rpc_bind_addr(), "127.0.0.1:8000");
    }
}
