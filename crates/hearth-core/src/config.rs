//! Engine configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found")]
    NotFound,
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Code shape parameters. The alphabet is uppercase; normalization upper-cases
/// input before matching against it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CodeConfig {
    #[serde(default = "default_alphabet")]
    pub alphabet: String,
    /// Codes at or below this length are short-shape.
    #[serde(default = "default_short_len")]
    pub short_len: usize,
    /// Length of generated long codes.
    #[serde(default = "default_long_len")]
    pub long_len: usize,
    /// Anything longer than this after normalization is rejected.
    #[serde(default = "default_long_len")]
    pub max_len: usize,
}

fn default_alphabet() -> String {
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789".to_string()
}

fn default_short_len() -> usize {
    8
}

fn default_long_len() -> usize {
    20
}

impl Default for CodeConfig {
    fn default() -> Self {
        Self {
            alphabet: default_alphabet(),
            short_len: default_short_len(),
            long_len: default_long_len(),
            max_len: default_long_len(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub code: CodeConfig,
    /// Per-round-trip deadline for store calls, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Bounded CAS retries for the occupancy append after consumption.
    #[serde(default = "default_attach_retries")]
    pub attach_retry_attempts: u32,
    /// Bounded regenerations when an issued code collides.
    #[serde(default = "default_issue_retries")]
    pub issue_retry_attempts: u32,
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_attach_retries() -> u32 {
    3
}

fn default_issue_retries() -> u32 {
    5
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            code: CodeConfig::default(),
            store_timeout_ms: default_store_timeout_ms(),
            attach_retry_attempts: default_attach_retries(),
            issue_retry_attempts: default_issue_retries(),
        }
    }
}

impl EngineConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Load config from a JSON file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                ConfigError::Read(e)
            }
        })?;
        Ok(serde_json::from_str(&contents)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn defaults_match_portal_conventions() {
        let config = EngineConfig::default();
        assert_eq!(config.code.short_len, 8);
        assert_eq!(config.code.long_len, 20);
        assert_eq!(config.code.max_len, 20);
        assert_eq!(config.code.alphabet.len(), 36);
        assert_eq!(config.store_timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "store_timeout_ms": 250 }}"#).unwrap();

        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.store_timeout_ms, 250);
        assert_eq!(config.code.short_len, 8);
        assert_eq!(config.attach_retry_attempts, 3);
    }

    #[test]
    fn missing_file_is_notfound() {
        let result = EngineConfig::load_from("/nonexistent/hearth.json");
        assert!(matches!(result, Err(ConfigError::NotFound)));
    }

    #[test]
    fn invalid_json_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json }}").unwrap();
        let result = EngineConfig::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
