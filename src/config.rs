//! Engine configuration
//!
//! Every field is optional in the JSON form; missing fields take the
//! defaults below.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::observability::{Logger, Severity};
use crate::table::{TableError, TableResult};

/// Tunables shared by every view derived from a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rows buffered by the first full iteration of a view before
    /// buffering is disabled for that view.
    #[serde(default = "default_buffer_threshold")]
    pub buffer_threshold: usize,

    /// Rows fetched per statement by the SQL backend while streaming.
    #[serde(default = "default_sql_fetch_batch")]
    pub sql_fetch_batch: usize,

    /// Minimum severity written by the logger.
    #[serde(default = "default_log_level")]
    pub log_level: Severity,
}

fn default_buffer_threshold() -> usize {
    1000
}

fn default_sql_fetch_batch() -> usize {
    256
}

fn default_log_level() -> Severity {
    Severity::Warn
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            buffer_threshold: default_buffer_threshold(),
            sql_fetch_batch: default_sql_fetch_batch(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> TableResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> TableResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Sets the buffering threshold.
    pub fn with_buffer_threshold(mut self, threshold: usize) -> Self {
        self.buffer_threshold = threshold;
        self
    }

    /// Sets the SQL fetch batch size.
    pub fn with_sql_fetch_batch(mut self, batch: usize) -> Self {
        self.sql_fetch_batch = batch;
        self
    }

    /// Applies the logging level process-wide.
    pub fn apply_logging(&self) {
        Logger::set_min_severity(self.log_level);
    }

    fn validate(&self) -> TableResult<()> {
        if self.sql_fetch_batch == 0 {
            return Err(TableError::InvalidConfig(
                "sql_fetch_batch must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.buffer_threshold, 1000);
        assert_eq!(config.sql_fetch_batch, 256);
        assert_eq!(config.log_level, Severity::Warn);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(r#"{"buffer_threshold": 10}"#).unwrap();
        assert_eq!(config.buffer_threshold, 10);
        assert_eq!(config.sql_fetch_batch, 256);
    }

    #[test]
    fn test_log_level_from_json() {
        let config = EngineConfig::from_json_str(r#"{"log_level": "TRACE"}"#).unwrap();
        assert_eq!(config.log_level, Severity::Trace);
    }

    #[test]
    fn test_zero_batch_rejected() {
        let err = EngineConfig::from_json_str(r#"{"sql_fetch_batch": 0}"#).unwrap_err();
        assert_eq!(err.code(), "TABLE_INVALID_CONFIG");
    }
}
