//! Structured JSON logger
//!
//! - One log line = one event
//! - Deterministic key ordering (`event`, `severity`, then fields alphabetically)
//! - Encoded with `serde_json`, so control characters never split a line
//! - Synchronous, no buffering
//! - Events below the process-wide minimum severity are dropped

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Planner decisions, cache and index transitions
    Trace = 0,
    /// Mutations and other normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(level: u8) -> Self {
        match level {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Warn as u8);

/// A structured logger that writes JSON lines to stderr.
pub struct Logger;

impl Logger {
    /// Sets the minimum severity that is written.
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Returns the current minimum severity.
    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Returns true if an event of this severity would be written.
    ///
    /// Call sites that need to format field values check this first.
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Writes one event if its severity passes the threshold
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = Self::render(severity, event, fields);
        let mut stderr = io::stderr().lock();
        // Write failures are ignored
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }

    /// One JSON object terminated by a newline: `event`, `severity`, then
    /// the fields sorted by key. A repeated key keeps its last value.
    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut object = Map::with_capacity(fields.len() + 2);
        object.insert("event".into(), JsonValue::from(event));
        object.insert("severity".into(), JsonValue::from(severity.as_str()));
        for (key, value) in sorted {
            object.insert((*key).to_string(), JsonValue::from(*value));
        }
        let mut line = JsonValue::Object(object).to_string();
        line.push('\n');
        line
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Error, event, fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_log_json_format() {
        let output = Logger::render(Severity::Trace, "ARRAY_PLAN", &[("scan", "INDEX_EQ")]);

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["event"], "ARRAY_PLAN");
        assert_eq!(parsed["severity"], "TRACE");
        assert_eq!(parsed["scan"], "INDEX_EQ");
    }

    #[test]
    fn test_log_deterministic_ordering() {
        let output1 = Logger::render(Severity::Info, "T", &[("zebra", "1"), ("apple", "2")]);
        let output2 = Logger::render(Severity::Info, "T", &[("apple", "2"), ("zebra", "1")]);
        assert_eq!(output1, output2);
        assert!(output1.find("apple").unwrap() < output1.find("zebra").unwrap());
    }

    #[test]
    fn test_log_escapes_special_chars() {
        let output = Logger::render(Severity::Info, "SQL_EXEC", &[("sql", "a \"b\"\nc")]);
        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["sql"], "a \"b\"\nc");
        assert_eq!(output.chars().filter(|c| *c == '\n').count(), 1);
    }

    #[test]
    fn test_severity_serde_uppercase() {
        let parsed: Severity = serde_json::from_str("\"TRACE\"").unwrap();
        assert_eq!(parsed, Severity::Trace);
    }
}
