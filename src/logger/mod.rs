//! Run log: append-only JSONL events plus prefixed stderr for
//! warning-or-worse lines.
//!
//! Logging is fire-and-forget — a full disk or unwritable log directory
//! must never stop a notification run.

#![allow(missing_docs)]

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

// ──────────────────── level ────────────────────

/// Severity of a run-log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ──────────────────── event record ────────────────────

/// One JSONL line.
#[derive(Debug, Serialize)]
struct LogRecord<'a> {
    ts: String,
    level: LogLevel,
    event: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filesystem: Option<&'a str>,
    message: &'a str,
}

// ──────────────────── run log ────────────────────

/// Structured event log for one qnotify invocation.
pub struct RunLog {
    jsonl_path: Option<PathBuf>,
}

impl RunLog {
    /// Log to the given JSONL file (when set) and stderr.
    #[must_use]
    pub fn new(jsonl_path: Option<PathBuf>) -> Self {
        Self { jsonl_path }
    }

    /// Log to stderr only.
    #[must_use]
    pub fn stderr_only() -> Self {
        Self { jsonl_path: None }
    }

    /// Record an informational event.
    pub fn info(&self, event: &str, uid: Option<u32>, filesystem: Option<&str>, message: &str) {
        self.record(LogLevel::Info, event, uid, filesystem, message);
    }

    /// Record a warning (per-area or per-account skip).
    pub fn warn(&self, event: &str, uid: Option<u32>, filesystem: Option<&str>, message: &str) {
        self.record(LogLevel::Warning, event, uid, filesystem, message);
    }

    /// Record an error (run-level failure).
    pub fn error(&self, event: &str, uid: Option<u32>, filesystem: Option<&str>, message: &str) {
        self.record(LogLevel::Error, event, uid, filesystem, message);
    }

    fn record(
        &self,
        level: LogLevel,
        event: &str,
        uid: Option<u32>,
        filesystem: Option<&str>,
        message: &str,
    ) {
        let record = LogRecord {
            ts: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level,
            event,
            uid,
            filesystem,
            message,
        };

        if let Some(path) = &self.jsonl_path
            && let Ok(json) = serde_json::to_string(&record)
        {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let file = {
                let mut opts = OpenOptions::new();
                opts.create(true).append(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt as _;
                    opts.mode(0o600);
                }
                opts.open(path)
            };
            if let Ok(mut f) = file {
                let _ = writeln!(f, "{json}");
            }
        }

        if level >= LogLevel::Warning {
            let prefix = match level {
                LogLevel::Error => "ERROR",
                _ => "WARN",
            };
            eprintln!("[QNOTIFY] [{prefix}] {event}: {message}");
        }
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let log = RunLog::new(Some(path.clone()));

        log.info("probe_ok", Some(1000), Some("/home"), "probed");
        log.warn("probe_skip", Some(1001), Some("/srv"), "quotatool failed");

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in &lines {
            let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
            assert!(parsed.get("ts").is_some());
            assert!(parsed.get("level").is_some());
            assert!(parsed.get("event").is_some());
        }
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["level"], "warning");
        assert_eq!(second["uid"], 1001);
        assert_eq!(second["filesystem"], "/srv");
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("activity.jsonl");
        let log = RunLog::new(Some(path.clone()));

        log.info("run_complete", None, None, "done");

        let content = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert!(parsed.get("uid").is_none());
        assert!(parsed.get("filesystem").is_none());
    }

    #[test]
    fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("logs").join("activity.jsonl");
        let log = RunLog::new(Some(path.clone()));
        log.error("cache_failure", None, None, "disk full");
        assert!(path.exists());
    }

    #[test]
    fn stderr_only_log_never_touches_disk() {
        let log = RunLog::stderr_only();
        // Must not panic or create files.
        log.warn("probe_skip", Some(1000), Some("/home"), "no tool");
    }
}
