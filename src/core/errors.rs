//! QN-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, QnError>;

/// Top-level error type for quota-notify.
#[derive(Debug, Error)]
pub enum QnError {
    #[error("[QN-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[QN-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[QN-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[QN-2001] quota probe failure for uid {uid} on {filesystem}: {details}")]
    Probe {
        uid: u32,
        filesystem: String,
        details: String,
    },

    #[error("[QN-2002] quota probe output parse failure: {details}")]
    ProbeParse { details: String },

    #[error("[QN-2101] mount table parse failure: {details}")]
    MountParse { details: String },

    #[error("[QN-2201] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[QN-2202] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[QN-3001] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[QN-3101] notification delivery failure to {recipient}: {details}")]
    Notify { recipient: String, details: String },

    #[error("[QN-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl QnError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "QN-1001",
            Self::MissingConfig { .. } => "QN-1002",
            Self::ConfigParse { .. } => "QN-1003",
            Self::Probe { .. } => "QN-2001",
            Self::ProbeParse { .. } => "QN-2002",
            Self::MountParse { .. } => "QN-2101",
            Self::Sql { .. } => "QN-2201",
            Self::Serialization { .. } => "QN-2202",
            Self::Io { .. } => "QN-3001",
            Self::Notify { .. } => "QN-3101",
            Self::Runtime { .. } => "QN-3900",
        }
    }

    /// Whether the run can continue past this failure (skip the affected
    /// area or account) rather than aborting.
    ///
    /// Probe, parse, and delivery failures are recovered locally; cache
    /// and configuration failures are not.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Probe { .. } | Self::ProbeParse { .. } | Self::Notify { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for QnError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for QnError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for QnError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<QnError> {
        vec![
            QnError::InvalidConfig {
                details: String::new(),
            },
            QnError::MissingConfig {
                path: PathBuf::new(),
            },
            QnError::ConfigParse {
                context: "",
                details: String::new(),
            },
            QnError::Probe {
                uid: 0,
                filesystem: String::new(),
                details: String::new(),
            },
            QnError::ProbeParse {
                details: String::new(),
            },
            QnError::MountParse {
                details: String::new(),
            },
            QnError::Sql {
                context: "",
                details: String::new(),
            },
            QnError::Serialization {
                context: "",
                details: String::new(),
            },
            QnError::Io {
                path: PathBuf::new(),
                source: std::io::Error::other("test"),
            },
            QnError::Notify {
                recipient: String::new(),
                details: String::new(),
            },
            QnError::Runtime {
                details: String::new(),
            },
        ]
    }

    #[test]
    fn error_codes_are_unique() {
        let errors = sample_errors();
        let codes: Vec<&str> = errors.iter().map(QnError::code).collect();
        let unique: std::collections::HashSet<&&str> = codes.iter().collect();
        assert_eq!(
            codes.len(),
            unique.len(),
            "error codes must be unique: {codes:?}"
        );
    }

    #[test]
    fn error_codes_have_qn_prefix() {
        for err in &sample_errors() {
            assert!(
                err.code().starts_with("QN-"),
                "code {} must start with QN-",
                err.code()
            );
        }
    }

    #[test]
    fn error_display_includes_code() {
        let err = QnError::InvalidConfig {
            details: "bad value".to_string(),
        };
        let msg = err.to_string();
        assert!(
            msg.contains("QN-1001"),
            "display should contain error code: {msg}"
        );
        assert!(
            msg.contains("bad value"),
            "display should contain details: {msg}"
        );
    }

    #[test]
    fn recoverable_errors_are_correct() {
        // Recovered per-area or per-account.
        assert!(
            QnError::Probe {
                uid: 1000,
                filesystem: "/home".to_string(),
                details: String::new(),
            }
            .is_recoverable()
        );
        assert!(
            QnError::ProbeParse {
                details: String::new()
            }
            .is_recoverable()
        );
        assert!(
            QnError::Notify {
                recipient: "alice".to_string(),
                details: String::new(),
            }
            .is_recoverable()
        );

        // Abort the run.
        assert!(
            !QnError::Sql {
                context: "",
                details: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !QnError::InvalidConfig {
                details: String::new()
            }
            .is_recoverable()
        );
        assert!(
            !QnError::MissingConfig {
                path: PathBuf::new()
            }
            .is_recoverable()
        );
        assert!(
            !QnError::MountParse {
                details: String::new()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn io_convenience_constructor() {
        let err = QnError::io(
            "/var/lib/qnotify/cache.sqlite3",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.code(), "QN-3001");
        assert!(err.to_string().contains("/var/lib/qnotify/cache.sqlite3"));
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn from_rusqlite_error() {
        let sql_err =
            rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(1), Some("test".to_string()));
        let err: QnError = sql_err.into();
        assert_eq!(err.code(), "QN-2201");
    }

    #[test]
    fn from_toml_error() {
        let toml_err = toml::from_str::<toml::Value>("= invalid").unwrap_err();
        let err: QnError = toml_err.into();
        assert_eq!(err.code(), "QN-1003");
    }
}
