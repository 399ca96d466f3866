//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{QnError, Result};
use crate::notify::template::StateTemplateOverride;

/// Full qnotify configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub cache: CacheConfig,
    pub probe: ProbeConfig,
    pub mail: MailConfig,
    pub engine: EngineConfig,
    pub log: LogConfig,
    /// Per-state template overrides keyed by state name ("soft_limit", ...).
    /// Fields left unset fall back to the built-in templates.
    pub templates: HashMap<String, StateTemplateOverride>,
}

/// Durable quota cache location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheConfig {
    pub path: PathBuf,
}

/// Probe invocation and system-table locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Quota reporting tool invoked per (account, filesystem).
    pub command: PathBuf,
    /// Mount table scanned for `usrquota` filesystems.
    pub mount_table: PathBuf,
    /// Account database enumerated by `qnotify update`.
    pub passwd_file: PathBuf,
    /// Explicit filesystem list; empty means discover from the mount table.
    pub filesystems: Vec<String>,
}

/// Outgoing mail settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MailConfig {
    /// Sendmail-compatible binary the composed message is piped through.
    pub sendmail_command: PathBuf,
    /// Local part (or full address) used as the envelope From.
    pub from_address: String,
    /// Optional Reply-To header.
    pub reply_to: Option<String>,
    /// Domain appended to bare local parts when forming addresses.
    pub domain: String,
    /// When true, all mail is rerouted to `debug_recipient`.
    pub debug: bool,
    pub debug_recipient: String,
}

/// Decision-engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum minutes after the last notification before an "all clear"
    /// mail may confirm a recovery. Damps edge flapping.
    pub hysteresis_minutes: u64,
}

/// Run-log destinations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Append-only JSONL event log; `None` disables the file sink.
    pub jsonl_path: Option<PathBuf>,
}

fn home_data_dir() -> PathBuf {
    let home_dir = env::var_os("HOME").map_or_else(
        || {
            eprintln!("[QNOTIFY] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    );
    home_dir.join(".local").join("share").join("qnotify")
}

fn default_domain() -> String {
    #[cfg(unix)]
    {
        if let Ok(name) = nix::unistd::gethostname() {
            let name = name.to_string_lossy();
            if !name.is_empty() {
                return name.into_owned();
            }
        }
    }
    "localhost".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: home_data_dir().join("cache.sqlite3"),
        }
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: PathBuf::from("quotatool"),
            mount_table: PathBuf::from("/etc/mtab"),
            passwd_file: PathBuf::from("/etc/passwd"),
            filesystems: Vec::new(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            sendmail_command: PathBuf::from("/usr/sbin/sendmail"),
            from_address: "root".to_string(),
            reply_to: None,
            domain: default_domain(),
            debug: false,
            debug_recipient: "root".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hysteresis_minutes: 30,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            jsonl_path: Some(home_data_dir().join("activity.jsonl")),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        let home_dir = env::var_os("HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from);
        home_dir.join(".config").join("qnotify").join("config.toml")
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from the default
    /// path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| QnError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(QnError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        // cache
        set_env_path("QNOTIFY_CACHE_PATH", &mut self.cache.path);

        // probe
        set_env_path("QNOTIFY_PROBE_COMMAND", &mut self.probe.command);
        set_env_path("QNOTIFY_PROBE_MOUNT_TABLE", &mut self.probe.mount_table);
        set_env_path("QNOTIFY_PROBE_PASSWD_FILE", &mut self.probe.passwd_file);

        // mail
        set_env_path("QNOTIFY_MAIL_SENDMAIL_COMMAND", &mut self.mail.sendmail_command);
        set_env_string("QNOTIFY_MAIL_FROM_ADDRESS", &mut self.mail.from_address);
        set_env_string("QNOTIFY_MAIL_DOMAIN", &mut self.mail.domain);
        set_env_bool("QNOTIFY_MAIL_DEBUG", &mut self.mail.debug)?;
        set_env_string("QNOTIFY_MAIL_DEBUG_RECIPIENT", &mut self.mail.debug_recipient);
        if let Some(raw) = env::var_os("QNOTIFY_MAIL_REPLY_TO") {
            let raw = raw.to_string_lossy().into_owned();
            self.mail.reply_to = if raw.is_empty() { None } else { Some(raw) };
        }

        // engine
        set_env_u64(
            "QNOTIFY_ENGINE_HYSTERESIS_MINUTES",
            &mut self.engine.hysteresis_minutes,
        )?;

        // log
        if let Some(raw) = env::var_os("QNOTIFY_LOG_JSONL_PATH") {
            let raw = raw.to_string_lossy().into_owned();
            self.log.jsonl_path = if raw.is_empty() {
                None
            } else {
                Some(PathBuf::from(raw))
            };
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.cache.path.as_os_str().is_empty() {
            return Err(QnError::InvalidConfig {
                details: "cache.path must not be empty".to_string(),
            });
        }
        if self.probe.command.as_os_str().is_empty() {
            return Err(QnError::InvalidConfig {
                details: "probe.command must not be empty".to_string(),
            });
        }
        if self.mail.from_address.is_empty() {
            return Err(QnError::InvalidConfig {
                details: "mail.from_address must not be empty".to_string(),
            });
        }
        if self.mail.domain.is_empty() {
            return Err(QnError::InvalidConfig {
                details: "mail.domain must not be empty".to_string(),
            });
        }
        if self.mail.debug && self.mail.debug_recipient.is_empty() {
            return Err(QnError::InvalidConfig {
                details: "mail.debug_recipient must not be empty when mail.debug is set"
                    .to_string(),
            });
        }
        for fs in &self.probe.filesystems {
            if fs.is_empty() {
                return Err(QnError::InvalidConfig {
                    details: "probe.filesystems entries must not be empty".to_string(),
                });
            }
        }
        for state in self.templates.keys() {
            if crate::quota::state::QuotaState::from_name(state).is_none() {
                return Err(QnError::InvalidConfig {
                    details: format!("templates.{state} does not name a quota state"),
                });
            }
        }
        Ok(())
    }
}

// ──────────────────── env helpers ────────────────────

fn set_env_string(key: &str, target: &mut String) {
    if let Some(raw) = env::var_os(key) {
        *target = raw.to_string_lossy().into_owned();
    }
}

fn set_env_path(key: &str, target: &mut PathBuf) {
    if let Some(raw) = env::var_os(key) {
        *target = PathBuf::from(raw);
    }
}

fn set_env_u64(key: &str, target: &mut u64) -> Result<()> {
    if let Some(raw) = env::var_os(key) {
        let raw = raw.to_string_lossy();
        *target = raw.parse().map_err(|_| QnError::InvalidConfig {
            details: format!("{key} must be a non-negative integer, got '{raw}'"),
        })?;
    }
    Ok(())
}

fn set_env_bool(key: &str, target: &mut bool) -> Result<()> {
    if let Some(raw) = env::var_os(key) {
        let raw = raw.to_string_lossy();
        *target = match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => {
                return Err(QnError::InvalidConfig {
                    details: format!("{key} must be a boolean, got '{raw}'"),
                });
            }
        };
    }
    Ok(())
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let cfg = Config::default();
        cfg.validate().expect("defaults must validate");
        assert_eq!(cfg.engine.hysteresis_minutes, 30);
        assert_eq!(cfg.mail.from_address, "root");
        assert!(cfg.probe.filesystems.is_empty());
    }

    #[test]
    fn config_roundtrip_toml() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(cfg, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [engine]
            hysteresis_minutes = 5

            [mail]
            domain = "example.org"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.engine.hysteresis_minutes, 5);
        assert_eq!(cfg.mail.domain, "example.org");
        assert_eq!(cfg.probe.command, PathBuf::from("quotatool"));
    }

    #[test]
    fn template_override_parses() {
        let cfg: Config = toml::from_str(
            r#"
            [templates.soft_limit]
            subject = "Heads up, ${USERNAME}"
            "#,
        )
        .unwrap();
        cfg.validate().unwrap();
        let over = cfg.templates.get("soft_limit").unwrap();
        assert_eq!(over.subject.as_deref(), Some("Heads up, ${USERNAME}"));
        assert!(over.header.is_none());
    }

    #[test]
    fn unknown_template_state_rejected() {
        let cfg: Config = toml::from_str(
            r#"
            [templates.way_over]
            subject = "nope"
            "#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert_eq!(err.code(), "QN-1001");
    }

    #[test]
    fn missing_explicit_config_is_error() {
        let err = Config::load(Some(Path::new("/nonexistent/qnotify.toml"))).unwrap_err();
        assert_eq!(err.code(), "QN-1002");
    }

    #[test]
    fn empty_from_address_rejected() {
        let mut cfg = Config::default();
        cfg.mail.from_address.clear();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("from_address"));
    }
}
