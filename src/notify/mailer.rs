//! Delivery boundary: the `Notifier` trait and a sendmail-backed
//! implementation.
//!
//! Address derivation (local part + domain) and header composition happen
//! here, not in the decision engine. Delivery failures surface as errors so
//! the runner can leave notify state unadvanced and retry next run.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::core::config::MailConfig;
use crate::core::errors::{QnError, Result};

/// Delivers one rendered notification to one recipient account.
pub trait Notifier {
    /// Send `subject`/`body` to the named recipient account (a local part
    /// or a full address).
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Pipes an RFC 822 message through a sendmail-compatible command.
pub struct SendmailNotifier {
    command: PathBuf,
    from_address: String,
    reply_to: Option<String>,
    domain: String,
}

impl SendmailNotifier {
    /// Build from the mail section of the configuration.
    #[must_use]
    pub fn from_config(mail: &MailConfig) -> Self {
        Self {
            command: mail.sendmail_command.clone(),
            from_address: mail.from_address.clone(),
            reply_to: mail.reply_to.clone(),
            domain: mail.domain.clone(),
        }
    }

    fn qualify(&self, address: &str) -> String {
        if address.contains('@') {
            address.to_string()
        } else {
            format!("{address}@{}", self.domain)
        }
    }

    fn compose_rfc822(&self, to_addr: &str, subject: &str, body: &str) -> String {
        let from_addr = self.qualify(&self.from_address);
        let mut message = String::new();
        message.push_str(&format!("From: {from_addr}\n"));
        message.push_str(&format!("To: {to_addr}\n"));
        if let Some(reply_to) = &self.reply_to {
            message.push_str(&format!("Reply-To: {reply_to}\n"));
        }
        message.push_str(&format!("Subject: {subject}\n"));
        message.push('\n');
        message.push_str(body);
        message
    }
}

impl Notifier for SendmailNotifier {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to_addr = self.qualify(recipient);
        let message = self.compose_rfc822(&to_addr, subject, body);

        let notify_err = |details: String| QnError::Notify {
            recipient: to_addr.clone(),
            details,
        };

        let mut child = Command::new(&self.command)
            .arg("-i")
            .arg(&to_addr)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|error| notify_err(format!("failed to spawn sendmail: {error}")))?;

        child
            .stdin
            .take()
            .ok_or_else(|| notify_err("sendmail stdin unavailable".to_string()))?
            .write_all(message.as_bytes())
            .map_err(|error| notify_err(format!("failed to write message: {error}")))?;

        let status = child
            .wait()
            .map_err(|error| notify_err(format!("failed to wait for sendmail: {error}")))?;
        if !status.success() {
            return Err(notify_err(format!("sendmail exited with {status}")));
        }
        Ok(())
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> SendmailNotifier {
        SendmailNotifier {
            command: PathBuf::from("/usr/sbin/sendmail"),
            from_address: "root".to_string(),
            reply_to: None,
            domain: "files.example.org".to_string(),
        }
    }

    #[test]
    fn bare_local_parts_gain_the_domain() {
        let n = notifier();
        assert_eq!(n.qualify("alice"), "alice@files.example.org");
    }

    #[test]
    fn full_addresses_pass_through() {
        let n = notifier();
        assert_eq!(n.qualify("ops@example.com"), "ops@example.com");
    }

    #[test]
    fn message_headers_precede_blank_line_and_body() {
        let n = notifier();
        let message = n.compose_rfc822("alice@files.example.org", "Quota warning", "Body text\n");
        let (headers, body) = message.split_once("\n\n").unwrap();
        assert!(headers.contains("From: root@files.example.org"));
        assert!(headers.contains("To: alice@files.example.org"));
        assert!(headers.contains("Subject: Quota warning"));
        assert!(!headers.contains("Reply-To:"));
        assert_eq!(body, "Body text\n");
    }

    #[test]
    fn reply_to_header_included_when_configured() {
        let mut n = notifier();
        n.reply_to = Some("helpdesk@example.org".to_string());
        let message = n.compose_rfc822("alice@files.example.org", "s", "b");
        assert!(message.contains("Reply-To: helpdesk@example.org\n"));
    }

    #[test]
    fn failed_spawn_is_a_notify_error() {
        let n = SendmailNotifier {
            command: PathBuf::from("/nonexistent/sendmail-missing"),
            from_address: "root".to_string(),
            reply_to: None,
            domain: "example.org".to_string(),
        };
        let err = n.send("alice", "s", "b").unwrap_err();
        assert_eq!(err.code(), "QN-3101");
    }

    #[test]
    fn from_config_copies_mail_settings() {
        let mut mail = MailConfig::default();
        mail.domain = "example.net".to_string();
        mail.reply_to = Some("noc@example.net".to_string());
        let n = SendmailNotifier::from_config(&mail);
        assert_eq!(n.qualify("bob"), "bob@example.net");
        assert_eq!(n.reply_to.as_deref(), Some("noc@example.net"));
    }
}
