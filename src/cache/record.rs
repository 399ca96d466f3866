//! The persisted memory of one quota area: last observed snapshot plus the
//! state and timestamp of the last notification actually sent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quota::snapshot::QuotaSnapshot;
use crate::quota::state::{QuotaKind, QuotaState};

/// One cache row, keyed by (filesystem, uid, kind).
///
/// Invariant: `last_notify_date` is present iff `last_notify_state` was
/// explicitly set by a send. A record that has never triggered a mail
/// carries `None` for both and reports [`QuotaState::UnderQuota`] as its
/// effective notify state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    /// Filesystem the quota applies to.
    pub filesystem: String,
    /// Account uid the quota applies to.
    pub uid: u32,
    /// Block or inode quota.
    pub kind: QuotaKind,
    /// Most recently observed usage and limits, kept for change detection
    /// and audit.
    pub snapshot: QuotaSnapshot,
    /// State in effect when the owner was last mailed; `None` if never.
    pub last_notify_state: Option<QuotaState>,
    /// When the owner was last mailed; `None` if never.
    pub last_notify_date: Option<DateTime<Utc>>,
    /// When this row was last written.
    pub last_update: DateTime<Utc>,
}

impl NotificationRecord {
    /// The default record for a tuple with no stored row: no snapshot yet
    /// (zero limits read as `no_quota`) and no notification history.
    #[must_use]
    pub fn absent(filesystem: &str, uid: u32, kind: QuotaKind, now: DateTime<Utc>) -> Self {
        Self {
            filesystem: filesystem.to_string(),
            uid,
            kind,
            snapshot: QuotaSnapshot::default(),
            last_notify_state: None,
            last_notify_date: None,
            last_update: now,
        }
    }

    /// The state the owner is assumed to have been told about last.
    ///
    /// Never notified means "pretend everything was fine" so that any
    /// over-quota observation counts as a worsening.
    #[must_use]
    pub fn effective_notify_state(&self) -> QuotaState {
        self.last_notify_state.unwrap_or(QuotaState::UnderQuota)
    }

    /// Merge a fresh probe snapshot, refreshing the audit timestamp.
    /// Notification fields are untouched.
    pub fn refresh_snapshot(&mut self, snapshot: QuotaSnapshot, now: DateTime<Utc>) {
        self.snapshot = snapshot;
        self.last_update = now;
    }

    /// Record that a notification reporting `state` was sent at `now`.
    pub fn mark_notified(&mut self, state: QuotaState, now: DateTime<Utc>) {
        self.last_notify_state = Some(state);
        self.last_notify_date = Some(now);
    }

    /// Check the notify-field pairing invariant.
    #[must_use]
    pub const fn notify_fields_consistent(&self) -> bool {
        self.last_notify_state.is_some() == self.last_notify_date.is_some()
    }
}

// ──────────────────── tests ────────────────────

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn absent_record_assumes_under_quota() {
        let rec = NotificationRecord::absent("/home", 1000, QuotaKind::Block, at(0));
        assert_eq!(rec.effective_notify_state(), QuotaState::UnderQuota);
        assert!(rec.last_notify_date.is_none());
        assert!(rec.notify_fields_consistent());
        // Zero limits classify as no_quota until a probe fills them in.
        assert_eq!(rec.snapshot.state_at(at(0)), QuotaState::NoQuota);
    }

    #[test]
    fn refresh_snapshot_leaves_notify_fields_alone() {
        let mut rec = NotificationRecord::absent("/home", 1000, QuotaKind::Block, at(0));
        rec.mark_notified(QuotaState::SoftLimit, at(100));
        rec.refresh_snapshot(
            QuotaSnapshot {
                used: 80,
                soft_limit: 50,
                hard_limit: 100,
                grace_expires: None,
            },
            at(200),
        );
        assert_eq!(rec.last_notify_state, Some(QuotaState::SoftLimit));
        assert_eq!(rec.last_notify_date, Some(at(100)));
        assert_eq!(rec.last_update, at(200));
        assert_eq!(rec.snapshot.used, 80);
    }

    #[test]
    fn mark_notified_sets_both_fields() {
        let mut rec = NotificationRecord::absent("/home", 1000, QuotaKind::Inode, at(0));
        rec.mark_notified(QuotaState::HardLimit, at(300));
        assert_eq!(rec.effective_notify_state(), QuotaState::HardLimit);
        assert_eq!(rec.last_notify_date, Some(at(300)));
        assert!(rec.notify_fields_consistent());
    }
}
