//! Quota probe boundary: raw usage readings and the collaborators that
//! produce them.

pub mod accounts;
pub mod mounts;
pub mod quotatool;

use chrono::{DateTime, Duration, Utc};

use crate::core::errors::Result;
use crate::quota::snapshot::QuotaSnapshot;
use crate::quota::state::QuotaKind;

pub use accounts::{AccountResolver, SystemAccounts};
pub use quotatool::QuotatoolProbe;

/// Raw numbers for one quota kind as reported by the system tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindReading {
    /// Blocks or inodes in use.
    pub used: u64,
    /// Soft limit; zero means no quota configured.
    pub soft_limit: u64,
    /// Hard limit.
    pub hard_limit: u64,
    /// Seconds left in the grace window; zero means no active window.
    pub grace_seconds: u64,
}

impl KindReading {
    /// Convert to a snapshot, anchoring the grace window at probe time.
    #[must_use]
    pub fn to_snapshot(self, probed_at: DateTime<Utc>) -> QuotaSnapshot {
        let grace_expires = if self.grace_seconds == 0 {
            None
        } else {
            let secs = i64::try_from(self.grace_seconds).unwrap_or(i64::MAX);
            Some(probed_at + Duration::seconds(secs))
        };
        QuotaSnapshot {
            used: self.used,
            soft_limit: self.soft_limit,
            hard_limit: self.hard_limit,
            grace_expires,
        }
    }
}

/// One probe result for (account, filesystem): both quota kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReading {
    /// Block quota numbers.
    pub block: KindReading,
    /// Inode quota numbers.
    pub inode: KindReading,
}

impl ProbeReading {
    /// Snapshot for one kind, anchored at probe time.
    #[must_use]
    pub fn snapshot(&self, kind: QuotaKind, probed_at: DateTime<Utc>) -> QuotaSnapshot {
        match kind {
            QuotaKind::Block => self.block.to_snapshot(probed_at),
            QuotaKind::Inode => self.inode.to_snapshot(probed_at),
        }
    }
}

/// External collaborator reporting current quota numbers.
pub trait QuotaProbe {
    /// Probe one (account, filesystem) pair.
    fn probe(&self, uid: u32, filesystem: &str) -> Result<ProbeReading>;
}

// ──────────────────── tests ────────────────────
