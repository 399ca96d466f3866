//! Observed quota facts for one (filesystem, account, kind) and the pure
//! state evaluator that classifies them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::quota::state::QuotaState;

/// Filesystem block size assumed when converting block counts to bytes.
const BLOCK_BYTES: u64 = 1024;

/// The currently observed usage and limits for one quota area.
///
/// `grace_expires` is only meaningful while usage sits between the soft and
/// hard limit; callers must treat it as absent outside that window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
    /// Resources (blocks or inodes) currently in use.
    pub used: u64,
    /// Soft limit; zero means no quota is configured for this area.
    pub soft_limit: u64,
    /// Hard limit, enforced immediately.
    pub hard_limit: u64,
    /// When the grace period for exceeding the soft limit runs out.
    pub grace_expires: Option<DateTime<Utc>>,
}

impl QuotaSnapshot {
    /// Classify this snapshot into a discrete severity state.
    ///
    /// Evaluated fresh every run against the caller-captured `now`; the
    /// result is never persisted, only the snapshot and the state in
    /// effect at notification time are.
    ///
    /// An account over its soft limit whose grace window is absent or
    /// already elapsed is `GraceExpired`, not `SoftLimit`, even
    /// transiently.
    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> QuotaState {
        if self.soft_limit == 0 {
            return QuotaState::NoQuota;
        }
        if self.used < self.soft_limit {
            return QuotaState::UnderQuota;
        }
        if self.used < self.hard_limit && self.grace_expires.is_some_and(|g| now < g) {
            return QuotaState::SoftLimit;
        }
        if self.used >= self.hard_limit {
            return QuotaState::HardLimit;
        }
        QuotaState::GraceExpired
    }

    /// Block usage in bytes (block quotas only).
    #[must_use]
    pub const fn bytes_used(&self) -> u64 {
        self.used.saturating_mul(BLOCK_BYTES)
    }

    /// Soft limit in bytes (block quotas only).
    #[must_use]
    pub const fn byte_soft_limit(&self) -> u64 {
        self.soft_limit.saturating_mul(BLOCK_BYTES)
    }

    /// Hard limit in bytes (block quotas only).
    #[must_use]
    pub const fn byte_hard_limit(&self) -> u64 {
        self.hard_limit.saturating_mul(BLOCK_BYTES)
    }
}

// ──────────────────── tests ────────────────────
