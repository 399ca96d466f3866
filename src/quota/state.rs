//! Quota kinds and the ranked severity state enumeration.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

// ──────────────────── quota kind ────────────────────

/// The two resources a filesystem quota can limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    Block,
    Inode,
}

impl QuotaKind {
    /// Both kinds, in storage-code order.
    pub const ALL: [Self; 2] = [Self::Block, Self::Inode];

    /// Stable integer code for persistence.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Block => 0,
            Self::Inode => 1,
        }
    }

    /// Decode a persisted integer code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Block),
            1 => Some(Self::Inode),
            _ => None,
        }
    }

    /// Lowercase name used in templates and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Inode => "inode",
        }
    }
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────── quota state ────────────────────

/// Discrete quota severity state, ranked ascending.
///
/// The severity order is a contract, not an artifact of declaration order:
/// every comparison goes through [`QuotaState::rank`]. `NoQuota` ranks
/// lowest but never participates in decisions or notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaState {
    NoQuota,
    UnderQuota,
    SoftLimit,
    HardLimit,
    GraceExpired,
}

impl QuotaState {
    /// Explicit severity rank. Higher is worse.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::NoQuota => 0,
            Self::UnderQuota => 1,
            Self::SoftLimit => 2,
            Self::HardLimit => 3,
            Self::GraceExpired => 4,
        }
    }

    /// Stable integer code for persistence (same numbering as `rank`).
    #[must_use]
    pub const fn code(self) -> i64 {
        self.rank() as i64
    }

    /// Decode a persisted integer code.
    #[must_use]
    pub const fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::NoQuota),
            1 => Some(Self::UnderQuota),
            2 => Some(Self::SoftLimit),
            3 => Some(Self::HardLimit),
            4 => Some(Self::GraceExpired),
            _ => None,
        }
    }

    /// Lowercase name used in config keys, templates, and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoQuota => "no_quota",
            Self::UnderQuota => "under_quota",
            Self::SoftLimit => "soft_limit",
            Self::HardLimit => "hard_limit",
            Self::GraceExpired => "grace_expired",
        }
    }

    /// Parse a state name as used in config keys.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "no_quota" => Some(Self::NoQuota),
            "under_quota" => Some(Self::UnderQuota),
            "soft_limit" => Some(Self::SoftLimit),
            "hard_limit" => Some(Self::HardLimit),
            "grace_expired" => Some(Self::GraceExpired),
            _ => None,
        }
    }

    /// Whether this state means the account is over quota somewhere.
    #[must_use]
    pub const fn is_over_quota(self) -> bool {
        matches!(self, Self::SoftLimit | Self::HardLimit | Self::GraceExpired)
    }
}

impl Ord for QuotaState {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for QuotaState {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QuotaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ──────────────────── tests ────────────────────
