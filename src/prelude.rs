//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use quota_notify::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{QnError, Result};

// Quota model
pub use crate::quota::snapshot::QuotaSnapshot;
pub use crate::quota::state::{QuotaKind, QuotaState};

// Cache
#[cfg(feature = "sqlite")]
pub use crate::cache::store::QuotaCache;
pub use crate::cache::record::NotificationRecord;

// Engine
pub use crate::engine::{AccountView, Decision, DecisionEngine, NotificationPlan};

// Collaborators
pub use crate::notify::mailer::{Notifier, SendmailNotifier};
pub use crate::notify::template::TemplateCatalog;
pub use crate::probe::{ProbeReading, QuotaProbe};

// Runner
#[cfg(feature = "sqlite")]
pub use crate::runner::{RunSummary, Runner};
