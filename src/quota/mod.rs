//! Quota domain model: kinds, severity states, snapshots, state evaluation.

pub mod snapshot;
pub mod state;

pub use snapshot::QuotaSnapshot;
pub use state::{QuotaKind, QuotaState};
