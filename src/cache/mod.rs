//! Durable notification cache: persisted records and the sqlite store.

pub mod record;
#[cfg(feature = "sqlite")]
pub mod store;

pub use record::NotificationRecord;
#[cfg(feature = "sqlite")]
pub use store::QuotaCache;
