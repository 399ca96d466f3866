#![forbid(unsafe_code)]

//! quota-notify (qnotify) — per-account disk-quota monitoring and owner
//! notification.
//!
//! Watches block and inode quotas across filesystems, remembers what each
//! account owner was last told, and decides when a new mail is warranted:
//! 1. **State evaluation** — raw usage/limit/grace numbers become a ranked
//!    [`quota::QuotaState`]
//! 2. **Decision engine** — current state vs. last-notified state, with
//!    worsening/recovery rules and flap-damping hysteresis
//! 3. **Durable cache** — one sqlite row per (filesystem, account, kind)
//!    carrying the last snapshot and the last notification sent
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use quota_notify::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use quota_notify::core::config::Config;
//! use quota_notify::engine::DecisionEngine;
//! ```

pub mod prelude;

pub mod cache;
pub mod core;
pub mod engine;
pub mod logger;
pub mod notify;
pub mod probe;
pub mod quota;
pub mod runner;
