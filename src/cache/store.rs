//! SQLite quota cache: WAL-mode store for notification records.
//!
//! One row per (filesystem, uid, quota kind). Rows are decoded into
//! strongly-typed [`NotificationRecord`]s at this boundary; the core never
//! touches columns by name. Per-account updates are committed in a single
//! transaction so an interrupted run never records a notification that
//! was not sent, or vice versa.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags, params};

use crate::cache::record::NotificationRecord;
use crate::core::errors::{QnError, Result};
use crate::quota::snapshot::QuotaSnapshot;
use crate::quota::state::{QuotaKind, QuotaState};

/// Durable key-value store of notification records.
pub struct QuotaCache {
    conn: Connection,
    path: PathBuf,
}

impl QuotaCache {
    /// Open (or create) the cache at `path`, applying schema and PRAGMAs.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| QnError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        apply_pragmas(&conn)?;
        apply_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Fetch the stored record for one quota area, if any.
    pub fn get(
        &self,
        filesystem: &str,
        uid: u32,
        kind: QuotaKind,
    ) -> Result<Option<NotificationRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT filesystem, uid, quota_kind, used, soft_limit, hard_limit,
                    grace_expires, last_notify_date, last_notify_state, last_update
             FROM quota_entry
             WHERE filesystem = ?1 AND uid = ?2 AND quota_kind = ?3",
        )?;
        let raw = stmt
            .query_map(params![filesystem, uid, kind.code()], RawRow::from_row)?
            .next()
            .transpose()?;
        raw.map(RawRow::decode).transpose()
    }

    /// Fetch the record for one quota area, or the default "never seen,
    /// assume fine" record when no row exists.
    pub fn record_or_default(
        &self,
        filesystem: &str,
        uid: u32,
        kind: QuotaKind,
        now: DateTime<Utc>,
    ) -> Result<NotificationRecord> {
        Ok(self
            .get(filesystem, uid, kind)?
            .unwrap_or_else(|| NotificationRecord::absent(filesystem, uid, kind, now)))
    }

    /// Upsert a single record.
    pub fn put(&self, record: &NotificationRecord) -> Result<()> {
        upsert(&self.conn, record)
    }

    /// Upsert all records for one account as a single transaction.
    pub fn put_all(&mut self, records: &[NotificationRecord]) -> Result<()> {
        let tx = self.conn.transaction().map_err(QnError::from)?;
        for record in records {
            upsert(&tx, record)?;
        }
        tx.commit().map_err(QnError::from)
    }

    /// All account uids with at least one stored record, ascending.
    pub fn all_accounts(&self) -> Result<Vec<u32>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT DISTINCT uid FROM quota_entry ORDER BY uid ASC")?;
        let uids = stmt
            .query_map([], |row| row.get::<_, u32>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(uids)
    }

    /// All records for one account, ordered by (filesystem, kind).
    pub fn records_for_account(&self, uid: u32) -> Result<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT filesystem, uid, quota_kind, used, soft_limit, hard_limit,
                    grace_expires, last_notify_date, last_notify_state, last_update
             FROM quota_entry
             WHERE uid = ?1
             ORDER BY filesystem ASC, quota_kind ASC",
        )?;
        let raw = stmt
            .query_map(params![uid], RawRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        raw.into_iter().map(RawRow::decode).collect()
    }

    /// Check that WAL mode is active (for diagnostics).
    pub fn is_wal_mode(&self) -> bool {
        self.conn
            .query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0))
            .map(|mode| mode.eq_ignore_ascii_case("wal"))
            .unwrap_or(false)
    }
}

fn upsert(conn: &Connection, record: &NotificationRecord) -> Result<()> {
    conn.prepare_cached(
        "INSERT INTO quota_entry (
            filesystem, uid, quota_kind, used, soft_limit, hard_limit,
            grace_expires, last_notify_date, last_notify_state, last_update
        ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)
        ON CONFLICT (filesystem, uid, quota_kind) DO UPDATE SET
            used = excluded.used,
            soft_limit = excluded.soft_limit,
            hard_limit = excluded.hard_limit,
            grace_expires = excluded.grace_expires,
            last_notify_date = excluded.last_notify_date,
            last_notify_state = excluded.last_notify_state,
            last_update = excluded.last_update",
    )?
    .execute(params![
        record.filesystem,
        record.uid,
        record.kind.code(),
        to_count(record.snapshot.used)?,
        to_count(record.snapshot.soft_limit)?,
        to_count(record.snapshot.hard_limit)?,
        record.snapshot.grace_expires.map(encode_ts),
        record.last_notify_date.map(encode_ts),
        record.last_notify_state.map(QuotaState::code),
        encode_ts(record.last_update),
    ])?;
    Ok(())
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn to_count(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| QnError::Sql {
        context: "quota_entry",
        details: format!("count {value} exceeds sqlite integer range"),
    })
}

// ──────────────────── row decode ────────────────────

/// Raw sqlite row; decoded into a typed record once, at this boundary.
struct RawRow {
    filesystem: String,
    uid: u32,
    quota_kind: i64,
    used: i64,
    soft_limit: i64,
    hard_limit: i64,
    grace_expires: Option<String>,
    last_notify_date: Option<String>,
    last_notify_state: Option<i64>,
    last_update: String,
}

impl RawRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            filesystem: row.get(0)?,
            uid: row.get(1)?,
            quota_kind: row.get(2)?,
            used: row.get(3)?,
            soft_limit: row.get(4)?,
            hard_limit: row.get(5)?,
            grace_expires: row.get(6)?,
            last_notify_date: row.get(7)?,
            last_notify_state: row.get(8)?,
            last_update: row.get(9)?,
        })
    }

    fn decode(self) -> Result<NotificationRecord> {
        let kind = QuotaKind::from_code(self.quota_kind).ok_or_else(|| QnError::Sql {
            context: "quota_entry",
            details: format!("invalid quota_kind code {}", self.quota_kind),
        })?;
        let last_notify_state = self
            .last_notify_state
            .map(|code| {
                QuotaState::from_code(code).ok_or_else(|| QnError::Sql {
                    context: "quota_entry",
                    details: format!("invalid last_notify_state code {code}"),
                })
            })
            .transpose()?;
        Ok(NotificationRecord {
            filesystem: self.filesystem,
            uid: self.uid,
            kind,
            snapshot: QuotaSnapshot {
                used: from_count(self.used, "used")?,
                soft_limit: from_count(self.soft_limit, "soft_limit")?,
                hard_limit: from_count(self.hard_limit, "hard_limit")?,
                grace_expires: self.grace_expires.as_deref().map(parse_ts).transpose()?,
            },
            last_notify_state,
            last_notify_date: self.last_notify_date.as_deref().map(parse_ts).transpose()?,
            last_update: parse_ts(&self.last_update)?,
        })
    }
}

fn from_count(value: i64, column: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| QnError::Sql {
        context: "quota_entry",
        details: format!("negative {column} count {value}"),
    })
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|error| QnError::Sql {
            context: "quota_entry",
            details: format!("invalid timestamp '{raw}': {error}"),
        })
}

// ──────────────────── schema & pragmas ────────────────────

fn apply_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA temp_store = MEMORY;
         PRAGMA busy_timeout = 5000;",
    )?;
    let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        eprintln!("[QNOTIFY] WARNING: requested WAL mode but got '{mode}'");
    }
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS quota_entry (
            filesystem TEXT NOT NULL,
            uid INTEGER NOT NULL,
            quota_kind INTEGER NOT NULL,
            used INTEGER NOT NULL,
            soft_limit INTEGER NOT NULL,
            hard_limit INTEGER NOT NULL,
            grace_expires TEXT,
            last_notify_date TEXT,
            last_notify_state INTEGER,
            last_update TEXT NOT NULL,
            PRIMARY KEY (filesystem, uid, quota_kind)
        );

        CREATE INDEX IF NOT EXISTS idx_quota_entry_uid ON quota_entry(uid);",
    )?;
    Ok(())
}

// ──────────────────── tests ────────────────────
