//! SQLite event store: read-only accessor over the fulfillment line log.
//!
//! Production callers open the database read-only and take one snapshot per
//! report. Both reads of a snapshot run inside a single deferred transaction,
//! so rows, fleet statistics and row count all derive from the same view even
//! while the capture system keeps writing (WAL mode).

#![allow(missing_docs)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{Connection, InterruptHandle, OpenFlags, params};

use crate::core::errors::{FmError, Result};
use crate::store::events::{DocumentType, EventSnapshot, EventSource, FulfillmentEvent};

/// Handle to the fulfillment log database.
pub struct SqliteEventStore {
    conn: Connection,
    path: PathBuf,
}

impl SqliteEventStore {
    /// Open (or create) the database at `path`, applying schema and PRAGMAs.
    ///
    /// Used by seeding tools and tests; reports should use [`Self::open_read_only`].
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| FmError::io(parent, source))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(path, &e))?;

        apply_pragmas(&conn)?;
        apply_schema(&conn)?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open an existing database without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FmError::StoreUnavailable {
                path: path.to_path_buf(),
                details: "database file does not exist".to_string(),
            });
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| unavailable(path, &e))?;
        conn.execute_batch("PRAGMA busy_timeout = 5000; PRAGMA query_only = ON;")
            .map_err(|e| unavailable(path, &e))?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Path to the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Handle that aborts in-flight reads from another thread.
    ///
    /// An interrupted read surfaces as [`FmError::Cancelled`].
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.conn.get_interrupt_handle()
    }

    // ──────────────────── writes (capture side) ────────────────────

    /// Insert one line event.
    pub fn record_event(&self, event: &FulfillmentEvent) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO fulfillment_log (
                request_id, sales_order, document_number, document_type,
                item_code, qty, qty_requested, assigned_at, updated_at, assignee_id
            ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10)",
            )?
            .execute(params![
                event.request_id,
                event.sales_order_id,
                event.document_number,
                event.document_type.code(),
                event.item_code,
                event.quantity_scanned,
                event.quantity_requested,
                format_ts(event.assigned_at),
                format_ts(event.updated_at),
                event.assignee_id,
            ])?;
        Ok(())
    }

    /// Insert or replace an assignee record.
    pub fn upsert_assignee(&self, id: i64, name: &str, lastname: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR REPLACE INTO assignee (id, name, lastname) VALUES (?1,?2,?3)",
            )?
            .execute(params![id, name, lastname])?;
        Ok(())
    }

    // ──────────────────── reads ────────────────────

    /// Every event with `assigned_at >= lower_bound`.
    ///
    /// The bound is compared chronologically, so rows written in SQLite's
    /// native format or with a UTC offset filter the same as canonical ones.
    /// Rows whose `assigned_at` SQLite cannot read are returned to the
    /// decoder, so they fail as malformed instead of vanishing. All rows are
    /// read and validated before returning; a single malformed row fails the
    /// whole call.
    pub fn fetch_events(&self, lower_bound: DateTime<Utc>) -> Result<Vec<FulfillmentEvent>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT id, request_id, sales_order, document_number, document_type,
                    item_code, qty, qty_requested, assigned_at, updated_at, assignee_id
             FROM fulfillment_log
             WHERE julianday(assigned_at) >= julianday(?1)
                OR julianday(assigned_at) IS NULL
             ORDER BY id ASC",
        )?;
        let raw = stmt
            .query_map(params![format_ts(lower_bound)], |row| {
                Ok(RawEventRow {
                    id: row.get(0)?,
                    request_id: row.get(1)?,
                    sales_order: row.get(2)?,
                    document_number: row.get(3)?,
                    document_type: row.get(4)?,
                    item_code: row.get(5)?,
                    qty: row.get(6)?,
                    qty_requested: row.get(7)?,
                    assigned_at: row.get(8)?,
                    updated_at: row.get(9)?,
                    assignee_id: row.get(10)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawEventRow::into_event).collect()
    }

    /// Display names ("name lastname") of assignees referenced by the window.
    pub fn assignee_names(&self, lower_bound: DateTime<Utc>) -> Result<HashMap<i64, String>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT a.id, a.name, a.lastname FROM assignee a
             WHERE a.id IN (
                SELECT DISTINCT assignee_id FROM fulfillment_log
                WHERE julianday(assigned_at) >= julianday(?1)
                  AND assignee_id IS NOT NULL
             )",
        )?;
        let names = stmt
            .query_map(params![format_ts(lower_bound)], |row| {
                let id: i64 = row.get(0)?;
                let name: Option<String> = row.get(1)?;
                let lastname: Option<String> = row.get(2)?;
                Ok((id, join_name(name.as_deref(), lastname.as_deref())))
            })?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(names)
    }

    /// Borrow the underlying connection.
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Check that WAL mode is active (for diagnostics).
    pub fn is_wal_mode(&self) -> bool {
        self.conn
            .query_row("PRAGMA journal_mode", [], |row| row.get::<_, String>(0))
            .map(|mode| mode.eq_ignore_ascii_case("wal"))
            .unwrap_or(false)
    }
}

impl EventSource for SqliteEventStore {
    fn snapshot(&self, lower_bound: DateTime<Utc>) -> Result<EventSnapshot> {
        let tx = self.conn.unchecked_transaction()?;
        let events = self.fetch_events(lower_bound)?;
        let assignees = self.assignee_names(lower_bound)?;
        tx.commit()?;
        Ok(EventSnapshot { events, assignees })
    }
}

// ──────────────────── row decoding ────────────────────

struct RawEventRow {
    id: i64,
    request_id: String,
    sales_order: String,
    document_number: String,
    document_type: String,
    item_code: String,
    qty: f64,
    qty_requested: Option<f64>,
    assigned_at: String,
    updated_at: String,
    assignee_id: Option<i64>,
}

impl RawEventRow {
    fn into_event(self) -> Result<FulfillmentEvent> {
        let malformed = |column: &'static str, details: String| FmError::MalformedRow {
            row_id: self.id,
            column,
            details,
        };

        if self.document_type.trim().is_empty() {
            return Err(malformed("document_type", "empty document type".to_string()));
        }
        if self.qty < 0.0 {
            return Err(malformed("qty", format!("negative quantity {}", self.qty)));
        }
        if let Some(requested) = self.qty_requested
            && requested < 0.0
        {
            return Err(malformed(
                "qty_requested",
                format!("negative quantity {requested}"),
            ));
        }
        let assigned_at = parse_ts(&self.assigned_at)
            .ok_or_else(|| malformed("assigned_at", format!("{:?}", self.assigned_at)))?;
        let updated_at = parse_ts(&self.updated_at)
            .ok_or_else(|| malformed("updated_at", format!("{:?}", self.updated_at)))?;

        Ok(FulfillmentEvent {
            request_id: self.request_id,
            sales_order_id: self.sales_order,
            document_number: self.document_number,
            document_type: DocumentType::from_code(&self.document_type),
            item_code: self.item_code,
            quantity_scanned: self.qty,
            quantity_requested: self.qty_requested,
            assigned_at,
            updated_at,
            assignee_id: self.assignee_id,
        })
    }
}

fn join_name(name: Option<&str>, lastname: Option<&str>) -> String {
    format!("{} {}", name.unwrap_or_default(), lastname.unwrap_or_default())
        .trim()
        .to_string()
}

/// Canonical stored form: RFC 3339 UTC with milliseconds.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Accept RFC 3339 and SQLite's own `YYYY-MM-DD HH:MM:SS[.fff]` (taken as UTC).
fn parse_ts(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn unavailable(path: &Path, error: &rusqlite::Error) -> FmError {
    FmError::StoreUnavailable {
        path: path.to_path_buf(),
        details: error.to_string(),
    }
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
        eprintln!("[FMON-SQLITE] WARNING: requested WAL mode but got '{mode}'");
    }
    Ok(())
}

fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS fulfillment_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            request_id TEXT NOT NULL,
            sales_order TEXT NOT NULL,
            document_number TEXT NOT NULL,
            document_type TEXT NOT NULL,
            item_code TEXT NOT NULL,
            qty REAL NOT NULL DEFAULT 0,
            qty_requested REAL,
            assigned_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            assignee_id INTEGER
        );

        CREATE TABLE IF NOT EXISTS assignee (
            id INTEGER PRIMARY KEY,
            name TEXT,
            lastname TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_fulfillment_assigned_at
            ON fulfillment_log(assigned_at);
        CREATE INDEX IF NOT EXISTS idx_fulfillment_request
            ON fulfillment_log(request_id, sales_order, document_number);",
    )?;
    Ok(())
}

// ──────────────────── tests ────────────────────
