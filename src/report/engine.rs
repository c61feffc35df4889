//! Report engine: snapshot → aggregate → fleet statistics → assemble.
//!
//! Each call to [`ReportEngine::generate`] is a pure function of the store
//! contents and the query. The engine keeps no state between calls and does
//! no logging; a store failure aborts the whole report.

#![allow(missing_docs)]

use std::fmt::Display;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::{Value, json};

use crate::core::errors::{FmError, Result};
use crate::report::aggregate::aggregate;
use crate::report::assemble::{DisplayOptions, Report, assemble};
use crate::report::fleet::compute_fleet_stats;
use crate::report::format::{CellFormatter, format_duration};
use crate::store::events::EventSource;

/// Caller input for one report. The lower bound has no default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    /// Only events with `assigned_at >= lower_bound` are reported.
    pub lower_bound: DateTime<Utc>,
    pub display: DisplayOptions,
}

impl ReportQuery {
    pub fn new(lower_bound: DateTime<Utc>) -> Self {
        Self {
            lower_bound,
            display: DisplayOptions::default(),
        }
    }

    #[must_use]
    pub fn with_display(mut self, display: DisplayOptions) -> Self {
        self.display = display;
        self
    }

    /// Parse a lower bound given as RFC 3339 or as a bare `YYYY-MM-DD` date
    /// (that day at 00:00:00 UTC).
    pub fn parse_lower_bound(raw: &str) -> Result<DateTime<Utc>> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(FmError::InvalidQuery {
                details: "empty lower bound".to_string(),
            });
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| FmError::InvalidQuery {
                details: format!("lower bound {raw:?} is neither YYYY-MM-DD nor RFC 3339"),
            })
    }
}

/// Read-only report pipeline over an [`EventSource`].
pub struct ReportEngine<S> {
    source: S,
}

impl<S: EventSource> ReportEngine<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Build the report for `query` from one snapshot of the store.
    pub fn generate(&self, query: &ReportQuery) -> Result<Report> {
        let snapshot = self.source.snapshot(query.lower_bound)?;
        let rows = aggregate(&snapshot.events, &snapshot.assignees);
        let fleet = compute_fleet_stats(&rows);
        Ok(assemble(rows, fleet, query.lower_bound, query.display))
    }
}

/// Render a report as JSON, pairing each raw value with its display string.
///
/// Display timestamps are rendered in `tz`.
pub fn export_json<Tz>(report: &Report, cells: &CellFormatter, tz: &Tz) -> Value
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let rows: Vec<Value> = report
        .rows
        .iter()
        .map(|row| {
            json!({
                "request_id": row.key.request_id,
                "sales_order_id": row.key.sales_order_id,
                "document_number": row.key.document_number,
                "document_type": row.key.document_type.code(),
                "assignee_id": row.key.assignee_id,
                "assignee_name": row.assignee_name,
                "distinct_item_count": row.distinct_item_count,
                "total_quantity": row.total_quantity,
                "total_quantity_requested": row.total_quantity_requested,
                "progress_percent": row.progress_percent.value(),
                "window_start": row.window_start,
                "window_end": row.window_end,
                "elapsed_ms": row.elapsed_ms,
                "display": {
                    "progress": cells.percent(row.progress_percent),
                    "total_quantity": cells.integer(Some(row.total_quantity)),
                    "total_quantity_requested": cells.integer(Some(row.total_quantity_requested)),
                    "window_start": cells.timestamp(Some(&row.window_start.with_timezone(tz))),
                    "window_end": cells.timestamp(Some(&row.window_end.with_timezone(tz))),
                    "elapsed": format_duration(Some(row_elapsed(row.elapsed_ms))),
                },
            })
        })
        .collect();

    json!({
        "window_start": report.window_start,
        "row_count": report.row_count,
        "fleet": {
            "average_elapsed_ms": report.fleet.average_elapsed_ms,
            "average_elapsed": report.fleet.average_elapsed_formatted,
        },
        "display": report.display,
        "rows": rows,
    })
}

#[allow(clippy::cast_precision_loss)]
fn row_elapsed(ms: u64) -> f64 {
    ms as f64
}
