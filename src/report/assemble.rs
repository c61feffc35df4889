//! Report assembler: ranks rows and packages the final report.

#![allow(missing_docs)]

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::report::aggregate::ProgressRow;
use crate::report::fleet::FleetStatistics;

/// Presentation hints passed through untouched; never read by the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayOptions {
    /// "Sample mode" flag from the caller.
    pub sample_mode: bool,
    /// Font size hint in px.
    pub font_size: u32,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            sample_mode: false,
            font_size: 18,
        }
    }
}

/// The engine's output for one report request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub rows: Vec<ProgressRow>,
    pub row_count: usize,
    pub fleet: FleetStatistics,
    /// The query's lower time bound.
    pub window_start: DateTime<Utc>,
    pub display: DisplayOptions,
}

/// Ranking policy: progress ascending with undefined progress first, then
/// request id ascending (lexical), then the rest of the group key so the
/// order is total.
pub fn rank(a: &ProgressRow, b: &ProgressRow) -> Ordering {
    a.progress_percent
        .rank_cmp(b.progress_percent)
        .then_with(|| a.key.request_id.cmp(&b.key.request_id))
        .then_with(|| a.key.cmp(&b.key))
}

/// Order `rows` and bundle them with the fleet statistics. No filtering.
pub fn assemble(
    mut rows: Vec<ProgressRow>,
    fleet: FleetStatistics,
    window_start: DateTime<Utc>,
    display: DisplayOptions,
) -> Report {
    let row_count = rows.len();
    rows.sort_by(rank);
    Report {
        rows,
        row_count,
        fleet,
        window_start,
        display,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::TimeZone;

    use super::*;
    use crate::report::aggregate::aggregate;
    use crate::report::fleet::compute_fleet_stats;
    use crate::report::percent::Percent;
    use crate::store::events::{DocumentType, FulfillmentEvent};

    fn ev(request: &str, scanned: f64, requested: f64) -> FulfillmentEvent {
        let t = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        FulfillmentEvent {
            request_id: request.to_string(),
            sales_order_id: "SO".to_string(),
            document_number: "1".to_string(),
            document_type: DocumentType::Other("F".to_string()),
            item_code: "EAN".to_string(),
            quantity_scanned: scanned,
            quantity_requested: Some(requested),
            assigned_at: t,
            updated_at: t,
            assignee_id: None,
        }
    }

    fn build(events: &[FulfillmentEvent]) -> Report {
        let rows = aggregate(events, &HashMap::new());
        let fleet = compute_fleet_stats(&rows);
        assemble(
            rows,
            fleet,
            Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap(),
            DisplayOptions::default(),
        )
    }

    fn order(report: &Report) -> Vec<&str> {
        report
            .rows
            .iter()
            .map(|r| r.key.request_id.as_str())
            .collect()
    }

    #[test]
    fn orders_by_progress_then_request() {
        let report = build(&[
            ev("R3", 10.0, 9.0),
            ev("R1", 10.0, 9.0),
            ev("R2", 10.0, 1.0),
        ]);
        assert_eq!(order(&report), vec!["R2", "R1", "R3"]);
    }

    #[test]
    fn undefined_progress_sorts_first() {
        let report = build(&[ev("A", 10.0, 0.0), ev("Z", 0.0, 0.0), ev("M", 0.0, 4.0)]);
        assert_eq!(order(&report), vec!["M", "Z", "A"]);
        assert!(report.rows[0].progress_percent.is_undefined());
        assert!(report.rows[1].progress_percent.is_undefined());
        assert_eq!(report.rows[2].progress_percent, Percent::Known(0.0));
    }

    #[test]
    fn request_tie_break_is_lexical() {
        let report = build(&[ev("10", 1.0, 1.0), ev("9", 1.0, 1.0), ev("100", 1.0, 1.0)]);
        assert_eq!(order(&report), vec!["10", "100", "9"]);
    }

    #[test]
    fn row_count_and_display_are_carried() {
        let rows = aggregate(&[ev("R1", 1.0, 1.0), ev("R2", 1.0, 0.5)], &HashMap::new());
        let display = DisplayOptions {
            sample_mode: true,
            font_size: 24,
        };
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let report = assemble(rows, FleetStatistics::default(), start, display);
        assert_eq!(report.row_count, 2);
        assert_eq!(report.display, display);
        assert_eq!(report.window_start, start);
    }
}
