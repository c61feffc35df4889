//! Progress aggregator: folds line events into one row per fulfillment group.
//!
//! A group is the `(request, sales order, displayed document number, document
//! type, assignee)` combination. Every event lands in exactly one group, and
//! every numeric edge case (zero quantity, unknown assignee, out-of-order
//! timestamps) is normalized here instead of being raised as an error.

#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::report::percent::Percent;
use crate::store::events::{DocumentType, FulfillmentEvent};

/// Identity of one progress row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey {
    pub request_id: String,
    pub sales_order_id: String,
    /// Normalized document number (see [`DocumentType::display_number`]).
    pub document_number: String,
    pub document_type: DocumentType,
    pub assignee_id: Option<i64>,
}

impl GroupKey {
    pub fn of(event: &FulfillmentEvent) -> Self {
        Self {
            request_id: event.request_id.clone(),
            sales_order_id: event.sales_order_id.clone(),
            document_number: event.document_type.display_number(&event.document_number),
            document_type: event.document_type.clone(),
            assignee_id: event.assignee_id,
        }
    }
}

/// Derived per-group metrics. Recomputed on every report, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressRow {
    #[serde(flatten)]
    pub key: GroupKey,
    pub distinct_item_count: usize,
    pub total_quantity: f64,
    pub total_quantity_requested: f64,
    pub progress_percent: Percent,
    /// Earliest `assigned_at` in the group.
    pub window_start: DateTime<Utc>,
    /// Latest `updated_at` in the group.
    pub window_end: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Empty when the assignee is unknown.
    pub assignee_name: String,
}

#[derive(Debug)]
struct Accumulator {
    items: BTreeSet<String>,
    total_quantity: f64,
    total_quantity_requested: f64,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
}

impl Accumulator {
    fn seed(event: &FulfillmentEvent) -> Self {
        Self {
            items: BTreeSet::new(),
            total_quantity: 0.0,
            total_quantity_requested: 0.0,
            window_start: event.assigned_at,
            window_end: event.updated_at,
        }
    }

    fn absorb(&mut self, event: &FulfillmentEvent) {
        self.items.insert(event.item_code.clone());
        self.total_quantity += event.quantity_scanned;
        self.total_quantity_requested += event.quantity_requested.unwrap_or(0.0);
        self.window_start = self.window_start.min(event.assigned_at);
        self.window_end = self.window_end.max(event.updated_at);
    }

    fn finish(self, key: GroupKey, assignees: &HashMap<i64, String>) -> ProgressRow {
        let assignee_name = key
            .assignee_id
            .and_then(|id| assignees.get(&id))
            .cloned()
            .unwrap_or_default();
        ProgressRow {
            distinct_item_count: self.items.len(),
            total_quantity: self.total_quantity,
            total_quantity_requested: self.total_quantity_requested,
            progress_percent: Percent::ratio(self.total_quantity_requested, self.total_quantity),
            window_start: self.window_start,
            window_end: self.window_end,
            elapsed_ms: elapsed_ms(self.window_start, self.window_end),
            assignee_name,
            key,
        }
    }
}

/// Group `events` and compute one [`ProgressRow`] per distinct group key.
///
/// Rows come back in group-key order; ranking is the assembler's job.
pub fn aggregate(events: &[FulfillmentEvent], assignees: &HashMap<i64, String>) -> Vec<ProgressRow> {
    let mut groups: BTreeMap<GroupKey, Accumulator> = BTreeMap::new();
    for event in events {
        groups
            .entry(GroupKey::of(event))
            .or_insert_with(|| Accumulator::seed(event))
            .absorb(event);
    }

    groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key, assignees))
        .collect()
}

/// Milliseconds from `start` to `end`, clamped at zero when `end` precedes `start`.
#[allow(clippy::cast_sign_loss)]
fn elapsed_ms(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_milliseconds().max(0) as u64
}
