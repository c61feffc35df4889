//! Fleet-wide completion statistics across all progress rows of a report.

#![allow(missing_docs)]

use serde::Serialize;

use crate::report::aggregate::ProgressRow;
use crate::report::format::format_duration;

/// Average completion time over every row in one report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetStatistics {
    /// Mean `elapsed_ms`; 0 for an empty report.
    pub average_elapsed_ms: f64,
    /// Same value as `HH:MM:SS`, hours unbounded.
    pub average_elapsed_formatted: String,
}

impl Default for FleetStatistics {
    fn default() -> Self {
        Self::from_average(0.0)
    }
}

impl FleetStatistics {
    fn from_average(average_elapsed_ms: f64) -> Self {
        Self {
            average_elapsed_ms,
            average_elapsed_formatted: format_duration(Some(average_elapsed_ms)),
        }
    }
}

/// Reduce all rows into a single [`FleetStatistics`].
#[allow(clippy::cast_precision_loss)]
pub fn compute_fleet_stats(rows: &[ProgressRow]) -> FleetStatistics {
    if rows.is_empty() {
        return FleetStatistics::default();
    }
    let total: f64 = rows.iter().map(|r| r.elapsed_ms as f64).sum();
    FleetStatistics::from_average(total / rows.len() as f64)
}
