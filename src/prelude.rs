//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use fulfillment_monitor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{FmError, Result};

// Store
pub use crate::store::events::{DocumentType, EventSnapshot, EventSource, FulfillmentEvent};
pub use crate::store::memory::MemoryEventSource;
#[cfg(feature = "sqlite")]
pub use crate::store::sqlite::SqliteEventStore;

// Report
pub use crate::report::aggregate::{GroupKey, ProgressRow, aggregate};
pub use crate::report::assemble::{DisplayOptions, Report, assemble};
pub use crate::report::engine::{ReportEngine, ReportQuery, export_json};
pub use crate::report::fleet::{FleetStatistics, compute_fleet_stats};
pub use crate::report::format::{
    CellFormatter, format_duration, format_int, format_percent, format_timestamp,
};
pub use crate::report::percent::Percent;
