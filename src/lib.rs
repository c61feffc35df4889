#![forbid(unsafe_code)]

//! Fulfillment monitor (fmon): pick/pack progress reporting over a warehouse
//! scan log.
//!
//! One report is built in four steps:
//! 1. **Event store**: a consistent snapshot of line-level scan events
//! 2. **Aggregation**: one progress row per request/document/assignee
//! 3. **Fleet statistics**: average completion time across all rows
//! 4. **Assembly**: rows ordered least-complete first
//!
//! # Library usage
//!
//! ```rust,no_run
//! use fulfillment_monitor::prelude::*;
//!
//! # fn demo() -> fulfillment_monitor::core::errors::Result<()> {
//! let store = SqliteEventStore::open_read_only(std::path::Path::new("fulfillment.sqlite3"))?;
//! let query = ReportQuery::new(ReportQuery::parse_lower_bound("2026-03-02")?);
//! let report = ReportEngine::new(&store).generate(&query)?;
//! println!("{} rows, average {}", report.row_count, report.fleet.average_elapsed_formatted);
//! # Ok(())
//! # }
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod report;
pub mod store;
