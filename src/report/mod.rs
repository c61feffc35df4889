//! Progress reporting: aggregation, fleet statistics, ranking and formatting.

pub mod aggregate;
pub mod assemble;
pub mod engine;
pub mod fleet;
pub mod format;
pub mod percent;
