//! Event store accessors: the read-only view of the fulfillment line log.

pub mod events;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;
