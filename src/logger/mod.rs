//! Report run log: JSONL append-only with graceful degradation.

pub mod jsonl;
