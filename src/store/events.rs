//! Fulfillment line events as recorded by the upstream scan capture system.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::errors::Result;

/// Document type attached to a fulfillment line.
///
/// `B` documents (boletas) carry a `10` prefix on their displayed number;
/// every other code is shown as-is.
///
/// Identity is the stored code: `Other("B")` equals, hashes and orders as
/// `Boleta`, so both land in the same group and get the same prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum DocumentType {
    Boleta,
    Other(String),
}

const BOLETA_CODE: &str = "B";

impl DocumentType {
    /// Parse the stored single-letter code.
    pub fn from_code(code: &str) -> Self {
        if code == BOLETA_CODE {
            Self::Boleta
        } else {
            Self::Other(code.to_string())
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Boleta => BOLETA_CODE,
            Self::Other(code) => code,
        }
    }

    /// Apply the document-number normalization used in the group key.
    pub fn display_number(&self, raw: &str) -> String {
        if self.is_boleta() {
            format!("10{raw}")
        } else {
            raw.to_string()
        }
    }

    pub fn is_boleta(&self) -> bool {
        self.code() == BOLETA_CODE
    }
}

impl PartialEq for DocumentType {
    fn eq(&self, other: &Self) -> bool {
        self.code() == other.code()
    }
}

impl Eq for DocumentType {}

impl Hash for DocumentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
    }
}

impl PartialOrd for DocumentType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentType {
    fn cmp(&self, other: &Self) -> Ordering {
        self.code().cmp(other.code())
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for DocumentType {
    fn from(value: String) -> Self {
        Self::from_code(&value)
    }
}

impl From<DocumentType> for String {
    fn from(value: DocumentType) -> Self {
        value.code().to_string()
    }
}

/// One recorded scan/update for a fulfillment line. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FulfillmentEvent {
    pub request_id: String,
    pub sales_order_id: String,
    /// Raw document number, before the per-type normalization.
    pub document_number: String,
    pub document_type: DocumentType,
    /// SKU identifier (EAN).
    pub item_code: String,
    pub quantity_scanned: f64,
    pub quantity_requested: Option<f64>,
    pub assigned_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub assignee_id: Option<i64>,
}

/// Everything one report needs, read from a single consistent view of the store.
#[derive(Debug, Clone, Default)]
pub struct EventSnapshot {
    pub events: Vec<FulfillmentEvent>,
    /// Display names keyed by assignee id.
    pub assignees: HashMap<i64, String>,
}

/// Read-only source of fulfillment events.
pub trait EventSource {
    /// Every event with `assigned_at >= lower_bound`, plus the names of the
    /// assignees those events reference. Either the whole set or an error.
    fn snapshot(&self, lower_bound: DateTime<Utc>) -> Result<EventSnapshot>;
}

impl<S: EventSource + ?Sized> EventSource for &S {
    fn snapshot(&self, lower_bound: DateTime<Utc>) -> Result<EventSnapshot> {
        (**self).snapshot(lower_bound)
    }
}
