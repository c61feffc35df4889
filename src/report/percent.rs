//! Progress ratio that can be undefined.

use std::cmp::Ordering;

use serde::{Serialize, Serializer};

/// Progress percentage of a group.
///
/// `Undefined` replaces a NaN/placeholder when the denominator is zero, so it
/// can never leak into arithmetic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percent {
    /// Ratio scaled to 0..=100 (may exceed 100).
    Known(f64),
    /// Nothing scanned yet; rendered as the placeholder.
    Undefined,
}

impl Percent {
    /// `numerator / denominator * 100`, undefined when the result would not be finite.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return Self::Undefined;
        }
        let value = numerator / denominator * 100.0;
        if value.is_finite() {
            Self::Known(value)
        } else {
            Self::Undefined
        }
    }

    /// The percentage, or `None` when undefined.
    pub const fn value(self) -> Option<f64> {
        match self {
            Self::Known(v) => Some(v),
            Self::Undefined => None,
        }
    }

    /// Whether progress has no defined value.
    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Total order used for report ranking: `Undefined` is below every known value.
    pub fn rank_cmp(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Undefined, Self::Undefined) => Ordering::Equal,
            (Self::Undefined, Self::Known(_)) => Ordering::Less,
            (Self::Known(_), Self::Undefined) => Ordering::Greater,
            (Self::Known(a), Self::Known(b)) => a.total_cmp(&b),
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}
