//! Display formatters handed to the presentation layer.
//!
//! Locale policy (es-CL grouping, day-first dates) lives only here so the
//! aggregation core stays locale-agnostic.

use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use crate::report::percent::Percent;

/// Default text for undefined numeric values.
pub const PLACEHOLDER: &str = "-";

/// Rendering of an absent duration.
pub const ZERO_DURATION: &str = "00:00:00";

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Formatter carrying the placeholder text for undefined cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFormatter {
    placeholder: String,
}

impl Default for CellFormatter {
    fn default() -> Self {
        Self::new(PLACEHOLDER)
    }
}

impl CellFormatter {
    /// Formatter that renders undefined values as `placeholder`.
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
        }
    }

    /// `50.0%`, or the placeholder when undefined.
    pub fn percent(&self, value: Percent) -> String {
        match value.value() {
            Some(v) if v.is_finite() => format!("{v:.1}%"),
            _ => self.placeholder.clone(),
        }
    }

    /// Rounded, es-CL grouped integer (`12.345`), or the placeholder.
    pub fn integer(&self, value: Option<f64>) -> String {
        match value {
            Some(v) if v.is_finite() => group_es_cl(v.round()),
            _ => self.placeholder.clone(),
        }
    }

    /// `DD/MM/YYYY HH:MM:SS` in the timestamp's own zone, or the placeholder.
    pub fn timestamp<Tz>(&self, value: Option<&DateTime<Tz>>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        value.map_or_else(
            || self.placeholder.clone(),
            |ts| ts.format(TIMESTAMP_FORMAT).to_string(),
        )
    }
}

/// Percent cell with the default placeholder.
pub fn format_percent(value: Percent) -> String {
    CellFormatter::default().percent(value)
}

/// Integer cell with the default placeholder.
pub fn format_int(value: Option<f64>) -> String {
    CellFormatter::default().integer(value)
}

/// Timestamp cell with the default placeholder.
pub fn format_timestamp<Tz>(value: Option<&DateTime<Tz>>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    CellFormatter::default().timestamp(value)
}

/// Zero-padded `HH:MM:SS` with unbounded hours, floored to whole seconds.
///
/// Missing, non-finite and non-positive inputs all render as `00:00:00`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_duration(ms: Option<f64>) -> String {
    let Some(ms) = ms.filter(|v| v.is_finite() && *v > 0.0) else {
        return ZERO_DURATION.to_string();
    };
    let secs = (ms / 1000.0).floor() as u64;
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// es-CL grouping: `.` thousands separator, applied from five integer digits up.
fn group_es_cl(rounded: f64) -> String {
    let digits = format!("{:.0}", rounded.abs());
    let negative = rounded < 0.0 && digits != "0";

    let grouped = if digits.len() < 5 {
        digits
    } else {
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push('.');
            }
            out.push(ch);
        }
        out
    };

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}
