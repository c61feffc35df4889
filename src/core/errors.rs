//! FM-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, FmError>;

/// Top-level error type for the fulfillment monitor.
#[derive(Debug, Error)]
pub enum FmError {
    #[error("[FM-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[FM-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[FM-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[FM-1101] invalid report query: {details}")]
    InvalidQuery { details: String },

    #[error("[FM-2001] event store unavailable at {path}: {details}")]
    StoreUnavailable { path: PathBuf, details: String },

    #[error("[FM-2002] SQL failure in {context}: {details}")]
    Sql {
        context: &'static str,
        details: String,
    },

    #[error("[FM-2003] malformed event row {row_id} ({column}): {details}")]
    MalformedRow {
        row_id: i64,
        column: &'static str,
        details: String,
    },

    #[error("[FM-2004] event store read cancelled")]
    Cancelled,

    #[error("[FM-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[FM-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FmError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "FM-1001",
            Self::MissingConfig { .. } => "FM-1002",
            Self::ConfigParse { .. } => "FM-1003",
            Self::InvalidQuery { .. } => "FM-1101",
            Self::StoreUnavailable { .. } => "FM-2001",
            Self::Sql { .. } => "FM-2002",
            Self::MalformedRow { .. } => "FM-2003",
            Self::Cancelled => "FM-2004",
            Self::Serialization { .. } => "FM-2101",
            Self::Io { .. } => "FM-3002",
        }
    }

    /// Whether the failure came from the event store.
    ///
    /// Any of these aborts the whole report; no partial rows are rendered.
    #[must_use]
    pub const fn is_data_source(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::Sql { .. }
                | Self::MalformedRow { .. }
                | Self::Cancelled
        )
    }

    /// Whether retrying (by whoever owns the connection) might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. } | Self::Sql { .. } | Self::Io { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for FmError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ffi, _) = &value
            && ffi.code == rusqlite::ErrorCode::OperationInterrupted
        {
            return Self::Cancelled;
        }
        Self::Sql {
            context: "rusqlite",
            details: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for FmError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for FmError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
