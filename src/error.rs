// ⚠️ Error Types
// Fatal errors abort a run (config) or a snapshot (extraction).
// Row-level DataError is recoverable: the row is dropped and recorded.

use serde::{Deserialize, Serialize};

/// Malformed or incomplete rules document.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("rules document is not valid JSON: {reason}")]
    InvalidJson { reason: String },

    #[error("rules document must be a JSON object")]
    NotAnObject,

    #[error("missing required section `{section}`")]
    MissingSection { section: &'static str },

    #[error("malformed section `{section}`: {reason}")]
    MalformedSection { section: &'static str, reason: String },

    #[error("failed to read rules file {path}: {reason}")]
    Read { path: String, reason: String },
}

/// The header row or a required column could not be located in a snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExtractionError {
    #[error("no row contains the header marker \"{marker}\"")]
    HeaderNotFound { marker: String },

    #[error("header row {row} is past the end of the sheet ({rows} rows)")]
    HeaderOutOfRange { row: usize, rows: usize },

    #[error("required column \"{column}\" not present in header row {row}")]
    MissingColumn { column: String, row: usize },
}

/// Row-level coercion failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum DataError {
    #[error("blank fund name")]
    BlankName,

    #[error("non-numeric value \"{0}\"")]
    NonNumericValue(String),

    #[error("missing value")]
    MissingValue,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    #[error(
        "{snapshot} ledger does not close: total raw {total_raw} != accounted {accounted}"
    )]
    LedgerImbalance {
        snapshot: String,
        total_raw: usize,
        accounted: usize,
    },

    #[error("change for \"{key}\" is out of decimal range (latest {latest}, past {past})")]
    ChangeOverflow {
        key: String,
        latest: String,
        past: String,
    },
}
