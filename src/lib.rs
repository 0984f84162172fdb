// NAV Reconcile - Core Library
// Exposes the reconciliation engine for the CLI and tests

pub mod error;
pub mod rules;          // Rule store + validation
pub mod normalize;      // Name normalization, base identity
pub mod exclusion;      // Keyword exclusion filter
pub mod classify;       // Fund type classifier
pub mod model;          // Raw / fund / exclusion records
pub mod variants;       // Variant resolver
pub mod snapshot;       // Per-snapshot processing
pub mod reconciliation; // Outer join + ledgers
pub mod parser;         // Sheet extraction (CSV / XLSX)
pub mod pipeline;       // Parallel snapshot run -> reconcile
pub mod report;         // Result workbook + run summary

// Re-export commonly used types
pub use error::{ConfigError, DataError, ExtractionError, ReconcileError};
pub use rules::{
    ConfigWarning, LoadedRules, RuleConfig, RuleStore, TypeCategory, ValidationReport, validate,
};
pub use normalize::{base_identity, cleanse_dashes, normalize};
pub use exclusion::{ExclusionFilter, ExclusionReason, Verdict};
pub use classify::{FundType, TypeClassifier};
pub use model::{ExclusionEntry, FundRecord, RawRecord, RawValue, SkippedRow};
pub use variants::{GroupTrace, Resolution, VariantResolver};
pub use snapshot::{SnapshotProcessor, SnapshotResult};
pub use reconciliation::{
    ComparisonRow, LedgerCategory, NotComparableEntry, Reconciler, Reconciliation,
    ReconciliationLedger, Side, ZeroNavEntry,
};
pub use parser::{
    Cell, CsvSource, ExtractionSettings, Grid, MergedRegion, SheetSource, XlsxSource,
    detect_source, extract, load_snapshot,
};
pub use pipeline::Pipeline;
pub use report::{RunSummary, ledger_table, write_workbook};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
