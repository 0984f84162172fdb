// 📸 Snapshot Processor
// One snapshot's pass: coerce → exclude → derive key/base/type → resolve variants.
//
// Every coerced row ends up either in `records` or in `exclusions`;
// rows that fail coercion are only kept in `skipped` and never reach TotalRaw.

use crate::classify::TypeClassifier;
use crate::exclusion::{ExclusionFilter, Verdict};
use crate::model::{ExclusionEntry, FundRecord, RawRecord, SkippedRow};
use crate::normalize::{base_identity, normalize};
use crate::rules::RuleConfig;
use crate::variants::{GroupTrace, VariantResolver};
use crate::error::DataError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

// ============================================================================
// SNAPSHOT RESULT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResult {
    pub label: String,
    /// Canonical records, one per base identity
    pub records: Vec<FundRecord>,
    /// Rule exclusions in row order, then variant exclusions
    pub exclusions: Vec<ExclusionEntry>,
    pub total_raw: usize,
    pub skipped: Vec<SkippedRow>,
    pub trace: Vec<GroupTrace>,
}

impl SnapshotResult {
    pub fn excluded_by_rule(&self) -> usize {
        self.exclusions.iter().filter(|e| !e.is_variant()).count()
    }

    pub fn excluded_variant(&self) -> usize {
        self.exclusions.iter().filter(|e| e.is_variant()).count()
    }
}

// ============================================================================
// SNAPSHOT PROCESSOR
// ============================================================================

pub struct SnapshotProcessor<'a> {
    config: &'a RuleConfig,
    exclusion: ExclusionFilter,
    classifier: TypeClassifier,
    resolver: VariantResolver,
}

impl<'a> SnapshotProcessor<'a> {
    pub fn new(config: &'a RuleConfig) -> Self {
        SnapshotProcessor {
            config,
            exclusion: ExclusionFilter::new(config),
            classifier: TypeClassifier::new(config),
            resolver: VariantResolver::new(config),
        }
    }

    /// Process raw records in source order.
    pub fn process(&self, label: &str, raw: Vec<RawRecord>) -> SnapshotResult {
        let mut skipped = Vec::new();
        let mut rule_exclusions = Vec::new();
        let mut candidates = Vec::new();
        let mut total_raw = 0;

        for row in raw {
            let record = match self.derive(&row) {
                Ok(record) => record,
                Err(error) => {
                    debug!(snapshot = label, row = row.source_row_index, %error, "skipping row");
                    skipped.push(SkippedRow {
                        source_row_index: row.source_row_index,
                        error,
                    });
                    continue;
                }
            };
            total_raw += 1;

            match self.exclusion.classify(&record.name) {
                Verdict::Exclude(reason) => rule_exclusions.push(ExclusionEntry::new(record, reason)),
                Verdict::Keep => candidates.push(record),
            }
        }

        let resolution = self.resolver.resolve(candidates);

        let mut exclusions = rule_exclusions;
        exclusions.extend(resolution.excluded);

        let result = SnapshotResult {
            label: label.to_string(),
            records: resolution.canonical,
            exclusions,
            total_raw,
            skipped,
            trace: resolution.trace,
        };

        info!(
            snapshot = label,
            total_raw = result.total_raw,
            canonical = result.records.len(),
            excluded_by_rule = result.excluded_by_rule(),
            excluded_variant = result.excluded_variant(),
            skipped = result.skipped.len(),
            "processed snapshot"
        );

        result
    }

    /// Coerce one raw row into a fund record.
    fn derive(&self, row: &RawRecord) -> Result<FundRecord, DataError> {
        let name = row.name.trim();
        if name.is_empty() {
            return Err(DataError::BlankName);
        }
        let nav = row.value.to_decimal()?;

        Ok(FundRecord {
            name: name.to_string(),
            key: normalize(name),
            base_identity: base_identity(name, self.config.base_scheme_strip_terms()),
            nav,
            fund_type: self.classifier.classify(name),
            original_row_index: row.source_row_index,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
