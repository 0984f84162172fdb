// ⚖️ Reconciliation Engine - Join two snapshots and account for every record
//
// Following the formula, per snapshot:
//   total_raw = included + excluded_by_rule + excluded_variant
//             + excluded_zero_nav + excluded_not_comparable
//
// A ledger that does not close is an error, never a warning.

use crate::classify::FundType;
use crate::error::ReconcileError;
use crate::model::FundRecord;
use crate::snapshot::SnapshotResult;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

// ============================================================================
// SIDES & ROWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Latest,
    Past,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Latest => write!(f, "Latest"),
            Side::Past => write!(f, "Past"),
        }
    }
}

/// A key present on both sides with non-zero NAVs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub key: String,
    pub name: String,
    pub fund_type: FundType,
    pub latest_nav: Decimal,
    pub past_nav: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
}

/// A matched pair where either NAV is zero. No change is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZeroNavEntry {
    pub key: String,
    pub name: String,
    pub latest_nav: Decimal,
    pub past_nav: Decimal,
}

/// A canonical record whose key has no counterpart on the other side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotComparableEntry {
    #[serde(flatten)]
    pub record: FundRecord,
    pub missing_from: Side,
}

impl NotComparableEntry {
    pub fn reason(&self) -> String {
        format!("missing from {}", self.missing_from.to_string().to_lowercase())
    }
}

// ============================================================================
// RECONCILIATION LEDGER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerCategory {
    TotalRaw,
    IncludedInComparison,
    ExcludedByRule,
    ExcludedVariant,
    ExcludedZeroNav,
    ExcludedNotComparable,
}

impl LedgerCategory {
    pub fn label(&self) -> &'static str {
        match self {
            LedgerCategory::TotalRaw => "Total Raw",
            LedgerCategory::IncludedInComparison => "Included in Comparison",
            LedgerCategory::ExcludedByRule => "Excluded by Rule",
            LedgerCategory::ExcludedVariant => "Excluded Variant",
            LedgerCategory::ExcludedZeroNav => "Excluded Zero NAV",
            LedgerCategory::ExcludedNotComparable => "Excluded Not Comparable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationLedger {
    pub snapshot: Side,
    pub total_raw: usize,
    pub included_in_comparison: usize,
    pub excluded_by_rule: usize,
    pub excluded_variant: usize,
    pub excluded_zero_nav: usize,
    pub excluded_not_comparable: usize,
}

impl ReconciliationLedger {
    /// Sum of every outcome bucket.
    pub fn accounted(&self) -> usize {
        self.included_in_comparison
            + self.excluded_by_rule
            + self.excluded_variant
            + self.excluded_zero_nav
            + self.excluded_not_comparable
    }

    pub fn closes(&self) -> bool {
        self.total_raw == self.accounted()
    }

    pub fn verify(&self) -> Result<(), ReconcileError> {
        if self.closes() {
            Ok(())
        } else {
            Err(ReconcileError::LedgerImbalance {
                snapshot: self.snapshot.to_string(),
                total_raw: self.total_raw,
                accounted: self.accounted(),
            })
        }
    }

    /// Counters in reporting order.
    pub fn rows(&self) -> Vec<(LedgerCategory, usize)> {
        vec![
            (LedgerCategory::TotalRaw, self.total_raw),
            (LedgerCategory::IncludedInComparison, self.included_in_comparison),
            (LedgerCategory::ExcludedByRule, self.excluded_by_rule),
            (LedgerCategory::ExcludedVariant, self.excluded_variant),
            (LedgerCategory::ExcludedZeroNav, self.excluded_zero_nav),
            (LedgerCategory::ExcludedNotComparable, self.excluded_not_comparable),
        ]
    }
}

// ============================================================================
// RECONCILIATION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Ordered by key
    pub comparison: Vec<ComparisonRow>,
    pub zero_nav: Vec<ZeroNavEntry>,
    pub not_comparable_latest: Vec<NotComparableEntry>,
    pub not_comparable_past: Vec<NotComparableEntry>,
    pub latest_ledger: ReconciliationLedger,
    pub past_ledger: ReconciliationLedger,
    pub latest: SnapshotResult,
    pub past: SnapshotResult,
}

impl Reconciliation {
    pub fn ledgers(&self) -> [&ReconciliationLedger; 2] {
        [&self.latest_ledger, &self.past_ledger]
    }

    pub fn summary(&self) -> String {
        format!(
            "Reconciliation: {} compared, {} zero NAV, {} latest-only, {} past-only (latest raw {}, past raw {})",
            self.comparison.len(),
            self.zero_nav.len(),
            self.not_comparable_latest.len(),
            self.not_comparable_past.len(),
            self.latest_ledger.total_raw,
            self.past_ledger.total_raw
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler;

impl Reconciler {
    pub fn new() -> Self {
        Reconciler
    }

    /// Outer-join the two snapshots by key and build both ledgers.
    pub fn reconcile(
        &self,
        latest: SnapshotResult,
        past: SnapshotResult,
    ) -> Result<Reconciliation, ReconcileError> {
        let mut joined: BTreeMap<&str, (Option<&FundRecord>, Option<&FundRecord>)> =
            BTreeMap::new();
        for record in &latest.records {
            joined.entry(record.key.as_str()).or_default().0 = Some(record);
        }
        for record in &past.records {
            joined.entry(record.key.as_str()).or_default().1 = Some(record);
        }

        let mut comparison = Vec::new();
        let mut zero_nav = Vec::new();
        let mut not_comparable_latest = Vec::new();
        let mut not_comparable_past = Vec::new();

        for (key, pair) in joined {
            match pair {
                (Some(l), Some(p)) => {
                    if l.nav.is_zero() || p.nav.is_zero() {
                        zero_nav.push(ZeroNavEntry {
                            key: key.to_string(),
                            name: l.name.clone(),
                            latest_nav: l.nav,
                            past_nav: p.nav,
                        });
                    } else {
                        comparison.push(Self::compare(key, l, p)?);
                    }
                }
                (Some(l), None) => not_comparable_latest.push(NotComparableEntry {
                    record: l.clone(),
                    missing_from: Side::Past,
                }),
                (None, Some(p)) => not_comparable_past.push(NotComparableEntry {
                    record: p.clone(),
                    missing_from: Side::Latest,
                }),
                (None, None) => {}
            }
        }

        let latest_ledger = Self::ledger(
            Side::Latest,
            &latest,
            comparison.len(),
            zero_nav.len(),
            not_comparable_latest.len(),
        );
        let past_ledger = Self::ledger(
            Side::Past,
            &past,
            comparison.len(),
            zero_nav.len(),
            not_comparable_past.len(),
        );
        latest_ledger.verify()?;
        past_ledger.verify()?;

        let reconciliation = Reconciliation {
            comparison,
            zero_nav,
            not_comparable_latest,
            not_comparable_past,
            latest_ledger,
            past_ledger,
            latest,
            past,
        };
        info!("{}", reconciliation.summary());

        Ok(reconciliation)
    }

    /// Change metrics for a pair whose past NAV is known to be non-zero.
    fn compare(
        key: &str,
        latest: &FundRecord,
        past: &FundRecord,
    ) -> Result<ComparisonRow, ReconcileError> {
        let overflow = || ReconcileError::ChangeOverflow {
            key: key.to_string(),
            latest: latest.nav.to_string(),
            past: past.nav.to_string(),
        };
        let change = latest.nav.checked_sub(past.nav).ok_or_else(overflow)?;
        let change_percent = change
            .checked_div(past.nav)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(overflow)?
            .round_dp(2);

        Ok(ComparisonRow {
            key: key.to_string(),
            name: latest.name.clone(),
            fund_type: latest.fund_type.clone(),
            latest_nav: latest.nav,
            past_nav: past.nav,
            change,
            change_percent,
        })
    }

    fn ledger(
        side: Side,
        snapshot: &SnapshotResult,
        included: usize,
        zero_nav: usize,
        not_comparable: usize,
    ) -> ReconciliationLedger {
        ReconciliationLedger {
            snapshot: side,
            total_raw: snapshot.total_raw,
            included_in_comparison: included,
            excluded_by_rule: snapshot.excluded_by_rule(),
            excluded_variant: snapshot.excluded_variant(),
            excluded_zero_nav: zero_nav,
            excluded_not_comparable: not_comparable,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
