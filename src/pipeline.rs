// 🔁 Pipeline
// Both snapshots are processed independently (in parallel) against the same
// read-only rules; the reconciler is the only point where they meet.

use crate::model::RawRecord;
use crate::parser::{load_snapshot, ExtractionSettings};
use crate::reconciliation::{Reconciler, Reconciliation};
use crate::rules::RuleConfig;
use crate::snapshot::SnapshotProcessor;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;

pub const LATEST_LABEL: &str = "Latest";
pub const PAST_LABEL: &str = "Past";

pub struct Pipeline<'a> {
    config: &'a RuleConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a RuleConfig) -> Self {
        Pipeline { config }
    }

    /// Process both snapshots and reconcile them.
    pub fn run(&self, latest: Vec<RawRecord>, past: Vec<RawRecord>) -> Result<Reconciliation> {
        let processor = SnapshotProcessor::new(self.config);
        let (latest, past) = rayon::join(
            || processor.process(LATEST_LABEL, latest),
            || processor.process(PAST_LABEL, past),
        );

        let reconciliation = Reconciler::new().reconcile(latest, past)?;
        Ok(reconciliation)
    }

    /// Extract both documents, then run. An extraction failure on either side
    /// stops the run before any processing.
    pub fn run_files(
        &self,
        latest_path: &Path,
        past_path: &Path,
        sheet: Option<String>,
        settings: &ExtractionSettings,
    ) -> Result<Reconciliation> {
        let (latest, past) = rayon::join(
            || load_snapshot(latest_path, sheet.clone(), settings),
            || load_snapshot(past_path, sheet.clone(), settings),
        );
        let latest = latest.with_context(|| format!("{} snapshot", LATEST_LABEL))?;
        let past = past.with_context(|| format!("{} snapshot", PAST_LABEL))?;

        info!(
            latest_rows = latest.len(),
            past_rows = past.len(),
            "extracted both snapshots"
        );

        self.run(latest, past)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawValue;
    use crate::rules::RuleStore;
    use proptest::prelude::*;
    use serde_json::json;

    fn create_test_config() -> RuleConfig {
        let doc = json!({
            "exclusionKeywords": ["BONUS"],
            "baseSchemeStripTerms": ["DIRECT PLAN", "REGULAR PLAN", "GROWTH", "IDCW"],
            "typeKeywords": { "Equity": ["EQUITY"] },
            "variantPriorityLadder": [["REGULAR PLAN", "GROWTH"], ["GROWTH"]]
        });
        RuleStore::load(&doc.to_string()).unwrap().config
    }

    fn raw(records: &[(&str, f64)]) -> Vec<RawRecord> {
        records
            .iter()
            .enumerate()
            .map(|(i, (name, nav))| RawRecord::new(*name, RawValue::Number(*nav), i))
            .collect()
    }

    #[test]
    fn test_run_closes_both_ledgers() {
        let config = create_test_config();
        let latest = raw(&[
            ("AAA Equity Fund Regular Plan Growth", 11.0),
            ("AAA Equity Fund Direct Plan Growth", 12.0),
            ("BBB Fund Bonus", 3.0),
            ("CCC Fund", 0.0),
            ("DDD Fund", 4.0),
        ]);
        let past = raw(&[
            ("AAA Equity Fund Regular Plan Growth", 10.0),
            ("CCC Fund", 2.0),
            ("EEE Fund", 1.0),
        ]);

        let rec = Pipeline::new(&config).run(latest, past).unwrap();

        assert_eq!(rec.comparison.len(), 1);
        assert_eq!(rec.latest_ledger.total_raw, 5);
        assert_eq!(rec.latest_ledger.excluded_by_rule, 1);
        assert_eq!(rec.latest_ledger.excluded_variant, 1);
        assert_eq!(rec.latest_ledger.excluded_zero_nav, 1);
        assert_eq!(rec.latest_ledger.excluded_not_comparable, 1);
        assert_eq!(rec.past_ledger.excluded_not_comparable, 1);
        assert!(rec.ledgers().iter().all(|l| l.closes()));
    }

    fn fund_names() -> impl Strategy<Value = Vec<(String, u8)>> {
        let name = prop::sample::select(vec![
            "AAA Fund Regular Plan Growth",
            "AAA Fund Direct Plan Growth",
            "AAA Fund Regular Plan IDCW",
            "BBB Equity Fund Growth",
            "BBB Equity Fund Bonus",
            "CCC Fund",
            "DDD Fund - Direct Plan",
            "  ",
        ]);
        prop::collection::vec((name.prop_map(str::to_string), 0u8..4), 0..12)
    }

    proptest! {
        #[test]
        fn ledgers_always_close(latest in fund_names(), past in fund_names()) {
            let config = create_test_config();
            let to_raw = |rows: &[(String, u8)]| -> Vec<RawRecord> {
                rows.iter()
                    .enumerate()
                    .map(|(i, (name, nav))| RawRecord::new(name.clone(), RawValue::Number(*nav as f64), i))
                    .collect()
            };

            let rec = Pipeline::new(&config).run(to_raw(&latest), to_raw(&past)).unwrap();

            prop_assert!(rec.latest_ledger.closes());
            prop_assert!(rec.past_ledger.closes());
            prop_assert!(rec.comparison.iter().all(|r| !r.past_nav.is_zero() && !r.latest_nav.is_zero()));

            let mut keys: Vec<&str> = rec.comparison.iter().map(|r| r.key.as_str()).collect();
            let before = keys.len();
            keys.dedup();
            prop_assert_eq!(before, keys.len());
        }
    }
}
