// End-to-end reconciliation scenarios through the public API.

use nav_reconcile::{
    ExclusionReason, Pipeline, RawRecord, RawValue, RuleConfig, RuleStore, ExtractionSettings,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::io::Write;
use std::str::FromStr;

fn create_test_config() -> RuleConfig {
    let doc = json!({
        "exclusionKeywords": ["BONUS", "SEGREGATED"],
        "baseSchemeStripTerms": ["DIRECT PLAN", "REGULAR PLAN", "GROWTH", "IDCW"],
        "typeKeywords": {
            "Equity": ["EQUITY", "FLEXI CAP"],
            "Debt": ["LIQUID", "GILT"]
        },
        "variantPriorityLadder": [["REGULAR PLAN", "GROWTH"], ["DIRECT PLAN", "GROWTH"], ["GROWTH"]]
    });
    RuleStore::load(&doc.to_string()).unwrap().config
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn raw(records: &[(&str, f64)]) -> Vec<RawRecord> {
    records
        .iter()
        .enumerate()
        .map(|(i, (name, nav))| RawRecord::new(*name, RawValue::Number(*nav), i))
        .collect()
}

#[test]
fn scenario_matching_key_produces_change() {
    let config = create_test_config();
    let rec = Pipeline::new(&config)
        .run(
            raw(&[("ABC Fund - Direct Plan - Growth", 10.50)]),
            raw(&[("ABC Fund - Direct Plan - Growth", 10.00)]),
        )
        .unwrap();

    assert_eq!(rec.comparison.len(), 1);
    let row = &rec.comparison[0];
    assert_eq!(row.change, dec("0.50"));
    assert_eq!(row.change_percent, dec("5.0"));
    assert_eq!(rec.latest_ledger.included_in_comparison, 1);
    assert_eq!(rec.past_ledger.included_in_comparison, 1);
}

#[test]
fn scenario_variant_group_keeps_preferred() {
    let config = create_test_config();
    let rec = Pipeline::new(&config)
        .run(
            raw(&[
                ("XYZ Fund Regular Plan Growth", 20.0),
                ("XYZ Fund Direct Plan Growth", 25.0),
            ]),
            raw(&[("XYZ Fund Regular Plan Growth", 19.0)]),
        )
        .unwrap();

    assert_eq!(rec.latest.records.len(), 1);
    assert_eq!(rec.latest.records[0].name, "XYZ Fund Regular Plan Growth");
    assert_eq!(rec.latest.records[0].nav, dec("20"));

    assert_eq!(rec.latest.exclusions.len(), 1);
    let excluded = &rec.latest.exclusions[0];
    assert_eq!(excluded.record.name, "XYZ Fund Direct Plan Growth");
    assert_eq!(excluded.reason, ExclusionReason::NonPreferredVariant);
    assert_eq!(excluded.reason.to_string(), "non-preferred variant");

    assert_eq!(rec.latest.trace.len(), 1);
    assert_eq!(rec.latest.trace[0].base_identity, "XYZ FUND");
    assert_eq!(rec.latest.trace[0].matched_rung, Some(0));
    assert_eq!(rec.latest_ledger.excluded_variant, 1);
    assert_eq!(rec.comparison.len(), 1);
}

#[test]
fn scenario_rule_exclusion_skips_variant_resolution() {
    let config = create_test_config();
    let rec = Pipeline::new(&config)
        .run(
            raw(&[("ABC Fund - Bonus", 5.0), ("ABC Fund - Growth", 6.0)]),
            raw(&[("ABC Fund - Growth", 5.0)]),
        )
        .unwrap();

    let excluded = &rec.latest.exclusions[0];
    assert_eq!(excluded.record.name, "ABC Fund - Bonus");
    assert_eq!(excluded.reason.to_string(), "contains BONUS");
    assert_eq!(rec.latest_ledger.excluded_by_rule, 1);
    assert_eq!(rec.latest_ledger.excluded_variant, 0);
    assert!(rec.latest.trace.is_empty());
}

#[test]
fn scenario_latest_only_is_not_comparable() {
    let config = create_test_config();
    let rec = Pipeline::new(&config)
        .run(raw(&[("New Flexi Cap Fund", 15.0)]), Vec::new())
        .unwrap();

    assert_eq!(rec.latest_ledger.total_raw, 1);
    assert_eq!(rec.latest_ledger.included_in_comparison, 0);
    assert_eq!(rec.latest_ledger.excluded_not_comparable, 1);
    assert_eq!(rec.not_comparable_latest[0].reason(), "missing from past");
    assert_eq!(rec.not_comparable_latest[0].record.fund_type.label(), "Equity");
    assert_eq!(rec.past_ledger.total_raw, 0);
    assert!(rec.past_ledger.closes());
}

#[test]
fn scenario_zero_past_nav_is_guarded() {
    let config = create_test_config();
    let rec = Pipeline::new(&config)
        .run(raw(&[("Gilt Fund", 12.0)]), raw(&[("Gilt Fund", 0.0)]))
        .unwrap();

    assert!(rec.comparison.is_empty());
    assert_eq!(rec.zero_nav.len(), 1);
    assert_eq!(rec.zero_nav[0].past_nav, Decimal::ZERO);
    assert_eq!(rec.latest_ledger.excluded_zero_nav, 1);
    assert_eq!(rec.past_ledger.excluded_zero_nav, 1);
}

#[test]
fn scenario_csv_documents_end_to_end() {
    let config = create_test_config();
    let write = |rows: &[&str]| {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file.flush().unwrap();
        file
    };

    let latest = write(&[
        "NAV Name,",
        "NAV Name,Net Asset Value",
        "Liquid Fund Growth,1050.30",
        "Liquid Fund IDCW,1001",
        "Equity Fund Bonus,12",
        "Broken Fund,N.A.",
    ]);
    let past = write(&[
        "NAV Name,",
        "NAV Name,Net Asset Value",
        "Liquid Fund Growth,1000.00",
        "Old Gilt Fund,20",
    ]);

    let rec = Pipeline::new(&config)
        .run_files(latest.path(), past.path(), None, &ExtractionSettings::default())
        .unwrap();

    assert_eq!(rec.comparison.len(), 1);
    assert_eq!(rec.comparison[0].change_percent, dec("5.03"));
    assert_eq!(rec.comparison[0].fund_type.label(), "Debt");
    assert_eq!(rec.latest.skipped.len(), 1);
    assert_eq!(rec.latest_ledger.total_raw, 3);
    assert_eq!(rec.latest_ledger.excluded_variant, 1);
    assert_eq!(rec.past_ledger.excluded_not_comparable, 1);
    assert!(rec.ledgers().iter().all(|l| l.closes()));
}
