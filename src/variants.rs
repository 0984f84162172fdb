// 🔀 Variant Resolver
// Collapses share-class variants (plan/option qualifiers) of one scheme into a
// single canonical record per base identity.
//
// Selection per multi-record group:
//   1. First ladder rung that at least one member satisfies (all keywords present)
//   2. Earliest source row among members satisfying that rung
//   3. No rung satisfied → earliest source row in the group

use crate::exclusion::ExclusionReason;
use crate::model::{ExclusionEntry, FundRecord};
use crate::rules::RuleConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

// ============================================================================
// RESOLUTION
// ============================================================================

/// How one multi-record group was decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupTrace {
    pub base_identity: String,
    pub member_rows: Vec<usize>,
    /// Ladder rung that decided the group; None means row-order fallback
    pub matched_rung: Option<usize>,
    pub canonical_row: usize,
    /// Preferred variant keywords present in the canonical name
    pub preferred_hits: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// One record per base identity, ordered by base identity
    pub canonical: Vec<FundRecord>,
    pub excluded: Vec<ExclusionEntry>,
    pub trace: Vec<GroupTrace>,
}

// ============================================================================
// VARIANT RESOLVER
// ============================================================================

pub struct VariantResolver {
    /// Ladder rungs with keywords uppercased, blanks dropped, padding kept
    ladder: Vec<Vec<String>>,
    preferred: Vec<String>,
}

impl VariantResolver {
    pub fn new(config: &RuleConfig) -> Self {
        let ladder = config
            .variant_priority_ladder()
            .iter()
            .map(|rung| {
                rung.iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| k.to_uppercase())
                    .collect()
            })
            .collect();
        let preferred = config
            .preferred_variant_keywords()
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| k.to_uppercase())
            .collect();
        VariantResolver { ladder, preferred }
    }

    /// Resolve every base-identity group of one snapshot.
    pub fn resolve(&self, records: Vec<FundRecord>) -> Resolution {
        let mut groups: BTreeMap<String, Vec<FundRecord>> = BTreeMap::new();
        for record in records {
            groups
                .entry(record.base_identity.clone())
                .or_default()
                .push(record);
        }

        let mut resolution = Resolution::default();

        for (base_identity, mut members) in groups {
            members.sort_by_key(|r| r.original_row_index);

            if members.len() == 1 {
                resolution.canonical.extend(members);
                continue;
            }

            let (chosen, matched_rung) = self.select(&members);
            let member_rows = members.iter().map(|r| r.original_row_index).collect();

            let canonical = members.remove(chosen);
            for member in members {
                resolution
                    .excluded
                    .push(ExclusionEntry::new(member, ExclusionReason::NonPreferredVariant));
            }

            debug!(
                base = %base_identity,
                canonical = %canonical.name,
                rung = ?matched_rung,
                "resolved variant group"
            );
            resolution.trace.push(GroupTrace {
                base_identity,
                member_rows,
                matched_rung,
                canonical_row: canonical.original_row_index,
                preferred_hits: self.preferred_hits(&canonical.name),
            });
            resolution.canonical.push(canonical);
        }

        resolution
    }

    /// Index of the canonical member and the rung that chose it.
    /// Members must be sorted by source row.
    fn select(&self, members: &[FundRecord]) -> (usize, Option<usize>) {
        let names: Vec<String> = members.iter().map(|m| m.name.to_uppercase()).collect();

        for (rung_index, rung) in self.ladder.iter().enumerate() {
            let hit = names
                .iter()
                .position(|name| rung.iter().all(|k| name.contains(k.as_str())));
            if let Some(index) = hit {
                return (index, Some(rung_index));
            }
        }

        (0, None)
    }

    fn preferred_hits(&self, name: &str) -> Vec<String> {
        let name_upper = name.to_uppercase();
        self.preferred
            .iter()
            .filter(|k| name_upper.contains(k.as_str()))
            .cloned()
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::FundType;
    use rust_decimal::Decimal;
    use std::collections::{BTreeSet, HashSet};

    fn create_test_record(name: &str, base: &str, nav: i64, row: usize) -> FundRecord {
        FundRecord {
            name: name.to_string(),
            key: crate::normalize::normalize(name),
            base_identity: base.to_string(),
            nav: Decimal::from(nav),
            fund_type: FundType::Other,
            original_row_index: row,
        }
    }

    fn create_test_resolver(ladder: &[&[&str]], preferred: &[&str]) -> VariantResolver {
        let config = RuleConfig::new(
            vec![],
            vec![],
            vec![],
            ladder
                .iter()
                .map(|rung| rung.iter().map(|s| s.to_string()).collect())
                .collect(),
            preferred.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        );
        VariantResolver::new(&config)
    }

    #[test]
    fn test_singleton_is_canonical() {
        let resolver = create_test_resolver(&[&["GROWTH"]], &[]);
        let resolution = resolver.resolve(vec![create_test_record("ABC Fund", "ABC FUND", 10, 0)]);

        assert_eq!(resolution.canonical.len(), 1);
        assert!(resolution.excluded.is_empty());
        assert!(resolution.trace.is_empty());
    }

    #[test]
    fn test_ladder_picks_regular_growth() {
        let resolver = create_test_resolver(&[&["REGULAR PLAN", "GROWTH"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("XYZ Fund Direct Plan Growth", "XYZ FUND", 25, 0),
            create_test_record("XYZ Fund Regular Plan Growth", "XYZ FUND", 20, 1),
        ]);

        assert_eq!(resolution.canonical.len(), 1);
        assert_eq!(resolution.canonical[0].name, "XYZ Fund Regular Plan Growth");
        assert_eq!(resolution.canonical[0].nav, Decimal::from(20));

        assert_eq!(resolution.excluded.len(), 1);
        assert_eq!(resolution.excluded[0].record.name, "XYZ Fund Direct Plan Growth");
        assert_eq!(resolution.excluded[0].reason.to_string(), "non-preferred variant");

        assert_eq!(resolution.trace[0].matched_rung, Some(0));
        assert_eq!(resolution.trace[0].canonical_row, 1);
    }

    #[test]
    fn test_earlier_rung_beats_later_rung() {
        let resolver = create_test_resolver(&[&["DIRECT"], &["REGULAR"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund Regular", "FUND", 1, 0),
            create_test_record("Fund Direct", "FUND", 2, 1),
        ]);

        assert_eq!(resolution.canonical[0].name, "Fund Direct");
    }

    #[test]
    fn test_rung_needs_all_keywords_on_one_member() {
        // "REGULAR" and "GROWTH" are each present, but never on the same member
        let resolver = create_test_resolver(&[&["REGULAR", "GROWTH"], &["DIRECT"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund Regular IDCW", "FUND", 1, 0),
            create_test_record("Fund Direct Growth", "FUND", 2, 1),
        ]);

        assert_eq!(resolution.canonical[0].name, "Fund Direct Growth");
        assert_eq!(resolution.trace[0].matched_rung, Some(1));
    }

    #[test]
    fn test_tie_break_smallest_row() {
        let resolver = create_test_resolver(&[&["GROWTH"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund Growth B", "FUND", 1, 7),
            create_test_record("Fund Growth A", "FUND", 2, 3),
            create_test_record("Fund IDCW", "FUND", 3, 1),
        ]);

        assert_eq!(resolution.canonical[0].original_row_index, 3);
        assert_eq!(resolution.excluded.len(), 2);
        assert_eq!(resolution.trace[0].member_rows, vec![1, 3, 7]);
    }

    #[test]
    fn test_no_rung_falls_back_to_row_order() {
        let resolver = create_test_resolver(&[&["BONUS"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund B", "FUND", 1, 5),
            create_test_record("Fund A", "FUND", 2, 2),
        ]);

        assert_eq!(resolution.canonical[0].original_row_index, 2);
        assert_eq!(resolution.trace[0].matched_rung, None);
        assert!(resolution.excluded.iter().all(|e| e.is_variant()));
    }

    #[test]
    fn test_padded_keyword_keeps_word_boundary() {
        // " PLAN" must not match inside "PLANET"
        let resolver = create_test_resolver(&[&[" PLAN"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Planet Fund", "PLANET FUND", 1, 0),
            create_test_record("Planet Fund Plan", "PLANET FUND", 2, 1),
        ]);

        assert_eq!(resolution.canonical[0].name, "Planet Fund Plan");
        assert_eq!(resolution.trace[0].matched_rung, Some(0));
    }

    #[test]
    fn test_blank_rung_matches_first_member() {
        let resolver = create_test_resolver(&[&["  "], &["GROWTH"]], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund IDCW", "FUND", 1, 0),
            create_test_record("Fund Growth", "FUND", 2, 1),
        ]);

        assert_eq!(resolution.canonical[0].name, "Fund IDCW");
        assert_eq!(resolution.trace[0].matched_rung, Some(0));
    }

    #[test]
    fn test_empty_ladder_uses_row_order() {
        let resolver = create_test_resolver(&[], &[]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund Direct", "FUND", 1, 4),
            create_test_record("Fund Regular", "FUND", 2, 0),
        ]);

        assert_eq!(resolution.canonical[0].name, "Fund Regular");
    }

    #[test]
    fn test_preferred_hits_in_trace() {
        let resolver = create_test_resolver(&[&["REGULAR", "GROWTH"]], &["growth", "BONUS"]);
        let resolution = resolver.resolve(vec![
            create_test_record("Fund Regular Growth", "FUND", 1, 0),
            create_test_record("Fund Direct Growth", "FUND", 2, 1),
        ]);

        assert_eq!(resolution.trace[0].preferred_hits, vec!["GROWTH".to_string()]);
    }

    #[test]
    fn test_one_canonical_per_base_identity() {
        let resolver = create_test_resolver(&[&["GROWTH"]], &[]);
        let records = vec![
            create_test_record("A Growth", "A", 1, 0),
            create_test_record("A IDCW", "A", 1, 1),
            create_test_record("B Growth", "B", 1, 2),
            create_test_record("C IDCW", "C", 1, 3),
            create_test_record("C Bonus", "C", 1, 4),
            create_test_record("C Growth", "C", 1, 5),
        ];
        let total = records.len();
        let resolution = resolver.resolve(records);

        let bases: HashSet<&str> = resolution
            .canonical
            .iter()
            .map(|r| r.base_identity.as_str())
            .collect();
        assert_eq!(bases.len(), resolution.canonical.len());
        assert_eq!(resolution.canonical.len(), 3);
        assert_eq!(resolution.canonical.len() + resolution.excluded.len(), total);
    }
}
