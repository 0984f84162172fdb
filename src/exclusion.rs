// 🚫 Exclusion Filter
// First configured keyword contained in the name excludes the record.

use crate::rules::RuleConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// EXCLUSION REASON
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionReason {
    /// Name contains a configured exclusion keyword
    Rule { keyword: String },

    /// Lost variant selection to another member of its base-identity group
    NonPreferredVariant,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::Rule { keyword } => write!(f, "contains {}", keyword),
            ExclusionReason::NonPreferredVariant => write!(f, "non-preferred variant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Keep,
    Exclude(ExclusionReason),
}

impl Verdict {
    pub fn is_excluded(&self) -> bool {
        matches!(self, Verdict::Exclude(_))
    }
}

// ============================================================================
// EXCLUSION FILTER
// ============================================================================

pub struct ExclusionFilter {
    /// (uppercased keyword, keyword as configured)
    keywords: Vec<(String, String)>,
}

impl ExclusionFilter {
    pub fn new(config: &RuleConfig) -> Self {
        let keywords = config
            .exclusion_keywords()
            .iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| (k.to_uppercase(), k.clone()))
            .collect();
        ExclusionFilter { keywords }
    }

    /// Scan keywords in configured order; the first hit decides the reason.
    pub fn classify(&self, name: &str) -> Verdict {
        let name_upper = name.to_uppercase();
        for (upper, keyword) in &self.keywords {
            if name_upper.contains(upper.as_str()) {
                return Verdict::Exclude(ExclusionReason::Rule {
                    keyword: keyword.clone(),
                });
            }
        }
        Verdict::Keep
    }
}
