// 🏷️ Scheme Rules - Rules as Data
// Exclusion keywords, strip terms, type keywords and the variant priority ladder,
// loaded once from JSON and shared read-only by every snapshot pass.

use crate::error::ConfigError;
use crate::parser::ExtractionSettings;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

const EXCLUSION_KEYWORDS: &str = "exclusionKeywords";
const STRIP_TERMS: &str = "baseSchemeStripTerms";
const TYPE_KEYWORDS: &str = "typeKeywords";
const PRIORITY_LADDER: &str = "variantPriorityLadder";
const PREFERRED_KEYWORDS: &str = "preferredVariantKeywords";
const EXTRACTION: &str = "extraction";

// ============================================================================
// RULE CONFIG
// ============================================================================

/// One `typeKeywords` entry. Categories keep document order because the
/// first matching category wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCategory {
    pub name: String,
    pub keywords: Vec<String>,
}

/// Immutable matching configuration. There are no setters; a new config
/// means a new load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfig {
    exclusion_keywords: Vec<String>,
    base_scheme_strip_terms: Vec<String>,
    type_keywords: Vec<TypeCategory>,
    variant_priority_ladder: Vec<Vec<String>>,
    preferred_variant_keywords: BTreeSet<String>,
}

impl RuleConfig {
    pub fn new(
        exclusion_keywords: Vec<String>,
        base_scheme_strip_terms: Vec<String>,
        type_keywords: Vec<TypeCategory>,
        variant_priority_ladder: Vec<Vec<String>>,
        preferred_variant_keywords: BTreeSet<String>,
    ) -> Self {
        RuleConfig {
            exclusion_keywords,
            base_scheme_strip_terms,
            type_keywords,
            variant_priority_ladder,
            preferred_variant_keywords,
        }
    }

    pub fn exclusion_keywords(&self) -> &[String] {
        &self.exclusion_keywords
    }

    pub fn base_scheme_strip_terms(&self) -> &[String] {
        &self.base_scheme_strip_terms
    }

    pub fn type_keywords(&self) -> &[TypeCategory] {
        &self.type_keywords
    }

    pub fn variant_priority_ladder(&self) -> &[Vec<String>] {
        &self.variant_priority_ladder
    }

    pub fn preferred_variant_keywords(&self) -> &BTreeSet<String> {
        &self.preferred_variant_keywords
    }

    /// SHA-256 of the canonical JSON form, recorded with every run so an
    /// output can be traced back to the rules that produced it.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_string(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(canonical.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

// ============================================================================
// VALIDATION REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConfigWarning {
    /// Variant selection falls back to row order for every group.
    EmptyPriorityLadder,

    /// Keyword listed under several categories; the first category wins.
    AmbiguousTypeKeyword {
        keyword: String,
        categories: Vec<String>,
    },

    /// A ladder rung with no keywords matches every member.
    EmptyLadderRung { rung: usize },

    /// Preferred keyword that no ladder rung mentions.
    UnusedPreferredKeyword { keyword: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::EmptyPriorityLadder => write!(
                f,
                "variantPriorityLadder is empty; variant selection is by row order only"
            ),
            ConfigWarning::AmbiguousTypeKeyword { keyword, categories } => write!(
                f,
                "type keyword \"{}\" appears in several categories: {}",
                keyword,
                categories.join(", ")
            ),
            ConfigWarning::EmptyLadderRung { rung } => {
                write!(f, "variantPriorityLadder rung {} has no keywords", rung)
            }
            ConfigWarning::UnusedPreferredKeyword { keyword } => write!(
                f,
                "preferred variant keyword \"{}\" is not used by any ladder rung",
                keyword
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub warnings: Vec<ConfigWarning>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Inspect a config without touching it.
pub fn validate(config: &RuleConfig) -> ValidationReport {
    let mut warnings = Vec::new();

    if config.variant_priority_ladder.is_empty() {
        warnings.push(ConfigWarning::EmptyPriorityLadder);
    }

    for (rung, keywords) in config.variant_priority_ladder.iter().enumerate() {
        if keywords.iter().all(|k| k.trim().is_empty()) {
            warnings.push(ConfigWarning::EmptyLadderRung { rung });
        }
    }

    // keyword -> categories it appears under, in document order
    let mut seen: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for category in &config.type_keywords {
        for keyword in &category.keywords {
            let entry = seen.entry(keyword.trim().to_uppercase()).or_default();
            if !entry.contains(&category.name) {
                entry.push(category.name.clone());
            }
        }
    }
    for (keyword, categories) in seen {
        if categories.len() > 1 {
            warnings.push(ConfigWarning::AmbiguousTypeKeyword { keyword, categories });
        }
    }

    let ladder_keywords: BTreeSet<String> = config
        .variant_priority_ladder
        .iter()
        .flatten()
        .map(|k| k.trim().to_uppercase())
        .collect();
    for keyword in &config.preferred_variant_keywords {
        if !ladder_keywords.contains(&keyword.trim().to_uppercase()) {
            warnings.push(ConfigWarning::UnusedPreferredKeyword {
                keyword: keyword.clone(),
            });
        }
    }

    ValidationReport { warnings }
}

// ============================================================================
// RULE STORE
// ============================================================================

/// Everything a rules document yields.
#[derive(Debug, Clone)]
pub struct LoadedRules {
    pub config: RuleConfig,
    pub extraction: ExtractionSettings,
    pub report: ValidationReport,
}

pub struct RuleStore;

impl RuleStore {
    /// Load rules from a JSON file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<LoadedRules, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;
        Self::load(&content)
    }

    /// Parse and validate a rules document.
    pub fn load(source: &str) -> Result<LoadedRules, ConfigError> {
        let document: Value =
            serde_json::from_str(source).map_err(|e| ConfigError::InvalidJson {
                reason: e.to_string(),
            })?;
        let root = document.as_object().ok_or(ConfigError::NotAnObject)?;

        let exclusion_keywords = string_list(EXCLUSION_KEYWORDS, required(root, EXCLUSION_KEYWORDS)?)?;
        let strip_terms = string_list(STRIP_TERMS, required(root, STRIP_TERMS)?)?;
        let type_keywords = type_categories(required(root, TYPE_KEYWORDS)?)?;
        let ladder = priority_ladder(required(root, PRIORITY_LADDER)?)?;

        let preferred = match root.get(PREFERRED_KEYWORDS) {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(value) => string_list(PREFERRED_KEYWORDS, value)?.into_iter().collect(),
        };

        let extraction = match root.get(EXTRACTION) {
            None | Some(Value::Null) => ExtractionSettings::default(),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                ConfigError::MalformedSection {
                    section: EXTRACTION,
                    reason: e.to_string(),
                }
            })?,
        };

        let config = RuleConfig::new(exclusion_keywords, strip_terms, type_keywords, ladder, preferred);
        let report = validate(&config);

        debug!(
            exclusions = config.exclusion_keywords.len(),
            strip_terms = config.base_scheme_strip_terms.len(),
            categories = config.type_keywords.len(),
            ladder_rungs = config.variant_priority_ladder.len(),
            warnings = report.warnings.len(),
            "loaded scheme rules"
        );

        Ok(LoadedRules {
            config,
            extraction,
            report,
        })
    }
}

fn required<'a>(root: &'a Map<String, Value>, section: &'static str) -> Result<&'a Value, ConfigError> {
    match root.get(section) {
        None | Some(Value::Null) => Err(ConfigError::MissingSection { section }),
        Some(value) => Ok(value),
    }
}

fn string_list(section: &'static str, value: &Value) -> Result<Vec<String>, ConfigError> {
    let items = value.as_array().ok_or_else(|| ConfigError::MalformedSection {
        section,
        reason: "expected an array of strings".to_string(),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| ConfigError::MalformedSection {
                    section,
                    reason: format!("entry {} is not a string", i),
                })
        })
        .collect()
}

fn type_categories(value: &Value) -> Result<Vec<TypeCategory>, ConfigError> {
    let map = value.as_object().ok_or_else(|| ConfigError::MalformedSection {
        section: TYPE_KEYWORDS,
        reason: "expected an object of category -> [keyword]".to_string(),
    })?;

    map.iter()
        .map(|(name, keywords)| {
            let keywords = string_list(TYPE_KEYWORDS, keywords).map_err(|_| {
                ConfigError::MalformedSection {
                    section: TYPE_KEYWORDS,
                    reason: format!("category \"{}\" must be an array of strings", name),
                }
            })?;
            Ok(TypeCategory {
                name: name.clone(),
                keywords,
            })
        })
        .collect()
}

fn priority_ladder(value: &Value) -> Result<Vec<Vec<String>>, ConfigError> {
    let rungs = value.as_array().ok_or_else(|| ConfigError::MalformedSection {
        section: PRIORITY_LADDER,
        reason: "expected an array of keyword arrays".to_string(),
    })?;

    rungs
        .iter()
        .enumerate()
        .map(|(i, rung)| {
            string_list(PRIORITY_LADDER, rung).map_err(|_| ConfigError::MalformedSection {
                section: PRIORITY_LADDER,
                reason: format!("rung {} must be an array of strings", i),
            })
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
