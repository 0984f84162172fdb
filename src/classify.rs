// 🗂️ Fund Type Classification
// First category in document order with a keyword in the name wins.

use crate::rules::RuleConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundType {
    Category(String),
    Other,
}

impl FundType {
    pub fn label(&self) -> &str {
        match self {
            FundType::Category(name) => name,
            FundType::Other => "Other",
        }
    }
}

impl fmt::Display for FundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub struct TypeClassifier {
    /// (category, uppercased keywords)
    categories: Vec<(String, Vec<String>)>,
}

impl TypeClassifier {
    pub fn new(config: &RuleConfig) -> Self {
        let categories = config
            .type_keywords()
            .iter()
            .map(|c| {
                let keywords = c
                    .keywords
                    .iter()
                    .filter(|k| !k.trim().is_empty())
                    .map(|k| k.to_uppercase())
                    .collect();
                (c.name.clone(), keywords)
            })
            .collect();
        TypeClassifier { categories }
    }

    pub fn classify(&self, name: &str) -> FundType {
        let name_upper = name.to_uppercase();
        self.categories
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name_upper.contains(k.as_str())))
            .map(|(category, _)| FundType::Category(category.clone()))
            .unwrap_or(FundType::Other)
    }
}
