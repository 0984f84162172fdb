// 📄 Record Model
// Raw rows from a snapshot and the fund records derived from them.

use crate::classify::FundType;
use crate::error::DataError;
use crate::exclusion::ExclusionReason;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// RAW RECORD (output of sheet extraction)
// ============================================================================

/// Value cell as extracted, before numeric coercion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Empty,
}

impl RawValue {
    /// Coerce to a decimal NAV. Text may carry surrounding whitespace and
    /// thousands separators.
    pub fn to_decimal(&self) -> Result<Decimal, DataError> {
        match self {
            RawValue::Number(n) => {
                Decimal::try_from(*n).map_err(|_| DataError::NonNumericValue(n.to_string()))
            }
            RawValue::Text(text) => {
                let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
                if cleaned.is_empty() {
                    return Err(DataError::MissingValue);
                }
                Decimal::from_str(&cleaned)
                    .or_else(|_| Decimal::from_scientific(&cleaned))
                    .map_err(|_| DataError::NonNumericValue(text.clone()))
            }
            RawValue::Empty => Err(DataError::MissingValue),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub name: String,
    pub value: RawValue,
    /// Zero-based row in the source sheet
    pub source_row_index: usize,
}

impl RawRecord {
    pub fn new(name: impl Into<String>, value: RawValue, source_row_index: usize) -> Self {
        RawRecord {
            name: name.into(),
            value,
            source_row_index,
        }
    }
}

/// A row dropped during coercion. Not part of TotalRaw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub source_row_index: usize,
    pub error: DataError,
}

// ============================================================================
// FUND RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundRecord {
    pub name: String,
    pub key: String,
    pub base_identity: String,
    pub nav: Decimal,
    pub fund_type: FundType,
    pub original_row_index: usize,
}

/// A record removed from comparison by a rule or by variant selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    #[serde(flatten)]
    pub record: FundRecord,
    pub reason: ExclusionReason,
}

impl ExclusionEntry {
    pub fn new(record: FundRecord, reason: ExclusionReason) -> Self {
        ExclusionEntry { record, reason }
    }

    pub fn is_variant(&self) -> bool {
        self.reason == ExclusionReason::NonPreferredVariant
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(RawValue::Number(10.5).to_decimal().unwrap(), dec("10.5"));
        assert_eq!(RawValue::Number(0.0).to_decimal().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_text_coercion() {
        assert_eq!(RawValue::Text(" 1,234.5678 ".into()).to_decimal().unwrap(), dec("1234.5678"));
        assert_eq!(RawValue::Text("-3".into()).to_decimal().unwrap(), dec("-3"));
        assert_eq!(RawValue::Text("1e2".into()).to_decimal().unwrap(), dec("100"));
    }

    #[test]
    fn test_unparsable_values() {
        assert_eq!(
            RawValue::Text("N.A.".into()).to_decimal(),
            Err(DataError::NonNumericValue("N.A.".into()))
        );
        assert_eq!(RawValue::Text("  ".into()).to_decimal(), Err(DataError::MissingValue));
        assert_eq!(RawValue::Empty.to_decimal(), Err(DataError::MissingValue));
        assert!(RawValue::Number(f64::NAN).to_decimal().is_err());
    }
}
