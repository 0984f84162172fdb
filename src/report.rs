// 📊 Report Output
// Result workbook (one sheet per ledger) and a JSON run summary.

use crate::reconciliation::{NotComparableEntry, Reconciliation, ReconciliationLedger};
use crate::rules::{ConfigWarning, RuleConfig};
use crate::variants::GroupTrace;
use crate::model::ExclusionEntry;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

// ============================================================================
// WORKBOOK
// ============================================================================

enum ReportCell {
    Text(String),
    Number(f64),
}

impl From<&str> for ReportCell {
    fn from(value: &str) -> Self {
        ReportCell::Text(value.to_string())
    }
}

impl From<String> for ReportCell {
    fn from(value: String) -> Self {
        ReportCell::Text(value)
    }
}

impl From<Decimal> for ReportCell {
    fn from(value: Decimal) -> Self {
        ReportCell::Number(value.to_f64().unwrap_or_default())
    }
}

impl From<usize> for ReportCell {
    fn from(value: usize) -> Self {
        ReportCell::Number(value as f64)
    }
}

struct Table {
    name: &'static str,
    headers: &'static [&'static str],
    rows: Vec<Vec<ReportCell>>,
}

/// Write every result table to one workbook.
pub fn write_workbook(path: &Path, rec: &Reconciliation) -> Result<()> {
    let tables = build_tables(rec);
    let bold = Format::new().set_bold();
    let mut workbook = Workbook::new();

    for table in &tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(table.name)?;

        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *header, &bold)?;
        }
        for (i, row) in table.rows.iter().enumerate() {
            let r = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                match cell {
                    ReportCell::Text(text) => sheet.write_string(r, col as u16, text.as_str())?,
                    ReportCell::Number(n) => sheet.write_number(r, col as u16, *n)?,
                };
            }
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to write workbook: {}", path.display()))?;

    info!(path = %path.display(), sheets = tables.len(), "wrote result workbook");
    Ok(())
}

fn build_tables(rec: &Reconciliation) -> Vec<Table> {
    vec![
        Table {
            name: "NAV Comparison",
            headers: &["Name", "Type", "Latest NAV", "Past NAV", "Change", "Change %"],
            rows: rec
                .comparison
                .iter()
                .map(|row| -> Vec<ReportCell> {
                    vec![
                        row.name.as_str().into(),
                        row.fund_type.label().into(),
                        row.latest_nav.into(),
                        row.past_nav.into(),
                        row.change.into(),
                        row.change_percent.into(),
                    ]
                })
                .collect(),
        },
        exclusion_table("Excluded Latest", &rec.latest.exclusions),
        exclusion_table("Excluded Past", &rec.past.exclusions),
        Table {
            name: "Zero NAV",
            headers: &["Name", "Latest NAV", "Past NAV"],
            rows: rec
                .zero_nav
                .iter()
                .map(|entry| -> Vec<ReportCell> {
                    vec![
                        entry.name.as_str().into(),
                        entry.latest_nav.into(),
                        entry.past_nav.into(),
                    ]
                })
                .collect(),
        },
        not_comparable_table("Not Comparable Latest", &rec.not_comparable_latest),
        not_comparable_table("Not Comparable Past", &rec.not_comparable_past),
        Table {
            name: "Reconciliation",
            headers: &["Snapshot", "Category", "Count"],
            rows: rec
                .ledgers()
                .iter()
                .flat_map(|ledger| {
                    ledger.rows().into_iter().map(move |(category, count)| -> Vec<ReportCell> {
                        vec![
                            ledger.snapshot.to_string().into(),
                            category.label().into(),
                            count.into(),
                        ]
                    })
                })
                .collect(),
        },
    ]
}

fn exclusion_table(name: &'static str, entries: &[ExclusionEntry]) -> Table {
    Table {
        name,
        headers: &["Name", "Type", "NAV", "Row", "Reason"],
        rows: entries
            .iter()
            .map(|e| -> Vec<ReportCell> {
                vec![
                    e.record.name.as_str().into(),
                    e.record.fund_type.label().into(),
                    e.record.nav.into(),
                    (e.record.original_row_index + 1).into(),
                    e.reason.to_string().into(),
                ]
            })
            .collect(),
    }
}

fn not_comparable_table(name: &'static str, entries: &[NotComparableEntry]) -> Table {
    Table {
        name,
        headers: &["Name", "Type", "NAV", "Row", "Reason"],
        rows: entries
            .iter()
            .map(|e| -> Vec<ReportCell> {
                vec![
                    e.record.name.as_str().into(),
                    e.record.fund_type.label().into(),
                    e.record.nav.into(),
                    (e.record.original_row_index + 1).into(),
                    e.reason().into(),
                ]
            })
            .collect(),
    }
}

/// Plain-text reconciliation table for the terminal.
pub fn ledger_table(rec: &Reconciliation) -> String {
    let mut out = format!("{:<10} {:<26} {:>8}\n", "Snapshot", "Category", "Count");
    for ledger in rec.ledgers() {
        for (category, count) in ledger.rows() {
            out.push_str(&format!(
                "{:<10} {:<26} {:>8}\n",
                ledger.snapshot.to_string(),
                category.label(),
                count
            ));
        }
    }
    out
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub rules_fingerprint: String,
    pub latest_source: String,
    pub past_source: String,
    pub compared: usize,
    pub ledgers: Vec<ReconciliationLedger>,
    pub latest_skipped_rows: usize,
    pub past_skipped_rows: usize,
    pub warnings: Vec<ConfigWarning>,
    pub latest_variant_groups: Vec<GroupTrace>,
    pub past_variant_groups: Vec<GroupTrace>,
}

impl RunSummary {
    pub fn new(
        rec: &Reconciliation,
        config: &RuleConfig,
        warnings: &[ConfigWarning],
        latest_source: &Path,
        past_source: &Path,
    ) -> Self {
        RunSummary {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            rules_fingerprint: config.fingerprint(),
            latest_source: latest_source.display().to_string(),
            past_source: past_source.display().to_string(),
            compared: rec.comparison.len(),
            ledgers: vec![rec.latest_ledger.clone(), rec.past_ledger.clone()],
            latest_skipped_rows: rec.latest.skipped.len(),
            past_skipped_rows: rec.past.skipped.len(),
            warnings: warnings.to_vec(),
            latest_variant_groups: rec.latest.trace.clone(),
            past_variant_groups: rec.past.trace.clone(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create summary file: {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .context("Failed to serialize run summary")?;
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================
