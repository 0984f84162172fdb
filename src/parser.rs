// 🏗️ Sheet Extraction
// Reads a snapshot sheet into a grid, expands merged regions, locates the
// header and yields one RawRecord per populated data row.

use crate::error::ExtractionError;
use crate::model::{RawRecord, RawValue};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// ============================================================================
// GRID MODEL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    /// Cell rendered as text; whole numbers print without a fraction.
    pub fn text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
        }
    }

    pub fn to_raw_value(&self) -> RawValue {
        match self {
            Cell::Number(n) => RawValue::Number(*n),
            cell if cell.is_empty() => RawValue::Empty,
            Cell::Text(s) => RawValue::Text(s.clone()),
            Cell::Empty => RawValue::Empty,
        }
    }
}

/// Inclusive, zero-based merged area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRegion {
    pub first_row: usize,
    pub first_col: usize,
    pub last_row: usize,
    pub last_col: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    merged: Vec<MergedRegion>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Grid {
            rows,
            merged: Vec::new(),
        }
    }

    pub fn with_merged(mut self, merged: Vec<MergedRegion>) -> Self {
        self.merged = merged;
        self
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Copy each merged region's top-left value into every cell it covers.
    pub fn flatten(&mut self) {
        let merged = std::mem::take(&mut self.merged);
        for region in &merged {
            let value = self
                .cell(region.first_row, region.first_col)
                .cloned()
                .unwrap_or(Cell::Empty);

            if self.rows.len() <= region.last_row {
                self.rows.resize(region.last_row + 1, Vec::new());
            }
            for row in &mut self.rows[region.first_row..=region.last_row] {
                if row.len() <= region.last_col {
                    row.resize(region.last_col + 1, Cell::Empty);
                }
                for cell in &mut row[region.first_col..=region.last_col] {
                    *cell = value.clone();
                }
            }
        }
        debug!(regions = merged.len(), "flattened merged regions");
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Where the header is and which columns hold names and values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExtractionSettings {
    /// Text searched for (case-insensitive) to find the header marker row
    pub header_marker: String,
    /// Rows between the marker row and the column header row
    pub header_offset: usize,
    pub name_column: String,
    pub value_column: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        ExtractionSettings {
            header_marker: "NAV Name".to_string(),
            header_offset: 1,
            name_column: "NAV Name".to_string(),
            value_column: "Net Asset Value".to_string(),
        }
    }
}

/// Pull raw records out of an already flattened grid.
pub fn extract(grid: &Grid, settings: &ExtractionSettings) -> Result<Vec<RawRecord>, ExtractionError> {
    let marker = settings.header_marker.to_lowercase();
    let marker_row = grid
        .rows()
        .iter()
        .position(|row| {
            row.iter()
                .any(|cell| cell.text().to_lowercase().contains(marker.as_str()))
        })
        .ok_or_else(|| ExtractionError::HeaderNotFound {
            marker: settings.header_marker.clone(),
        })?;

    let header_row = marker_row + settings.header_offset;
    let header = grid
        .rows()
        .get(header_row)
        .ok_or(ExtractionError::HeaderOutOfRange {
            row: header_row,
            rows: grid.rows().len(),
        })?;

    let name_col = find_column(header, &settings.name_column, header_row)?;
    let value_col = find_column(header, &settings.value_column, header_row)?;

    let records: Vec<RawRecord> = grid
        .rows()
        .iter()
        .enumerate()
        .skip(header_row + 1)
        .filter(|(_, row)| !row.iter().all(Cell::is_empty))
        .map(|(index, row)| {
            let name = row.get(name_col).map(Cell::text).unwrap_or_default();
            let value = row
                .get(value_col)
                .map(Cell::to_raw_value)
                .unwrap_or(RawValue::Empty);
            RawRecord::new(name, value, index)
        })
        .collect();

    debug!(
        marker_row,
        header_row,
        records = records.len(),
        "extracted raw records"
    );

    Ok(records)
}

fn find_column(header: &[Cell], label: &str, row: usize) -> Result<usize, ExtractionError> {
    let wanted = label.trim().to_lowercase();
    header
        .iter()
        .position(|cell| cell.text().trim().to_lowercase() == wanted)
        .ok_or_else(|| ExtractionError::MissingColumn {
            column: label.to_string(),
            row,
        })
}

// ============================================================================
// SHEET SOURCES
// ============================================================================

/// Reads a document into a grid. Merged regions are reported, not applied.
pub trait SheetSource: Send + Sync {
    fn read_grid(&self, path: &Path) -> Result<Grid>;

    fn name(&self) -> &str;
}

/// Plain CSV export; every field is read as text.
pub struct CsvSource;

impl SheetSource for CsvSource {
    fn read_grid(&self, path: &Path) -> Result<Grid> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let mut rows = Vec::new();
        for (line, result) in reader.records().enumerate() {
            let record = result
                .with_context(|| format!("Failed to parse CSV line {} in {}", line + 1, path.display()))?;
            rows.push(
                record
                    .iter()
                    .map(|field| {
                        if field.trim().is_empty() {
                            Cell::Empty
                        } else {
                            Cell::Text(field.to_string())
                        }
                    })
                    .collect(),
            );
        }

        Ok(Grid::new(rows))
    }

    fn name(&self) -> &str {
        "csv"
    }
}

/// Excel workbook; reads one sheet (the first unless named).
pub struct XlsxSource {
    pub sheet: Option<String>,
}

impl SheetSource for XlsxSource {
    fn read_grid(&self, path: &Path) -> Result<Grid> {
        let mut workbook: Xlsx<_> = open_workbook(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let sheet = match &self.sheet {
            Some(sheet) => sheet.clone(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?,
        };

        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("Failed to read sheet \"{}\" in {}", sheet, path.display()))?;

        // Range rows are relative to its first used cell; the grid is absolute
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for data_row in range.rows() {
            let mut row = vec![Cell::Empty; col_offset];
            row.extend(data_row.iter().map(to_cell));
            rows.push(row);
        }

        let merged = match workbook.worksheet_merge_cells(&sheet) {
            Some(result) => result
                .with_context(|| format!("Failed to read merged cells of \"{}\"", sheet))?
                .iter()
                .map(|dims| MergedRegion {
                    first_row: dims.start.0 as usize,
                    first_col: dims.start.1 as usize,
                    last_row: dims.end.0 as usize,
                    last_col: dims.end.1 as usize,
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(Grid::new(rows).with_merged(merged))
    }

    fn name(&self) -> &str {
        "xlsx"
    }
}

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        other => Cell::Text(other.to_string()),
    }
}

/// Pick a source from the file extension.
pub fn detect_source(path: &Path, sheet: Option<String>) -> Result<Box<dyn SheetSource>> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => Ok(Box::new(CsvSource)),
        "xlsx" | "xlsm" => Ok(Box::new(XlsxSource { sheet })),
        _ => Err(anyhow!(
            "Could not detect sheet format from filename: {}",
            path.display()
        )),
    }
}

/// Read, flatten and extract one snapshot document.
pub fn load_snapshot(
    path: &Path,
    sheet: Option<String>,
    settings: &ExtractionSettings,
) -> Result<Vec<RawRecord>> {
    let source = detect_source(path, sheet)?;
    let mut grid = source.read_grid(path)?;
    grid.flatten();

    let records = extract(&grid, settings)
        .with_context(|| format!("Failed to extract records from {}", path.display()))?;
    debug!(path = %path.display(), source = source.name(), records = records.len(), "loaded snapshot");
    Ok(records)
}

// ============================================================================
// TESTS
// ============================================================================
