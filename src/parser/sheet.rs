//! CSV metadata sheets.
//!
//! A sheet is read fully into memory. Cells are stored as trimmed strings and
//! empty cells read back as `None`, so callers never see blank values.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

use crate::error::{MetadataError, Result};

/// Legacy spelling of the sample column accepted on input.
const LEGACY_SAMPLE_COLUMN: &str = "biosample_id";
pub const SAMPLE_COLUMN: &str = "sample_id";

#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    /// 1-based data row number, not counting the header
    pub number: usize,
    values: HashMap<String, String>,
}

impl SheetRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn require(&self, column: &str) -> Result<&str> {
        self.get(column).ok_or_else(|| MetadataError::MissingValue {
            column: column.to_string(),
            row: self.number,
        })
    }

    /// Columns holding a non-empty value in this row.
    pub fn filled_columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().filter(|(_, v)| !v.is_empty()).map(|(k, _)| k.as_str())
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.values.insert(column.to_string(), value.into().trim().to_string());
    }

    pub fn clear(&mut self, column: &str) {
        self.values.remove(column);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataSheet {
    headers: Vec<String>,
    rows: Vec<SheetRow>,
}

impl MetadataSheet {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|e| {
            MetadataError::InvalidInput(format!("Metadata file not found: {} ({})", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(reader);

        let mut headers: Vec<String> = csv_reader.headers()?.iter().map(|h| h.to_string()).collect();
        if !headers.iter().any(|h| h == SAMPLE_COLUMN) {
            if let Some(h) = headers.iter_mut().find(|h| h.as_str() == LEGACY_SAMPLE_COLUMN) {
                *h = SAMPLE_COLUMN.to_string();
            }
        }

        let mut rows = Vec::new();
        for (idx, record) in csv_reader.records().enumerate() {
            let record = record?;
            let values = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, v)| !v.is_empty())
                .map(|(h, v)| (h.clone(), v.to_string()))
                .collect();
            rows.push(SheetRow { number: idx + 1, values });
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[SheetRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [SheetRow] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    /// True when the column exists and at least one row has a value in it.
    pub fn has_values(&self, column: &str) -> bool {
        self.rows.iter().any(|r| r.get(column).is_some())
    }

    /// True when the column is missing or any row leaves it empty.
    pub fn any_missing(&self, column: &str) -> bool {
        !self.has_column(column) || self.rows.iter().any(|r| r.get(column).is_none())
    }

    pub fn add_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.headers.push(column.to_string());
        }
    }

    pub fn require_columns(&self, columns: &[&str]) -> Result<()> {
        let missing: Vec<String> = columns
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(MetadataError::MissingColumns(missing))
        }
    }

    /// Fails when any non-empty value repeats within `column`.
    pub fn check_unique(&self, column: &str) -> Result<()> {
        self.require_columns(&[column])?;
        let mut seen = HashSet::new();
        for row in &self.rows {
            if let Some(value) = row.get(column) {
                if !seen.insert(value) {
                    return Err(MetadataError::DuplicateValues(column.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Distinct non-empty values of `column` in order of first appearance.
    pub fn unique_values(&self, column: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.rows
            .iter()
            .filter_map(|r| r.get(column))
            .filter(|v| seen.insert(*v))
            .map(str::to_string)
            .collect()
    }

    /// Sets `target` on every row whose `key` column equals `key_value`.
    pub fn set_where(&mut self, key: &str, key_value: &str, target: &str, value: &str) {
        self.add_column(target);
        for row in self.rows.iter_mut().filter(|r| r.get(key) == Some(key_value)) {
            row.set(target, value);
        }
    }
}
