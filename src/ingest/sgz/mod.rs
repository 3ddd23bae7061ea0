//! SGZ spreadsheet handling: parsing the export file, mapping its column
//! variants onto the canonical record shape, and classifying service types.

pub mod classifier;
pub(crate) mod mapping;
pub(crate) mod normalizer;
pub mod parser;

use std::fmt;

use chrono::NaiveDateTime;

use crate::domain::WorkOrder;
use self::parser::SheetRows;

/// Required columns absent from the sheet header. Fatal before any
/// persistence begins; no batch row exists when this is raised.
#[derive(Debug)]
pub struct ValidationError {
    pub missing_columns: Vec<&'static str>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "spreadsheet is missing required columns: {}",
            self.missing_columns.join(", ")
        )
    }
}

impl std::error::Error for ValidationError {}

/// Check that every required column resolves through some known alias.
pub fn validate_headers(sheet: &SheetRows) -> Result<(), ValidationError> {
    let missing = mapping::missing_required_columns(&sheet.headers);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError {
            missing_columns: missing,
        })
    }
}

/// Normalize every raw row into a canonical record. One record per data row,
/// always: per-row defects degrade to placeholders or fallbacks instead of
/// failing the batch.
pub fn normalize_sheet(sheet: &SheetRows, batch_id: u64, now: NaiveDateTime) -> Vec<WorkOrder> {
    sheet
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| normalizer::normalize_row(row, index, batch_id, now))
        .collect()
}
