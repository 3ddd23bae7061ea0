use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use super::normalizer::normalize_header;

/// Raw sheet content: normalized header names plus one string map per data row.
///
/// Column names are whatever the exporting system used; mapping them onto the
/// canonical record shape is the normalizer's job, not the parser's.
#[derive(Debug)]
pub struct SheetRows {
    pub headers: Vec<String>,
    pub rows: Vec<HashMap<String, String>>,
}

#[derive(Debug)]
pub enum ParseError {
    Io(std::io::Error),
    Workbook(calamine::Error),
    Csv(csv::Error),
    /// Readable file, but no header row or zero data rows.
    Empty,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Io(err) => write!(f, "failed to read spreadsheet: {}", err),
            ParseError::Workbook(err) => write!(f, "unreadable workbook: {}", err),
            ParseError::Csv(err) => write!(f, "invalid CSV data: {}", err),
            ParseError::Empty => write!(f, "empty or invalid spreadsheet"),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Io(err) => Some(err),
            ParseError::Workbook(err) => Some(err),
            ParseError::Csv(err) => Some(err),
            ParseError::Empty => None,
        }
    }
}

impl From<std::io::Error> for ParseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<calamine::Error> for ParseError {
    fn from(err: calamine::Error) -> Self {
        Self::Workbook(err)
    }
}

impl From<csv::Error> for ParseError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Parse a spreadsheet file, dispatching on the extension: `.xls`/`.xlsx`
/// through calamine, anything else as CSV.
pub fn parse_path(path: &Path) -> Result<SheetRows, ParseError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    let mut file = File::open(path)?;
    match extension.as_deref() {
        Some("xls") | Some("xlsx") => {
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            parse_workbook(Cursor::new(bytes))
        }
        _ => parse_csv(file),
    }
}

/// Parse a binary workbook. Only the first sheet is read; its first row is
/// the header whose values become the keys of every subsequent row.
pub fn parse_workbook<RS: Read + Seek + Clone>(reader: RS) -> Result<SheetRows, ParseError> {
    let mut workbook = open_workbook_auto_from_rs(reader)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ParseError::Empty)?
        .map_err(ParseError::Workbook)?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(ParseError::Empty)?;
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();
    if headers.iter().all(|header| header.is_empty()) {
        return Err(ParseError::Empty);
    }
    let headers: Vec<String> = headers.iter().map(|raw| normalize_header(raw)).collect();

    let mut parsed = Vec::new();
    for row in rows {
        let mut record = HashMap::new();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if header.is_empty() {
                continue;
            }
            let value = cell_to_string(cell);
            if !value.is_empty() {
                record.insert(header.clone(), value);
            }
        }
        if !record.is_empty() {
            parsed.push(record);
        }
    }

    if parsed.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(SheetRows {
        headers,
        rows: parsed,
    })
}

/// Parse CSV content with the same header-keyed row shape as the workbook path.
pub fn parse_csv<R: Read>(reader: R) -> Result<SheetRows, ParseError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();
    if headers.iter().all(|header| header.is_empty()) {
        return Err(ParseError::Empty);
    }

    let mut parsed = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut row = HashMap::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            if header.is_empty() || value.is_empty() {
                continue;
            }
            row.insert(header.clone(), value.to_string());
        }
        if !row.is_empty() {
            parsed.push(row);
        }
    }

    if parsed.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(SheetRows {
        headers,
        rows: parsed,
    })
}

/// Coerce a workbook cell to the string shape the normalizer consumes.
/// Fraction-less floats render as integers so order numbers survive Excel's
/// numeric column inference.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.trim().to_string(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => {
            if value.fract() == 0.0 {
                format!("{}", *value as i64)
            } else {
                value.to_string()
            }
        }
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(value) | Data::DurationIso(value) => value.trim().to_string(),
        Data::Error(_) => String::new(),
    }
}
