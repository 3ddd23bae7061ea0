use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::mapping::{self, Field};
use crate::domain::{is_completed_status, WorkOrder};

use super::classifier;

/// Normalize a column header for alias lookup: strip BOM/zero-width chars,
/// fold accents, collapse whitespace, lowercase.
pub(crate) fn normalize_header(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}'], "");
    let folded: String = cleaned.chars().map(fold_char).collect();
    let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_ascii_lowercase()
}

/// Accent folding for the Portuguese characters that show up in SGZ exports.
fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'º' => 'o',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' => 'c',
        'Ç' => 'C',
        'ª' => 'a',
        other => other,
    }
}

/// Accent/case folding for free-text comparison (status codes, keywords).
pub(crate) fn fold_text(value: &str) -> String {
    value
        .chars()
        .map(fold_char)
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_ascii_uppercase()
}

/// Permissive datetime parsing across the formats seen in SGZ exports.
/// Returns `None` for blank or unrecognized values; callers decide the
/// fallback so a malformed date never aborts an otherwise-valid row.
pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    for format in ["%d/%m/%Y", "%Y-%m-%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

/// Whole days between opening and the end bound, rounded up, at least 1.
///
/// Completed orders measure to their last status change when the export
/// carries one; open orders (and completed orders without a status-change
/// timestamp) measure to `now`.
pub(crate) fn days_open(
    opened_at: NaiveDateTime,
    status: &str,
    status_changed_at: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> i64 {
    let end = if is_completed_status(status) {
        status_changed_at.unwrap_or(now)
    } else {
        now
    };

    let seconds = (end - opened_at).num_seconds().abs();
    let days = (seconds + 86_399) / 86_400;
    days.max(1)
}

/// Map one raw row into exactly one canonical record. Never fails: required
/// identifiers fall back to a generated placeholder and malformed dates fall
/// back to `now`, so a bad row cannot abort ingestion of the rest.
pub(crate) fn normalize_row(
    row: &HashMap<String, String>,
    row_index: usize,
    batch_id: u64,
    now: NaiveDateTime,
) -> WorkOrder {
    let order_number = mapping::resolve(row, Field::OrderNumber)
        .map(|value| value.to_string())
        .unwrap_or_else(|| format!("SEM-OS-{:04}", row_index + 1));

    let status = mapping::resolve(row, Field::Status)
        .map(fold_text)
        .unwrap_or_default();

    let service_type = mapping::resolve(row, Field::ServiceType)
        .unwrap_or_default()
        .to_string();

    let opened_at = mapping::resolve(row, Field::OpenedAt)
        .and_then(parse_datetime)
        .unwrap_or(now);

    let status_changed_at = mapping::resolve(row, Field::StatusChangedAt).and_then(parse_datetime);

    let technical_area = classifier::classify(&service_type);
    let days_open = days_open(opened_at, &status, status_changed_at, now);

    let optional = |field: Field| mapping::resolve(row, field).map(|value| value.to_string());

    WorkOrder {
        order_number,
        status,
        service_type,
        company: optional(Field::Company),
        opened_at,
        status_changed_at,
        district: mapping::resolve(row, Field::District)
            .unwrap_or_default()
            .to_string(),
        neighborhood: optional(Field::Neighborhood),
        street: optional(Field::Street),
        street_number: optional(Field::StreetNumber),
        zip_code: optional(Field::ZipCode),
        technical_area,
        days_open,
        batch_id,
    }
}
