use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse operational category derived from the free-text service type.
///
/// The upstream SGZ taxonomy is free text; reporting only distinguishes these
/// two areas plus an "unclassified" bucket (`None`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalArea {
    ParksAndGreenery,
    Maintenance,
}

impl TechnicalArea {
    pub const fn ordered() -> [Self; 2] {
        [Self::ParksAndGreenery, Self::Maintenance]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::ParksAndGreenery => "Parques e Áreas Verdes",
            Self::Maintenance => "Manutenção e Conservação",
        }
    }

    /// Label used when a work order carries no technical area.
    pub const UNCLASSIFIED_LABEL: &'static str = "Não classificado";
}

/// Status codes the upstream system uses for finished orders.
///
/// Free text in the export; compared after uppercase/accent folding.
const COMPLETED_STATUSES: &[&str] = &["CONCLUIDA", "CONCLUIDO", "ENCERRADA", "EXECUTADA", "FINALIZADA"];

/// Whether a (normalized, uppercase) status code denotes a finished order.
pub fn is_completed_status(status: &str) -> bool {
    COMPLETED_STATUSES.contains(&status)
}

/// One normalized municipal service-order record.
///
/// `order_number` is the natural key: re-ingesting the same number updates the
/// existing row instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkOrder {
    pub order_number: String,
    /// Free-text status code from the source system, uppercased.
    pub status: String,
    pub service_type: String,
    pub company: Option<String>,
    pub opened_at: NaiveDateTime,
    pub status_changed_at: Option<NaiveDateTime>,
    pub district: String,
    pub neighborhood: Option<String>,
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub zip_code: Option<String>,
    /// Derived at ingestion time; not re-derived unless the row is re-ingested.
    pub technical_area: Option<TechnicalArea>,
    /// Whole days the order has been (or was) open, at least 1.
    pub days_open: i64,
    pub batch_id: u64,
}

impl WorkOrder {
    pub fn is_completed(&self) -> bool {
        is_completed_status(&self.status)
    }
}

/// One ingestion run of a single uploaded spreadsheet file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    pub id: u64,
    pub filename: String,
    pub uploaded_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub processed: bool,
    pub qty_processed: Option<usize>,
    pub qty_valid: Option<usize>,
}

/// Fields supplied when opening a batch; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewUploadBatch {
    pub filename: String,
    pub uploaded_by: Option<String>,
}
