//! The work-order ingestion pipeline: file → parser → normalizer (+
//! classifier) → batch upsert engine → store.

pub mod engine;
pub mod progress;
pub mod sgz;

use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::Local;
use tracing::info;

use crate::config::IngestSettings;
use crate::domain::NewUploadBatch;
use crate::store::{StoreError, WorkOrderStore};
use self::engine::{BatchUpsertEngine, IngestionReport};
use self::progress::ProgressNotifier;
use self::sgz::parser::{self, ParseError, SheetRows};
use self::sgz::ValidationError;

#[derive(Debug)]
pub enum IngestError {
    /// File unreadable or structurally empty. Fatal; no state was created.
    Parse(ParseError),
    /// Required columns missing. Fatal; raised before any batch row exists.
    Validation(ValidationError),
    /// The store refused to open the batch row. Fatal; nothing was ingested.
    Store(StoreError),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Parse(err) => write!(f, "could not parse upload: {}", err),
            IngestError::Validation(err) => write!(f, "upload rejected: {}", err),
            IngestError::Store(err) => write!(f, "could not open upload batch: {}", err),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IngestError::Parse(err) => Some(err),
            IngestError::Validation(err) => Some(err),
            IngestError::Store(err) => Some(err),
        }
    }
}

impl From<ParseError> for IngestError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}

impl From<ValidationError> for IngestError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<StoreError> for IngestError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Explicit ingestion context: store, notifier, and tunables travel together
/// so concurrent runs and test harnesses never share hidden state.
pub struct IngestionService<'a, S: WorkOrderStore + ?Sized, N: ProgressNotifier + ?Sized> {
    store: &'a S,
    notifier: &'a N,
    settings: IngestSettings,
}

impl<'a, S: WorkOrderStore + ?Sized, N: ProgressNotifier + ?Sized> IngestionService<'a, S, N> {
    pub fn new(store: &'a S, notifier: &'a N, settings: IngestSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    /// Ingest a spreadsheet file from disk (xlsx/xls or CSV by extension).
    pub fn ingest_path(
        &self,
        path: &Path,
        uploaded_by: Option<String>,
    ) -> Result<IngestionReport, IngestError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let sheet = parser::parse_path(path)?;
        self.ingest_sheet(sheet, filename, uploaded_by)
    }

    /// Ingest CSV content already in memory (the inline upload body shape).
    pub fn ingest_csv<R: Read>(
        &self,
        reader: R,
        filename: String,
        uploaded_by: Option<String>,
    ) -> Result<IngestionReport, IngestError> {
        let sheet = parser::parse_csv(reader)?;
        self.ingest_sheet(sheet, filename, uploaded_by)
    }

    fn ingest_sheet(
        &self,
        sheet: SheetRows,
        filename: String,
        uploaded_by: Option<String>,
    ) -> Result<IngestionReport, IngestError> {
        sgz::validate_headers(&sheet)?;

        let batch = self.store.create_batch(NewUploadBatch {
            filename: filename.clone(),
            uploaded_by,
        })?;

        let now = Local::now().naive_local();
        let records = sgz::normalize_sheet(&sheet, batch.id, now);

        info!(
            batch_id = batch.id,
            filename = %filename,
            rows = records.len(),
            chunk_size = self.settings.chunk_size,
            "starting batch upsert"
        );

        let engine = BatchUpsertEngine::new(self.store, self.notifier, self.settings);
        let report = engine.run(batch.id, &records);

        info!(
            batch_id = report.batch_id,
            qty_processed = report.qty_processed,
            qty_valid = report.qty_valid,
            failed_chunks = report.failed_chunks.len(),
            "ingestion finished"
        );

        Ok(report)
    }
}
