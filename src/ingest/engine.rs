use std::time::Duration;

use serde::Serialize;
use tracing::warn;

use super::progress::{EtaTracker, ProgressNotifier, ProgressUpdate};
use crate::config::IngestSettings;
use crate::domain::WorkOrder;
use crate::store::WorkOrderStore;

/// One chunk the store refused. Offsets are indexes into the normalized
/// record array, so callers can map a failure back to spreadsheet rows.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkFailure {
    pub offset: usize,
    pub len: usize,
    pub error: String,
}

/// Outcome of a batched upsert run.
///
/// `qty_valid < qty_processed` means some chunks were skipped; the failures
/// themselves are listed so callers can decide whether a partial ingest is
/// acceptable instead of diffing counters against a log.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub batch_id: u64,
    /// Rows that went through normalization and were offered to the store.
    pub qty_processed: usize,
    /// Rows committed through successful chunk upserts.
    pub qty_valid: usize,
    pub failed_chunks: Vec<ChunkFailure>,
    #[serde(serialize_with = "serialize_duration_secs")]
    pub elapsed: Duration,
    /// False when the final counter write to the batch row failed. Ingested
    /// rows are never rolled back on that path.
    pub metadata_persisted: bool,
}

fn serialize_duration_secs<S: serde::Serializer>(
    value: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(value.as_secs_f64())
}

/// Sequential chunked upsert over a [`WorkOrderStore`].
///
/// Chunks are upserted strictly in input order, one store round-trip at a
/// time, so the store's per-key conflict resolution stays deterministic
/// (later occurrence of an order number wins) and ETA accounting stays
/// meaningful. A failed chunk is recorded and skipped; the run continues.
pub struct BatchUpsertEngine<'a, S: WorkOrderStore + ?Sized, N: ProgressNotifier + ?Sized> {
    store: &'a S,
    notifier: &'a N,
    settings: IngestSettings,
}

impl<'a, S: WorkOrderStore + ?Sized, N: ProgressNotifier + ?Sized> BatchUpsertEngine<'a, S, N> {
    pub fn new(store: &'a S, notifier: &'a N, settings: IngestSettings) -> Self {
        Self {
            store,
            notifier,
            settings,
        }
    }

    pub fn run(&self, batch_id: u64, records: &[WorkOrder]) -> IngestionReport {
        let chunk_size = self.settings.chunk_size.max(1);
        let mut tracker = EtaTracker::new(records.len());
        let mut qty_valid = 0usize;
        let mut failed_chunks = Vec::new();

        let total_chunks = records.len().div_ceil(chunk_size);
        for (chunk_index, chunk) in records.chunks(chunk_size).enumerate() {
            let offset = chunk_index * chunk_size;
            match self.store.upsert_orders(chunk) {
                Ok(written) => {
                    qty_valid += written;
                }
                Err(error) => {
                    warn!(
                        batch_id,
                        chunk = chunk_index,
                        offset,
                        len = chunk.len(),
                        %error,
                        "chunk upsert failed, skipping"
                    );
                    failed_chunks.push(ChunkFailure {
                        offset,
                        len: chunk.len(),
                        error: error.to_string(),
                    });
                }
            }

            tracker.record_chunk(chunk.len());
            self.notifier.notify(ProgressUpdate {
                percent: tracker.percent(),
                message: format!(
                    "processed chunk {}/{} ({} of {} rows)",
                    chunk_index + 1,
                    total_chunks,
                    offset + chunk.len(),
                    records.len()
                ),
                eta_seconds: tracker.eta_seconds(),
            });
        }

        let metadata_persisted =
            match self
                .store
                .finalize_batch(batch_id, records.len(), qty_valid)
            {
                Ok(()) => true,
                Err(error) => {
                    warn!(batch_id, %error, "failed to finalize batch counters");
                    false
                }
            };

        IngestionReport {
            batch_id,
            qty_processed: records.len(),
            qty_valid,
            failed_chunks,
            elapsed: tracker.elapsed(),
            metadata_persisted,
        }
    }
}
