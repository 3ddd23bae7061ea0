use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::domain::{NewUploadBatch, UploadBatch, WorkOrder};

/// Storage abstraction over the hosted work-order tables.
///
/// The ingestion engine and the dashboard builder compose over this trait so
/// they can be exercised against an in-memory store in tests and demos.
pub trait WorkOrderStore: Send + Sync {
    /// Open an upload batch row before any orders are persisted.
    fn create_batch(&self, batch: NewUploadBatch) -> Result<UploadBatch, StoreError>;

    /// Record final counters and mark the batch processed.
    fn finalize_batch(
        &self,
        batch_id: u64,
        qty_processed: usize,
        qty_valid: usize,
    ) -> Result<(), StoreError>;

    /// Delete a batch and every work order ingested under it.
    /// Returns the number of orders removed.
    fn delete_batch(&self, batch_id: u64) -> Result<usize, StoreError>;

    fn batches(&self) -> Result<Vec<UploadBatch>, StoreError>;

    /// Insert-or-update each order keyed on its order number. A duplicate key
    /// overwrites the existing row's mutable fields (later write wins).
    /// Returns the number of rows written.
    fn upsert_orders(&self, orders: &[WorkOrder]) -> Result<usize, StoreError>;

    fn orders(&self) -> Result<Vec<WorkOrder>, StoreError>;

    fn order_count(&self) -> Result<usize, StoreError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("batch {0} not found")]
    BatchNotFound(u64),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct MemoryState {
    next_batch_id: u64,
    batches: Vec<UploadBatch>,
    /// Insertion-ordered so aggregation sees orders in encounter order.
    orders: Vec<WorkOrder>,
    index_by_number: HashMap<String, usize>,
}

/// In-memory store backing the server, the CLI, and the test suites.
///
/// Upsert-by-natural-key is the only consistency mechanism; there is no
/// transaction spanning multiple chunks, matching the remote store it stands
/// in for.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store poisoned".to_string()))
    }
}

impl WorkOrderStore for MemoryStore {
    fn create_batch(&self, batch: NewUploadBatch) -> Result<UploadBatch, StoreError> {
        let mut state = self.lock()?;
        state.next_batch_id += 1;
        let row = UploadBatch {
            id: state.next_batch_id,
            filename: batch.filename,
            uploaded_by: batch.uploaded_by,
            submitted_at: Utc::now(),
            processed: false,
            qty_processed: None,
            qty_valid: None,
        };
        state.batches.push(row.clone());
        Ok(row)
    }

    fn finalize_batch(
        &self,
        batch_id: u64,
        qty_processed: usize,
        qty_valid: usize,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let batch = state
            .batches
            .iter_mut()
            .find(|batch| batch.id == batch_id)
            .ok_or(StoreError::BatchNotFound(batch_id))?;
        batch.processed = true;
        batch.qty_processed = Some(qty_processed);
        batch.qty_valid = Some(qty_valid);
        Ok(())
    }

    fn delete_batch(&self, batch_id: u64) -> Result<usize, StoreError> {
        let mut guard = self.lock()?;
        let state = &mut *guard;
        let position = state
            .batches
            .iter()
            .position(|batch| batch.id == batch_id)
            .ok_or(StoreError::BatchNotFound(batch_id))?;
        state.batches.remove(position);

        let before = state.orders.len();
        state.orders.retain(|order| order.batch_id != batch_id);
        let removed = before - state.orders.len();

        state.index_by_number = state
            .orders
            .iter()
            .enumerate()
            .map(|(idx, order)| (order.order_number.clone(), idx))
            .collect();

        Ok(removed)
    }

    fn batches(&self) -> Result<Vec<UploadBatch>, StoreError> {
        Ok(self.lock()?.batches.clone())
    }

    fn upsert_orders(&self, orders: &[WorkOrder]) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        for order in orders {
            let existing = state.index_by_number.get(&order.order_number).copied();
            match existing {
                Some(idx) => state.orders[idx] = order.clone(),
                None => {
                    let idx = state.orders.len();
                    state.orders.push(order.clone());
                    state
                        .index_by_number
                        .insert(order.order_number.clone(), idx);
                }
            }
        }
        Ok(orders.len())
    }

    fn orders(&self) -> Result<Vec<WorkOrder>, StoreError> {
        Ok(self.lock()?.orders.clone())
    }

    fn order_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.orders.len())
    }
}
