use std::time::Instant;

use serde::Serialize;
use tracing::info;

/// Snapshot pushed to the user-facing notifier after each chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    /// 0..=100, measured in rows attempted over total rows.
    pub percent: u8,
    pub message: String,
    /// Smoothed estimate; absent until at least one chunk has completed.
    pub eta_seconds: Option<u64>,
}

/// Boundary to whatever surfaces progress to the user (toast, log line, SSE).
/// The pipeline only produces updates; delivery is the collaborator's problem.
pub trait ProgressNotifier: Send + Sync {
    fn notify(&self, update: ProgressUpdate);
}

/// Notifier that drops every update. Useful for tests and one-shot callers.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl ProgressNotifier for NullNotifier {
    fn notify(&self, _update: ProgressUpdate) {}
}

/// Notifier that reports through tracing, for CLI and server runs.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl ProgressNotifier for LogNotifier {
    fn notify(&self, update: ProgressUpdate) {
        match update.eta_seconds {
            Some(eta) => info!(percent = update.percent, eta_seconds = eta, "{}", update.message),
            None => info!(percent = update.percent, "{}", update.message),
        }
    }
}

/// Running ETA accounting for a chunked run.
///
/// The per-row pace is measured from cumulative elapsed time over every row
/// attempted so far, not just the latest chunk, so one slow or fast chunk
/// does not make the estimate jitter.
#[derive(Debug)]
pub(crate) struct EtaTracker {
    started: Instant,
    total_rows: usize,
    attempted_rows: usize,
}

impl EtaTracker {
    pub(crate) fn new(total_rows: usize) -> Self {
        Self {
            started: Instant::now(),
            total_rows,
            attempted_rows: 0,
        }
    }

    pub(crate) fn record_chunk(&mut self, rows: usize) {
        self.attempted_rows += rows;
    }

    pub(crate) fn eta_seconds(&self) -> Option<u64> {
        if self.attempted_rows == 0 {
            return None;
        }
        let elapsed = self.started.elapsed().as_secs_f64();
        let per_row = elapsed / self.attempted_rows as f64;
        let remaining = self.total_rows.saturating_sub(self.attempted_rows);
        Some((per_row * remaining as f64).round() as u64)
    }

    pub(crate) fn elapsed(&self) -> std::time::Duration {
        self.started.elapsed()
    }

    pub(crate) fn percent(&self) -> u8 {
        if self.total_rows == 0 {
            return 100;
        }
        let ratio = self.attempted_rows as f64 / self.total_rows as f64;
        (ratio * 100.0).round().min(100.0) as u8
    }
}
