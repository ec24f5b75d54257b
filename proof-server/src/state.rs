//! Application State
//!
//! Shared state for the proof server, accessible from all route handlers.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::services::{CommitmentHasher, PipelineConfig, ProofPipeline};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Badge proof pipeline
    pipeline: ProofPipeline,
    /// Donation commitment hasher
    hasher: CommitmentHasher,
    /// Request ids waiting for or holding the pipeline
    proof_queue: Mutex<Vec<String>>,
    successful_proofs: AtomicU64,
    failed_proofs: AtomicU64,
    /// Server start time
    start_time: Instant,
    started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new application state
    pub fn new(pipeline_config: PipelineConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                pipeline: ProofPipeline::new(pipeline_config),
                hasher: CommitmentHasher::new(),
                proof_queue: Mutex::new(Vec::new()),
                successful_proofs: AtomicU64::new(0),
                failed_proofs: AtomicU64::new(0),
                start_time: Instant::now(),
                started_at: Utc::now(),
            }),
        }
    }

    pub fn pipeline(&self) -> &ProofPipeline {
        &self.inner.pipeline
    }

    pub fn hasher(&self) -> &CommitmentHasher {
        &self.inner.hasher
    }

    fn queue(&self) -> MutexGuard<'_, Vec<String>> {
        self.inner
            .proof_queue
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Get current proof queue length
    pub fn proof_queue_length(&self) -> usize {
        self.queue().len()
    }

    /// Add a proof request to the queue. The entry is removed when the
    /// returned ticket drops, including when the request is cancelled.
    pub fn enqueue_proof(&self, id: String) -> QueueTicket {
        self.queue().push(id.clone());
        QueueTicket {
            state: self.clone(),
            id,
        }
    }

    fn dequeue_proof(&self, id: &str) {
        self.queue().retain(|x| x != id);
    }

    /// Count a finished pipeline run
    pub fn record_result(&self, success: bool) {
        let counter = if success {
            &self.inner.successful_proofs
        } else {
            &self.inner.failed_proofs
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn successful_proofs(&self) -> u64 {
        self.inner.successful_proofs.load(Ordering::Relaxed)
    }

    pub fn failed_proofs(&self) -> u64 {
        self.inner.failed_proofs.load(Ordering::Relaxed)
    }

    /// Get server uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.inner.start_time.elapsed().as_secs()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.inner.started_at
    }
}

/// Queue entry for one in-flight proof request
pub struct QueueTicket {
    state: AppState,
    id: String,
}

impl QueueTicket {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        self.state.dequeue_proof(&self.id);
    }
}
