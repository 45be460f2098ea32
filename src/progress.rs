//! Progress-callback trait for per-job pipeline events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::ServiceConfigBuilder::progress_callback`] to observe
//! each job as it moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docparse::{JobProgressCallback, ServiceConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl JobProgressCallback for CountingCallback {
//!     fn on_job_complete(&self, _job_id: &str, doc_name: &str, content_len: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{doc_name}: {content_len} bytes");
//!     }
//! }
//!
//! let config = ServiceConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::Stage;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Called by the orchestrator as it drives a job.
///
/// Implementations must be `Send + Sync`: jobs from concurrent requests
/// report through the same instance. All methods default to no-ops.
pub trait JobProgressCallback: Send + Sync {
    /// Called once the workspace is allocated.
    fn on_job_start(&self, job_id: &str, doc_name: &str) {
        let _ = (job_id, doc_name);
    }

    /// Called just before an external stage is invoked.
    fn on_stage_start(&self, job_id: &str, stage: Stage) {
        let _ = (job_id, stage);
    }

    /// Called when an external stage finishes successfully.
    fn on_stage_complete(&self, job_id: &str, stage: Stage, elapsed_ms: u64) {
        let _ = (job_id, stage, elapsed_ms);
    }

    /// Called when the job produced its final content.
    fn on_job_complete(&self, job_id: &str, doc_name: &str, content_len: usize) {
        let _ = (job_id, doc_name, content_len);
    }

    /// Called when the job failed; `error` is the rendered error message.
    fn on_job_error(&self, job_id: &str, doc_name: &str, error: &str) {
        let _ = (job_id, doc_name, error);
    }
}

/// A no-op implementation for callers that don't need job events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Forwards every event to `tracing`. Installed by the server binary.
pub struct TracingProgressCallback;

impl JobProgressCallback for TracingProgressCallback {
    fn on_job_start(&self, job_id: &str, doc_name: &str) {
        info!(job_id, doc_name, "job started");
    }

    fn on_stage_start(&self, job_id: &str, stage: Stage) {
        debug!(job_id, %stage, "stage started");
    }

    fn on_stage_complete(&self, job_id: &str, stage: Stage, elapsed_ms: u64) {
        info!(job_id, %stage, elapsed_ms, "stage complete");
    }

    fn on_job_complete(&self, job_id: &str, doc_name: &str, content_len: usize) {
        info!(job_id, doc_name, content_len, "job complete");
    }

    fn on_job_error(&self, job_id: &str, doc_name: &str, error: &str) {
        warn!(job_id, doc_name, error, "job failed");
    }
}

/// Convenience alias matching the type stored in [`crate::config::ServiceConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;
