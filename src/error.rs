//! Error types for the edgequake-docparse library.
//!
//! Every failure a job can hit is one variant of [`DocParseError`]. The
//! variants are grouped by the stage that raises them, and
//! [`DocParseError::kind`] folds them into the coarse [`FaultKind`] taxonomy
//! the HTTP layer reports to clients.
//!
//! No fault is fatal to the process: a job error ends that job only, and the
//! retention sweeper logs and swallows its own per-entry failures instead of
//! returning them.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-docparse library.
#[derive(Debug, Error)]
pub enum DocParseError {
    // ── Workspace errors ──────────────────────────────────────────────────
    /// A workspace directory could not be created or removed.
    #[error("Workspace storage failure at '{path}': {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Stage A ───────────────────────────────────────────────────────────
    /// The office-to-PDF converter exited non-zero or left no PDF behind.
    #[error("Failed to convert '{input}' to PDF: {detail}")]
    Conversion { input: PathBuf, detail: String },

    // ── Stage B ───────────────────────────────────────────────────────────
    /// The extraction engine exited with a failure status.
    ///
    /// `code` is `None` when the child was terminated by a signal.
    #[error("Extraction failed for '{input}' (exit code {}): {detail}", display_code(.code))]
    Extraction {
        input: PathBuf,
        code: Option<i32>,
        detail: String,
    },

    /// Extraction reported success but the expected artifact does not exist.
    #[error("Extraction produced no artifact at '{path}'")]
    ArtifactMissing { path: PathBuf },

    /// An external stage did not finish within its configured timeout.
    #[error("{stage} stage timed out after {secs}s")]
    StageTimeout { stage: Stage, secs: u64 },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Any other read/write failure against a workspace.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Request errors ────────────────────────────────────────────────────
    /// The request named something that cannot be processed.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => c.to_string(),
        None => "signal".to_string(),
    }
}

/// The external stages a job runs through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Office document → PDF.
    Normalize,
    /// PDF → Markdown via the extraction engine.
    Extract,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Normalize => f.write_str("Normalize"),
            Stage::Extract => f.write_str("Extract"),
        }
    }
}

/// Coarse fault taxonomy surfaced at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    StorageFault,
    ConversionFault,
    ExtractionFault,
    ArtifactMissing,
    Timeout,
    IoFault,
    InvalidInput,
    Internal,
}

impl FaultKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultKind::StorageFault => "storage_fault",
            FaultKind::ConversionFault => "conversion_fault",
            FaultKind::ExtractionFault => "extraction_fault",
            FaultKind::ArtifactMissing => "artifact_missing",
            FaultKind::Timeout => "timeout",
            FaultKind::IoFault => "io_fault",
            FaultKind::InvalidInput => "invalid_input",
            FaultKind::Internal => "internal",
        }
    }
}

impl DocParseError {
    /// Fold this error into the request-level taxonomy.
    pub fn kind(&self) -> FaultKind {
        match self {
            DocParseError::Storage { .. } => FaultKind::StorageFault,
            DocParseError::Conversion { .. } => FaultKind::ConversionFault,
            DocParseError::Extraction { .. } => FaultKind::ExtractionFault,
            DocParseError::ArtifactMissing { .. } => FaultKind::ArtifactMissing,
            DocParseError::StageTimeout { .. } => FaultKind::Timeout,
            DocParseError::Io { .. } => FaultKind::IoFault,
            DocParseError::InvalidInput(_) => FaultKind::InvalidInput,
            DocParseError::InvalidConfig(_) | DocParseError::Internal(_) => FaultKind::Internal,
        }
    }

    /// Exit code of the failed extraction child, if this is an extraction fault.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            DocParseError::Extraction { code, .. } => *code,
            _ => None,
        }
    }
}
