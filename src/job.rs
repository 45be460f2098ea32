//! Job input and output types.

use crate::config::{OutputFormat, ParseOptions};
use crate::error::DocParseError;
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// What a job converts.
#[derive(Debug, Clone)]
pub enum JobInput {
    /// A file already on the server's filesystem. Stage A writes its PDF
    /// next to it, not into the workspace.
    Path(PathBuf),
    /// An uploaded body, persisted into the workspace before any stage runs.
    Upload { filename: String, bytes: Vec<u8> },
}

impl JobInput {
    /// The file name the document is known by.
    pub fn file_name(&self) -> Result<String, DocParseError> {
        match self {
            JobInput::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    DocParseError::InvalidInput(format!("'{}' has no file name", p.display()))
                }),
            JobInput::Upload { filename, .. } => sanitize_upload_name(filename),
        }
    }
}

/// Logical document name: the file name without its final extension.
pub fn doc_name(file_name: &str) -> Result<String, DocParseError> {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if stem.is_empty() {
        return Err(DocParseError::InvalidInput(format!(
            "cannot derive a document name from '{file_name}'"
        )));
    }
    Ok(stem)
}

/// Reduce a client-supplied upload name to a bare file name.
///
/// Directory components are dropped so the upload always lands directly in
/// the workspace. Names that reduce to nothing are rejected.
pub fn sanitize_upload_name(raw: &str) -> Result<String, DocParseError> {
    // Browsers on Windows may send `C:\Users\me\report.docx`.
    let unified = raw.replace('\\', "/");
    let name = Path::new(&unified)
        .components()
        .filter_map(|c| match c {
            Component::Normal(n) => Some(n.to_string_lossy().into_owned()),
            _ => None,
        })
        .last()
        .unwrap_or_default();
    if name.is_empty() {
        return Err(DocParseError::InvalidInput(format!(
            "upload file name '{raw}' is not usable"
        )));
    }
    Ok(name)
}

/// One conversion request, bound to the workspace named by `id`.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    /// Bare file name the document arrived under.
    pub file_name: String,
    /// `file_name` minus its final extension; keys the artifact and results.
    pub doc_name: String,
    pub options: ParseOptions,
}

/// Timings for one job.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobStats {
    /// Whether Stage A actually invoked the converter.
    pub converted: bool,
    pub normalize_ms: u64,
    pub extract_ms: u64,
    pub total_ms: u64,
}

/// Result of a successful job.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutput {
    pub job_id: String,
    pub doc_name: String,
    pub workspace: PathBuf,
    pub format: OutputFormat,
    /// Raw Markdown, or single-line HTML when `format` is `Html`.
    pub content: String,
    pub stats: JobStats,
}
