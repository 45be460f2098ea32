//! Job orchestration: one workspace, two stages, one artifact.
//!
//! ```text
//! allocate ──▶ persist upload ──▶ normalize ──▶ extract ──▶ read ──▶ render?
//! ```
//!
//! Stages run strictly in that order and the first error ends the job.
//! Workspaces are never deleted here, on success or failure; they stay on
//! disk for post-hoc inspection until the retention sweeper expires them.

use crate::config::{OutputFormat, ParseOptions, ServiceConfig};
use crate::error::{DocParseError, Stage};
use crate::job::{doc_name, Job, JobInput, JobOutput, JobStats};
use crate::pipeline::extract::{ExtractionEngine, MineruEngine};
use crate::pipeline::normalize::{self, DocumentConverter, LibreOfficeConverter};
use crate::pipeline::{locate, render};
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::workspace::{WorkspaceHandle, WorkspaceStore};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Drives jobs against a shared [`WorkspaceStore`].
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct Orchestrator {
    store: WorkspaceStore,
    converter: Arc<dyn DocumentConverter>,
    engine: Arc<dyn ExtractionEngine>,
    progress: ProgressCallback,
}

impl Orchestrator {
    pub fn new(
        store: WorkspaceStore,
        converter: Arc<dyn DocumentConverter>,
        engine: Arc<dyn ExtractionEngine>,
    ) -> Self {
        Self {
            store,
            converter,
            engine,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    /// Build an orchestrator with the real LibreOffice and MinerU stages.
    pub async fn from_config(config: &ServiceConfig) -> Result<Self, DocParseError> {
        let store = WorkspaceStore::open(&config.workspace_root).await?;
        let mut orchestrator = Self::new(
            store,
            Arc::new(LibreOfficeConverter::new(config.converter.clone())),
            Arc::new(MineruEngine::new(config.extractor.clone())),
        );
        if let Some(ref cb) = config.progress_callback {
            orchestrator = orchestrator.with_progress(Arc::clone(cb));
        }
        Ok(orchestrator)
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    pub fn store(&self) -> &WorkspaceStore {
        &self.store
    }

    /// Run one job to completion.
    pub async fn run_job(
        &self,
        input: JobInput,
        options: &ParseOptions,
    ) -> Result<JobOutput, DocParseError> {
        let start = Instant::now();
        let file_name = input.file_name()?;
        let name = doc_name(&file_name)?;

        let workspace = self.store.allocate().await?;
        let job = Job {
            id: workspace.id().to_string(),
            file_name,
            doc_name: name,
            options: options.clone(),
        };
        self.progress.on_job_start(&job.id, &job.doc_name);

        match self.run_stages(&job, &workspace, input, start).await {
            Ok(output) => {
                self.progress
                    .on_job_complete(&job.id, &job.doc_name, output.content.len());
                Ok(output)
            }
            Err(e) => {
                self.progress
                    .on_job_error(&job.id, &job.doc_name, &e.to_string());
                Err(e)
            }
        }
    }

    async fn run_stages(
        &self,
        job: &Job,
        workspace: &WorkspaceHandle,
        input: JobInput,
        start: Instant,
    ) -> Result<JobOutput, DocParseError> {
        let job_id = job.id.as_str();
        let source = match input {
            JobInput::Path(path) => path,
            JobInput::Upload { bytes, .. } => {
                persist_upload(workspace, &job.file_name, &bytes).await?
            }
        };

        let mut stats = JobStats {
            converted: normalize::is_office_document(&source),
            ..JobStats::default()
        };

        // ── Stage A ──────────────────────────────────────────────────────
        self.progress.on_stage_start(job_id, Stage::Normalize);
        let stage_start = Instant::now();
        let pdf =
            normalize::normalize(self.converter.as_ref(), &source, workspace.path()).await?;
        stats.normalize_ms = stage_start.elapsed().as_millis() as u64;
        self.progress
            .on_stage_complete(job_id, Stage::Normalize, stats.normalize_ms);

        // ── Stage B ──────────────────────────────────────────────────────
        self.progress.on_stage_start(job_id, Stage::Extract);
        let stage_start = Instant::now();
        self.engine
            .extract(&pdf, workspace.path(), &job.options)
            .await?;
        stats.extract_ms = stage_start.elapsed().as_millis() as u64;
        self.progress
            .on_stage_complete(job_id, Stage::Extract, stats.extract_ms);

        // ── Artifact ─────────────────────────────────────────────────────
        let artifact = locate::locate(workspace.path(), &job.doc_name);
        debug!("Reading artifact {}", artifact.display());
        let markdown = locate::read_artifact(&artifact).await?;

        let content = match job.options.output_format {
            OutputFormat::Html => render::markdown_to_html(&markdown),
            OutputFormat::Markdown => markdown,
        };

        stats.total_ms = start.elapsed().as_millis() as u64;
        info!(
            job_id,
            doc_name = %job.doc_name,
            total_ms = stats.total_ms,
            "Job finished"
        );

        Ok(JobOutput {
            job_id: job.id.clone(),
            doc_name: job.doc_name.clone(),
            workspace: workspace.path().to_path_buf(),
            format: job.options.output_format,
            content,
            stats,
        })
    }

    /// Process server-local paths one after another.
    ///
    /// The first failing entry aborts the whole batch; entries after it are
    /// never started and earlier results are discarded. Two paths with the
    /// same document name collapse to the later one.
    pub async fn run_batch(
        &self,
        paths: &[PathBuf],
        options: &ParseOptions,
    ) -> Result<BTreeMap<String, String>, DocParseError> {
        let mut results = BTreeMap::new();
        for path in paths {
            let output = self.run_job(JobInput::Path(path.clone()), options).await?;
            results.insert(output.doc_name, output.content);
        }
        Ok(results)
    }
}

/// Sub-directory of the workspace that receives uploaded bodies.
///
/// Keeps the upload apart from the engine's `<ws>/<doc-name>/` output
/// directory, which would collide with an extensionless upload name.
pub const UPLOAD_SUBDIR: &str = "input";

async fn persist_upload(
    workspace: &WorkspaceHandle,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, DocParseError> {
    let dir = workspace.path().join(UPLOAD_SUBDIR);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|source| DocParseError::Io {
            path: dir.clone(),
            source,
        })?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| DocParseError::Io {
            path: path.clone(),
            source,
        })?;
    debug!("Persisted upload {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}
