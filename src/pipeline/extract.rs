//! Stage B: run the document-understanding engine over a PDF.
//!
//! The engine is invoked exactly once per job. There is no retry: a failing
//! run fails the job and leaves the workspace in place for inspection.

use crate::config::{ExtractorSettings, ParseOptions, MODEL_SOURCE_ENV};
use crate::error::{DocParseError, Stage};
use crate::pipeline::command::{self, CommandFailure, Invocation};
use async_trait::async_trait;
use std::path::Path;
use tracing::{error, info};

/// Extracts structured Markdown from a PDF into an output directory.
///
/// On success the engine must have populated
/// `<out_dir>/<doc-name>/auto/<doc-name>.md` (see [`crate::pipeline::locate`]).
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    async fn extract(
        &self,
        pdf: &Path,
        out_dir: &Path,
        options: &ParseOptions,
    ) -> Result<(), DocParseError>;
}

/// MinerU command-line engine.
#[derive(Debug, Clone, Default)]
pub struct MineruEngine {
    settings: ExtractorSettings,
}

impl MineruEngine {
    pub fn new(settings: ExtractorSettings) -> Self {
        Self { settings }
    }

    fn invocation(&self, pdf: &Path, out_dir: &Path, options: &ParseOptions) -> Invocation {
        let mut inv = Invocation::new(&self.settings.command)
            .arg("-p")
            .arg(pdf)
            .arg("-o")
            .arg(out_dir)
            .arg("-l")
            .arg(&options.lang)
            .arg("-b")
            .arg(&options.backend)
            .arg("-m")
            .arg(&options.method);
        if let Some(ref source) = self.settings.source {
            inv = inv.arg("--source").arg(source);
        }
        if let Some(ref model_source) = self.settings.model_source {
            inv = inv.env(MODEL_SOURCE_ENV, model_source);
        }
        inv
    }
}

#[async_trait]
impl ExtractionEngine for MineruEngine {
    async fn extract(
        &self,
        pdf: &Path,
        out_dir: &Path,
        options: &ParseOptions,
    ) -> Result<(), DocParseError> {
        let invocation = self.invocation(pdf, out_dir, options);
        info!("Running extraction: {}", invocation.display());

        let outcome = match command::run(&invocation, self.settings.timeout).await {
            Ok(outcome) => outcome,
            Err(CommandFailure::TimedOut) => {
                return Err(DocParseError::StageTimeout {
                    stage: Stage::Extract,
                    secs: self.settings.timeout.as_secs(),
                })
            }
            Err(CommandFailure::Spawn(e)) => {
                return Err(DocParseError::Extraction {
                    input: pdf.to_path_buf(),
                    code: None,
                    detail: format!("cannot start '{}': {}", invocation.display(), e),
                })
            }
        };

        if !outcome.success() {
            error!(
                "Extraction failed for {} (exit {:?})\nstderr: {}",
                pdf.display(),
                outcome.code,
                outcome.stderr
            );
            return Err(DocParseError::Extraction {
                input: pdf.to_path_buf(),
                code: outcome.code,
                detail: last_line(&outcome.stderr),
            });
        }

        info!(
            "Extraction finished for {} in {}ms",
            pdf.display(),
            outcome.elapsed_ms
        );
        Ok(())
    }
}

/// Last non-empty line of the engine's stderr; usually the actual error.
fn last_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("")
        .trim()
        .to_string()
}
