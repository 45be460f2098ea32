//! # edgequake-docparse
//!
//! Turn office documents and PDFs into Markdown (or HTML) by driving two
//! external tools: a headless office suite for office → PDF, and a layout
//! extraction engine for PDF → Markdown.
//!
//! Every job gets its own workspace directory under a shared root. Nothing
//! is cleaned up when a job finishes; a background sweeper removes
//! workspaces once they outlive a TTL, so failed jobs stay inspectable.
//!
//! ## Job Lifecycle
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Allocate  fresh <root>/<uuid>/ workspace
//!  ├─ 2. Persist   uploaded bytes → <ws>/input/<filename>
//!  ├─ 3. Stage A   .doc/.docx/.xls/.xlsx → PDF (libreoffice --headless)
//!  ├─ 4. Stage B   PDF → <ws>/<name>/auto/<name>.md (mineru)
//!  ├─ 5. Read      the Markdown artifact
//!  └─ 6. Render    Markdown → single-line HTML, when asked
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docparse::{JobInput, Orchestrator, ParseOptions, ServiceConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServiceConfig::builder().workspace_root("/tmp/docparse").build()?;
//!     let orchestrator = Orchestrator::from_config(&config).await?;
//!     let output = orchestrator
//!         .run_job(JobInput::Path("report.docx".into()), &ParseOptions::default())
//!         .await?;
//!     println!("{}", output.content);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `server` | on      | HTTP surface ([`server`]) on axum |
//! | `cli`    | on      | The `docparse-server` binary (clap + anyhow + tracing-subscriber) |
//!
//! Library-only users can opt out:
//! ```toml
//! edgequake-docparse = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
#[cfg(feature = "server")]
pub mod server;
pub mod sweeper;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    CommandSpec, ConverterSettings, ExtractorSettings, OutputFormat, ParseOptions,
    RetentionPolicy, ServiceConfig, ServiceConfigBuilder,
};
pub use error::{DocParseError, FaultKind, Stage};
pub use job::{Job, JobInput, JobOutput, JobStats};
pub use orchestrator::Orchestrator;
pub use pipeline::extract::{ExtractionEngine, MineruEngine};
pub use pipeline::normalize::{DocumentConverter, LibreOfficeConverter};
pub use progress::{
    JobProgressCallback, NoopProgressCallback, ProgressCallback, TracingProgressCallback,
};
pub use sweeper::{RetentionSweeper, SweepReport, SweeperHandle};
pub use workspace::{WorkspaceEntry, WorkspaceHandle, WorkspaceStore};
