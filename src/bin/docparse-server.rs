//! HTTP server binary for edgequake-docparse.
//!
//! Maps CLI flags to `ServiceConfig`, starts the retention sweeper and serves
//! the HTTP surface until Ctrl-C.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_docparse::server::{self, AppState};
use edgequake_docparse::{
    CommandSpec, Orchestrator, RetentionSweeper, ServiceConfig, TracingProgressCallback,
};
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"ENDPOINTS:
  POST /parse    JSON {"file_paths": [...], "lang", "backend", "method", "output_format"}
                 → {"<doc name>": "<markdown or html>", ...}
  POST /upload   multipart: file, lang, backend, method, output_format
                 → Markdown (text/markdown) or HTML (text/html) body
  GET  /health   → {"status": "ok"}

EXAMPLES:
  docparse-server --bind 127.0.0.1:5002 --workspace-root /var/lib/docparse
  curl -F file=@report.docx http://127.0.0.1:5002/upload
  curl -H 'content-type: application/json' \
       -d '{"file_paths":["/srv/in/a.pdf"],"output_format":"html"}' \
       http://127.0.0.1:5002/parse

Every job leaves its workspace on disk. Workspaces older than --ttl-secs are
removed by the background sweeper.
"#;

/// Convert office documents and PDFs to Markdown over HTTP.
#[derive(Parser, Debug)]
#[command(
    name = "docparse-server",
    version,
    about = "Convert office documents and PDFs to Markdown over HTTP",
    long_about = "Serve document-to-Markdown conversion over HTTP. Office files are first \
converted to PDF with a headless office suite, then an extraction engine produces Markdown. \
Each job runs in its own workspace directory, which a background sweeper expires after a TTL.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "DOCPARSE_BIND", default_value = "0.0.0.0:5002")]
    bind: SocketAddr,

    /// Directory holding one sub-directory per job.
    #[arg(long, env = "DOCPARSE_WORKSPACE_ROOT", default_value = "./temp_output")]
    workspace_root: PathBuf,

    /// Seconds a workspace may live before the sweeper removes it.
    #[arg(long, env = "DOCPARSE_TTL_SECS", default_value_t = 3600,
          value_parser = clap::value_parser!(u64).range(1..))]
    ttl_secs: u64,

    /// Seconds between sweeper passes.
    #[arg(long, env = "DOCPARSE_SWEEP_INTERVAL_SECS", default_value_t = 3600,
          value_parser = clap::value_parser!(u64).range(1..))]
    sweep_interval_secs: u64,

    /// Office → PDF converter executable.
    #[arg(long, env = "DOCPARSE_CONVERTER", default_value = "libreoffice")]
    converter: String,

    /// Seconds before a conversion is killed.
    #[arg(long, env = "DOCPARSE_CONVERTER_TIMEOUT_SECS", default_value_t = 120,
          value_parser = clap::value_parser!(u64).range(1..))]
    converter_timeout_secs: u64,

    /// PDF → Markdown extraction engine executable.
    #[arg(long, env = "DOCPARSE_EXTRACTOR", default_value = "mineru")]
    extractor: String,

    /// Seconds before an extraction is killed.
    #[arg(long, env = "DOCPARSE_EXTRACTOR_TIMEOUT_SECS", default_value_t = 1800,
          value_parser = clap::value_parser!(u64).range(1..))]
    extractor_timeout_secs: u64,

    /// Model source exported to the extraction engine.
    #[arg(long, env = "DOCPARSE_MODEL_SOURCE", default_value = "modelscope")]
    model_source: String,

    /// Enable debug logging.
    #[arg(short, long, env = "DOCPARSE_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> Result<ServiceConfig> {
        ServiceConfig::builder()
            .workspace_root(self.workspace_root.clone())
            .ttl(Duration::from_secs(self.ttl_secs))
            .sweep_interval(Duration::from_secs(self.sweep_interval_secs))
            .converter_command(CommandSpec::new(&self.converter))
            .converter_timeout(Duration::from_secs(self.converter_timeout_secs))
            .extractor_command(CommandSpec::new(&self.extractor))
            .extractor_timeout(Duration::from_secs(self.extractor_timeout_secs))
            .model_source(&self.model_source)
            .progress_callback(Arc::new(TracingProgressCallback))
            .build()
            .context("Invalid configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = cli.to_config()?;
    info!(?config, "Starting docparse-server");

    let orchestrator = Orchestrator::from_config(&config)
        .await
        .with_context(|| {
            format!(
                "Failed to open workspace root {}",
                config.workspace_root.display()
            )
        })?;

    // ── Retention sweeper ────────────────────────────────────────────────
    let token = CancellationToken::new();
    let sweeper = RetentionSweeper::new(orchestrator.store().clone(), config.retention)
        .spawn_with_token(token.clone());

    // ── HTTP ─────────────────────────────────────────────────────────────
    let listener = TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    let state = AppState::new(orchestrator, config.default_options.clone());

    let shutdown_token = token.clone();
    let shutdown = async move {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::error!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Shutdown requested");
            }
            _ = shutdown_token.cancelled() => {}
        }
    };

    let served = server::serve(listener, state, shutdown)
        .await
        .context("HTTP server failed");

    sweeper.shutdown().await;
    served
}
