//! HTTP surface.
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `POST /parse`  | JSON `{file_paths, lang?, backend?, method?, output_format?}` | JSON map doc name → content |
//! | `POST /upload` | multipart `file`, `lang`, `backend`, `method`, `output_format` | Markdown or HTML body |
//! | `GET /health`  | none | `{"status":"ok"}` |
//!
//! Handlers are thin: they assemble [`ParseOptions`] and a [`JobInput`] and
//! hand over to the [`Orchestrator`]. Every [`DocParseError`] becomes a JSON
//! error body with a status chosen by its fault kind.

use crate::config::{OutputFormat, ParseOptions};
use crate::error::{DocParseError, FaultKind};
use crate::job::JobInput;
use crate::orchestrator::Orchestrator;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

/// Largest accepted upload. Office documents with embedded scans get big.
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub defaults: Arc<ParseOptions>,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator, defaults: ParseOptions) -> Self {
        Self {
            orchestrator,
            defaults: Arc::new(defaults),
        }
    }
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/parse", post(handle_parse))
        .route("/upload", post(handle_upload))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish after `shutdown` fires.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Body of `POST /parse`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParseRequest {
    #[serde(default)]
    pub file_paths: Option<Vec<String>>,
    pub lang: Option<String>,
    pub backend: Option<String>,
    pub method: Option<String>,
    pub output_format: Option<OutputFormat>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    exit_code: Option<i32>,
}

/// Request-boundary wrapper turning library errors into HTTP responses.
#[derive(Debug)]
pub struct ApiError(pub DocParseError);

impl From<DocParseError> for ApiError {
    fn from(e: DocParseError) -> Self {
        ApiError(e)
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError(DocParseError::InvalidInput(format!("malformed multipart body: {e}")))
    }
}

pub fn status_for(kind: FaultKind) -> StatusCode {
    match kind {
        FaultKind::InvalidInput => StatusCode::BAD_REQUEST,
        FaultKind::ConversionFault => StatusCode::UNPROCESSABLE_ENTITY,
        FaultKind::ExtractionFault | FaultKind::ArtifactMissing => StatusCode::BAD_GATEWAY,
        FaultKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        FaultKind::StorageFault | FaultKind::IoFault | FaultKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status = status_for(kind);
        warn!(error = %self.0, kind = kind.as_str(), "request failed");
        let body = ErrorBody {
            error: kind.as_str(),
            message: self.0.to_string(),
            exit_code: self.0.exit_code(),
        };
        (status, Json(body)).into_response()
    }
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_parse(
    State(state): State<AppState>,
    Json(req): Json<ParseRequest>,
) -> Result<Json<BTreeMap<String, String>>, ApiError> {
    let options = state
        .defaults
        .overlay(req.lang, req.backend, req.method, req.output_format);
    let paths: Vec<PathBuf> = req
        .file_paths
        .unwrap_or_default()
        .into_iter()
        .map(PathBuf::from)
        .collect();

    info!(files = paths.len(), format = options.output_format.as_str(), "parse request");
    let results = state.orchestrator.run_batch(&paths, &options).await?;
    Ok(Json(results))
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut lang = None;
    let mut backend = None;
    let mut method = None;
    let mut output_format = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                upload = Some((filename, bytes.to_vec()));
            }
            "lang" => lang = Some(field.text().await?),
            "backend" => backend = Some(field.text().await?),
            "method" => method = Some(field.text().await?),
            "output_format" => output_format = Some(OutputFormat::from(field.text().await?)),
            other => warn!("Ignoring unknown multipart field '{}'", other),
        }
    }

    let (filename, bytes) = upload
        .ok_or_else(|| DocParseError::InvalidInput("multipart field 'file' is required".into()))?;
    let options = state.defaults.overlay(lang, backend, method, output_format);

    info!(filename = %filename, bytes = bytes.len(), "upload request");
    let output = state
        .orchestrator
        .run_job(JobInput::Upload { filename, bytes }, &options)
        .await?;

    let content_type = match output.format {
        OutputFormat::Html => "text/html; charset=utf-8",
        OutputFormat::Markdown => "text/markdown; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], output.content).into_response())
}
