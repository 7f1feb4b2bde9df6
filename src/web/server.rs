//! HTTP server for the browser UI and the JSON API.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | Upload form |
//! | `POST /analyze` | Multipart upload → HTML results page |
//! | `POST /api/analyze` | Multipart upload → `Analysis` as JSON |
//! | `GET /health` | Liveness probe |
//!
//! Each request runs one analysis to completion. The only shared state is the
//! immutable [`Analyzer`] behind an `Arc`.

use crate::analyze::Analyzer;
use crate::config::ServerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::input::ImageUpload;
use crate::web::page;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Multipart field carrying the image.
pub const FILE_FIELD: &str = "file";

/// State shared across routes.
#[derive(Clone)]
pub struct AppState {
    analyzer: Arc<Analyzer>,
}

/// Build the application router.
pub fn router(analyzer: Arc<Analyzer>, config: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/analyze", post(analyze_page))
        .route("/api/analyze", post(analyze_api))
        .route("/health", get(|| async { "ok" }))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(AppState { analyzer })
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(analyzer: Arc<Analyzer>, config: ServerConfig) -> Result<(), AnalyzerError> {
    let listener = TcpListener::bind(config.bind)
        .await
        .map_err(|e| AnalyzerError::Internal(format!("Failed to bind {}: {e}", config.bind)))?;
    info!("Drawing analyzer listening on http://{}", config.bind);

    axum::serve(listener, router(analyzer, &config))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AnalyzerError::Internal(format!("Server error: {e}")))
}

/// Serve on an already-bound listener until the task is dropped.
pub async fn serve_on(
    listener: TcpListener,
    analyzer: Arc<Analyzer>,
    config: ServerConfig,
) -> Result<(), AnalyzerError> {
    axum::serve(listener, router(analyzer, &config))
        .await
        .map_err(|e| AnalyzerError::Internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

// ── Handlers ─────────────────────────────────────────────────────────────

async fn index() -> Html<String> {
    Html(page::upload_page(None))
}

async fn analyze_page(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(Some(upload)) => upload,
        // Nothing selected: show the form again, no model call.
        Ok(None) => return Html(page::upload_page(None)).into_response(),
        Err(msg) => {
            warn!("Unreadable upload: {msg}");
            return (
                StatusCode::BAD_REQUEST,
                Html(page::upload_page(Some(&format!("The upload could not be read: {msg}")))),
            )
                .into_response();
        }
    };

    match state.analyzer.analyze_with_preview(upload).await {
        Ok((analysis, preview)) => Html(page::results_page(&analysis, &preview)).into_response(),
        Err(e) => {
            error!("Analysis failed: {e}");
            (status_for(&e), Html(page::failure_page(&e.to_string()))).into_response()
        }
    }
}

async fn analyze_api(State(state): State<AppState>, multipart: Multipart) -> Response {
    let upload = match read_upload(multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": AnalyzerError::NoImage.to_string() })),
            )
                .into_response()
        }
        Err(msg) => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
        }
    };

    match state.analyzer.analyze(upload).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(e) => {
            error!("Analysis failed: {e}");
            (status_for(&e), Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

/// Pull the image out of the multipart body.
///
/// Takes the `file` field, or failing that the first field that carries a
/// file name. `Ok(None)` means no file was selected.
async fn read_upload(mut multipart: Multipart) -> Result<Option<ImageUpload>, String> {
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        let is_file = field.name() == Some(FILE_FIELD) || field.file_name().is_some();
        if !is_file {
            continue;
        }

        let file_name = field
            .file_name()
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| e.to_string())?;

        if bytes.is_empty() {
            return Ok(None);
        }

        let mut upload = ImageUpload::new(bytes.to_vec());
        if let Some(name) = file_name {
            upload = upload.with_file_name(name);
        }
        if let Some(content_type) = content_type {
            upload = upload.with_content_type(content_type);
        }
        return Ok(Some(upload));
    }
    Ok(None)
}

/// HTTP status for a failed analysis.
fn status_for(err: &AnalyzerError) -> StatusCode {
    match err {
        AnalyzerError::NoImage | AnalyzerError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        AnalyzerError::ApiTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_upstream() => StatusCode::BAD_GATEWAY,
        AnalyzerError::ProviderNotConfigured { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_are_bad_gateway() {
        let e = AnalyzerError::LlmApiError {
            message: "boom".into(),
        };
        assert_eq!(status_for(&e), StatusCode::BAD_GATEWAY);
        let e = AnalyzerError::RateLimitExceeded {
            provider: "openai".into(),
        };
        assert_eq!(status_for(&e), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn timeout_is_gateway_timeout() {
        assert_eq!(
            status_for(&AnalyzerError::ApiTimeout { secs: 1 }),
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn local_failures() {
        assert_eq!(status_for(&AnalyzerError::NoImage), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&AnalyzerError::ProviderNotConfigured {
                provider: "auto".into(),
                hint: String::new(),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&AnalyzerError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
