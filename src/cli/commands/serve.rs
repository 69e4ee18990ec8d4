//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for video analysis.

use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::pipeline::{Pipeline, PipelineError};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    pipeline: Pipeline,
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    let api_key = preflight::require_api_key()?;
    let pipeline = Pipeline::new(&settings, api_key)?;

    let state = Arc::new(AppState { pipeline });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health))
        .route("/analyze", post(analyze))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("klar API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Analyze", "POST /analyze");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AnalyzeRequest {
    /// Video URL to analyze
    url: String,
}

#[derive(Serialize)]
struct AnalyzeResponse {
    url: String,
    clarity_score: u8,
    communication_focus: String,
    transcript: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
    stage: String,
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    match state.pipeline.run(&req.url).await {
        Ok(analysis) => Json(AnalyzeResponse {
            url: req.url,
            clarity_score: analysis.clarity_score,
            communication_focus: analysis.communication_focus,
            transcript: analysis.transcript.full_text(),
        })
        .into_response(),
        Err(e) => (
            error_status(&e),
            Json(ErrorResponse {
                error: e.error.to_string(),
                kind: e.kind(),
                stage: e.stage.to_string(),
            }),
        )
            .into_response(),
    }
}

/// Map a pipeline failure to an HTTP status.
///
/// Client mistakes get 4xx, upstream trouble gets 502/503, and anything
/// unclassified stays a 500.
fn error_status(error: &PipelineError) -> StatusCode {
    match error.kind() {
        "invalid_url" => StatusCode::BAD_REQUEST,
        "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
        "analysis_failed" | "schema_violation" => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
