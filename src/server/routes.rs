//! HTTP routes: static benchmark assets, result submission, health.

use std::path::Path;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::debug;

use super::user_agent::parse_user_agent;
use super::ServerState;
use crate::result::BenchmarkResult;
use crate::spec::is_catalog_segment;

/// Body a benchmark page posts once all of its trials are done.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Run identifier from the page URL, absent when opened by hand.
    #[serde(default)]
    pub run_id: Option<String>,
    pub name: String,
    pub implementation: String,
    pub millis: Vec<f64>,
}

/// Build the server router. Anything not matched by an API route is served
/// from the benchmark root.
pub(crate) fn router(state: Arc<ServerState>, root: &Path) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/submitResults", post(submit_results))
        .fallback_service(ServeDir::new(root))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn submit_results(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(submission): Json<Submission>,
) -> (StatusCode, Json<Value>) {
    if submission.millis.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "millis must contain at least one sample" })),
        );
    }

    if !is_catalog_segment(&submission.name) || !is_catalog_segment(&submission.implementation) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "name and implementation must be plain directory names" })),
        );
    }

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let browser = parse_user_agent(user_agent);

    debug!(
        run_id = ?submission.run_id,
        benchmark = %submission.name,
        implementation = %submission.implementation,
        browser = %browser,
        samples = submission.millis.len(),
        "received results"
    );

    let result = BenchmarkResult {
        name: submission.name,
        implementation: submission.implementation,
        browser,
        millis: submission.millis,
    };
    state.deliver(submission.run_id.as_deref(), result).await;

    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
