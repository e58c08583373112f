pub mod response;

use crate::enrichment::EnrichmentJob;
use crate::error::EnrichmentError;
use response::{error_body, summary_body};
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub const TRIGGER_PATH: &str = "/api/cron/prospect-enrichment";

/// Alternative to `Authorization: Bearer` for callers that cannot set it
const SECRET_HEADER: &str = "x-cron-secret";

pub struct AppState {
    pub job: Arc<EnrichmentJob>,
    pub cron_secret: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(TRIGGER_PATH, get(trigger).post(trigger))
        .route("/health", get(health))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn trigger(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers, &state.cron_secret) {
        warn!(%method, "Rejected enrichment trigger with bad credentials");
        return error_response(EnrichmentError::Unauthorized);
    }

    info!(%method, "Enrichment triggered");

    match state.job.run().await {
        Ok(summary) => (StatusCode::OK, Json(summary_body(&summary))).into_response(),
        Err(err) => {
            warn!("Enrichment run did not complete: {}", err);
            error_response(err)
        }
    }
}

fn status_for(err: &EnrichmentError) -> StatusCode {
    match err {
        EnrichmentError::Unauthorized => StatusCode::UNAUTHORIZED,
        EnrichmentError::AlreadyRunning => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: EnrichmentError) -> Response {
    (status_for(&err), Json(error_body(&err))).into_response()
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = payload
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| payload.downcast_ref::<&str>().copied())
        .unwrap_or("panic in request handler");
    error!("Enrichment handler panicked: {}", detail);
    error_response(EnrichmentError::Internal(detail.to_string()))
}

fn authorized(headers: &HeaderMap, secret: &str) -> bool {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let header = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());

    [bearer, header]
        .into_iter()
        .flatten()
        .any(|given| secrets_match(given.trim(), secret))
}

/// Compare without short-circuiting on the first differing byte
fn secrets_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
