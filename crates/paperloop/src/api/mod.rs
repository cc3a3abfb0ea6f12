mod error;
mod jobs;
mod sse;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

use paperloop_jobs::JobService;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<JobService>,
}

pub fn create_router(service: Arc<JobService>, cors_origins: &[String]) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/", get(api_info))
        .route("/health", get(health))
        .route("/api/jobs", get(jobs::list_jobs).post(jobs::submit_job))
        .route("/api/jobs/live", get(sse::job_events))
        .route("/api/jobs/{id}", get(jobs::get_job))
        .route("/api/jobs/{id}/paper", get(jobs::get_job_paper))
        .route("/api/jobs/{id}/latex", get(jobs::get_job_latex))
        .route("/api/jobs/{id}/cancel", post(jobs::cancel_job))
        .route("/api/papers/latest", get(jobs::latest_paper))
        .route("/api/papers/latest/latex", get(jobs::latest_latex))
        .layer(cors_layer(cors_origins))
        .with_state(state)
}

/// Any origin when the list is empty, otherwise only the listed ones
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn api_info() -> Json<Value> {
    Json(json!({
        "name": "paperloop",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "GET /health": "Health check",
            "POST /api/jobs": "Submit a paper generation job",
            "GET /api/jobs": "List jobs",
            "GET /api/jobs/live": "Server-sent job events",
            "GET /api/jobs/{id}": "Job status",
            "GET /api/jobs/{id}/paper": "Structured paper of a completed job",
            "GET /api/jobs/{id}/latex": "LaTeX source of a completed job",
            "POST /api/jobs/{id}/cancel": "Cancel a job",
            "GET /api/papers/latest": "Most recently completed paper",
            "GET /api/papers/latest/latex": "LaTeX of the most recently completed paper",
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health() {
        let Json(body) = health().await;
        assert_eq!(body, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn test_router_builds_with_and_without_origins() {
        let state = test_support::state_with_score(9.0);
        let _ = create_router(state.service.clone(), &[]);
        let _ = create_router(
            state.service,
            &["http://localhost:5173".to_string(), "bad\norigin".to_string()],
        );
    }
}
