//! API route handlers.

pub mod orchestrator;
pub mod service;

use crate::auth::middleware::{require_auth, AppState};
use crate::error::AppError;
use crate::middleware::{cors_layer, security_headers};
use axum::{middleware, routing::get, routing::post, Json, Router};
use serde_json::json;

/// Validate an identifier taken from the path (1-64 chars, alphanumeric, hyphens, underscores).
pub fn validate_id(id: &str, label: &str) -> Result<(), AppError> {
    if id.is_empty()
        || id.len() > 64
        || !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::BadRequest(format!("Invalid {} format", label)));
    }
    Ok(())
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Build the API router with all endpoints.
///
/// Each protected route is bound to exactly one guard: the service surface
/// to the signature verifier, the orchestrator surface to the bearer check.
pub fn api_router(state: &AppState) -> Router<AppState> {
    let service = Router::new()
        .route("/onboarding", post(service::onboarding))
        .route("/verify", post(service::verify))
        .route("/list", get(service::list_roles))
        .route("/admin/grant", post(service::admin_grant))
        .route_layer(middleware::from_fn_with_state(
            state.service_guard.clone(),
            require_auth,
        ));

    let orchestrator = Router::new()
        .route("/orchestrate", post(orchestrator::orchestrate))
        .route("/plans/{id}", get(orchestrator::get_plan))
        .route_layer(middleware::from_fn_with_state(
            state.bearer_guard.clone(),
            require_auth,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(service)
        .merge(orchestrator)
}

/// Build the complete application: routes, CORS and response headers.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    api_router(&state)
        .layer(cors)
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}
