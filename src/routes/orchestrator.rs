//! Orchestrator surface endpoints (all require the bearer token).

use crate::error::AppError;
use crate::models::{PlanResponse, StatusResponse};
use axum::{extract::Path, Json};

/// POST /orchestrate
pub async fn orchestrate() -> Json<StatusResponse> {
    tracing::info!(action = "orchestrate", "Orchestration request accepted");
    Json(StatusResponse { status: "accepted" })
}

/// GET /plans/{id}
pub async fn get_plan(Path(id): Path<String>) -> Result<Json<PlanResponse>, AppError> {
    super::validate_id(&id, "plan id")?;

    Ok(Json(PlanResponse {
        plan_id: id,
        status: "pending",
    }))
}
