//! Service surface endpoints (all require a valid request signature).

use crate::auth::ServiceIdentity;
use crate::models::{RolesResponse, StatusResponse, VerifyResponse};
use axum::Json;

/// POST /onboarding
pub async fn onboarding(ServiceIdentity(service_id): ServiceIdentity) -> Json<StatusResponse> {
    tracing::info!(action = "onboarding", service_id = %service_id, "Service onboarded");
    Json(StatusResponse { status: "onboarded" })
}

/// POST /verify
pub async fn verify(ServiceIdentity(_service_id): ServiceIdentity) -> Json<VerifyResponse> {
    Json(VerifyResponse { verified: "true" })
}

/// GET /list
pub async fn list_roles(ServiceIdentity(_service_id): ServiceIdentity) -> Json<RolesResponse> {
    Json(RolesResponse {
        roles: vec!["reader", "admin"],
    })
}

/// POST /admin/grant
pub async fn admin_grant(ServiceIdentity(service_id): ServiceIdentity) -> Json<StatusResponse> {
    tracing::info!(action = "role_granted", service_id = %service_id, "Service granted role");
    Json(StatusResponse { status: "granted" })
}
