//! Response models for the API.

use serde::Serialize;

// ============================================================================
// Service Surface Models
// ============================================================================

/// Generic status acknowledgement.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// Response from POST /verify.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub verified: &'static str,
}

/// Response from GET /list.
#[derive(Debug, Serialize)]
pub struct RolesResponse {
    pub roles: Vec<&'static str>,
}

// ============================================================================
// Orchestrator Surface Models
// ============================================================================

/// Response from GET /plans/{id}.
#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan_id: String,
    pub status: &'static str,
}
