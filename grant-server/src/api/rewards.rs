//! RewardService endpoints — task claims and referral registration.
//!
//! Endpoints:
//! - POST /tapcraft.GrantService/ClaimTask
//! - POST /tapcraft.GrantService/RegisterReferral

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::{ApiState, AuthedUser};
use crate::error::ApiError;
use crate::rewards;

pub fn routes() -> Router<ApiState> {
    Router::new()
        .route("/tapcraft.GrantService/ClaimTask", post(claim_task))
        .route("/tapcraft.GrantService/RegisterReferral", post(register_referral))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct ClaimTaskRequest {
    pub task: String,
}

#[derive(Serialize)]
pub struct ClaimTaskResponse {
    pub ok: bool,
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralRequest {
    pub referrer_uid: String,
    #[serde(default)]
    pub referrer_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReferralResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_count_after: Option<u32>,
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn claim_task(
    State(state): State<ApiState>,
    AuthedUser(uid): AuthedUser,
    Json(req): Json<ClaimTaskRequest>,
) -> Result<Json<ClaimTaskResponse>, ApiError> {
    let result = rewards::claim_task(state.store.as_ref(), &uid, &req.task).await?;
    Ok(Json(ClaimTaskResponse { ok: result.ok, message: result.message }))
}

async fn register_referral(
    State(state): State<ApiState>,
    AuthedUser(uid): AuthedUser,
    Json(req): Json<RegisterReferralRequest>,
) -> Result<Json<RegisterReferralResponse>, ApiError> {
    let result = rewards::register_referral(
        state.store.as_ref(),
        &uid,
        &req.referrer_uid,
        req.referrer_name.as_deref(),
    )
    .await?;
    Ok(Json(RegisterReferralResponse {
        ok: result.ok,
        reward: result.reward,
        ref_count_after: result.ref_count_after,
        message: result.message,
    }))
}
