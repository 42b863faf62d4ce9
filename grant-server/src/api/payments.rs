//! GrantService — payment verification endpoint.
//!
//! Endpoints:
//! - POST /tapcraft.GrantService/VerifyPayment

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use super::{ApiState, AuthedUser};
use crate::error::ApiError;
use crate::grants::{PaymentVerifier, VerifyOutcome};

pub fn routes() -> Router<ApiState> {
    Router::new().route("/tapcraft.GrantService/VerifyPayment", post(verify_payment))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub intent_id: String,
}

#[derive(Serialize)]
pub struct VerifyPaymentResponse {
    /// One of `pending`, `confirmed`, `rejected`, `expired`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

async fn verify_payment(
    State(state): State<ApiState>,
    AuthedUser(uid): AuthedUser,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, ApiError> {
    if req.intent_id.trim().is_empty() {
        return Err(ApiError::InvalidArgument("intentId is required".into()));
    }

    let verifier = PaymentVerifier {
        store: state.store.as_ref(),
        ledger: state.ledger.as_ref(),
        merchant_address: &state.config.merchant_address,
        scan_limit: state.config.scan_limit,
    };

    let response = match verifier.verify(&uid, &req.intent_id).await? {
        VerifyOutcome::Pending { message } => VerifyPaymentResponse {
            status: "pending",
            level: None,
            message: Some(message),
        },
        VerifyOutcome::Confirmed { level } => VerifyPaymentResponse {
            status: "confirmed",
            level: Some(level),
            message: None,
        },
        VerifyOutcome::Rejected { message } => VerifyPaymentResponse {
            status: "rejected",
            level: None,
            message: Some(message),
        },
        VerifyOutcome::Expired => VerifyPaymentResponse {
            status: "expired",
            level: None,
            message: None,
        },
    };
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_name_is_camel_case() {
        let req: VerifyPaymentRequest =
            serde_json::from_str(r#"{"intentId": "intent_1"}"#).unwrap();
        assert_eq!(req.intent_id, "intent_1");
    }
}
