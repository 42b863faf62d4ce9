//! HTTP/JSON API layer.
//!
//! REST-like endpoints following gRPC path conventions; the game client
//! calls them via JSON-over-HTTP transport.
//!
//! ## Endpoint convention
//! All endpoints follow the gRPC path pattern `POST /tapcraft.<Service>/<Method>`.
//! Example: `POST /tapcraft.GrantService/VerifyPayment`

pub mod payments;
pub mod rewards;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ApiError;
use crate::ledger::LedgerClient;
use crate::storage::Store;

/// Runtime configuration shared by handlers.
pub struct ServerConfig {
    /// Wallet address payments must land on.
    pub merchant_address: String,
    /// How many recent ledger transactions to scan per verification.
    pub scan_limit: u32,
}

/// Shared state available to all API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn Store>,
    pub ledger: Arc<dyn LedgerClient>,
    pub config: Arc<ServerConfig>,
}

/// Caller identity, taken from the `x-player-uid` header the gateway
/// stamps after authenticating the session.
pub struct AuthedUser(pub String);

impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let uid = parts
            .headers
            .get("x-player-uid")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ApiError::Unauthenticated)?;
        Ok(AuthedUser(uid.to_string()))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Build the full API router with all service endpoints.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .merge(payments::routes())
        .merge(rewards::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP API server on the given port (blocks until shutdown).
pub async fn start_api_server(state: ApiState, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
