// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP handlers for provider webhooks and the health check.

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{StatusCode, Uri},
};
use omnidesk_routing::{DeskSnapshot, DispatchOutcome};
use serde::Serialize;

use crate::server::GatewayState;

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub desk: DeskSnapshot,
}

/// Accepts one provider callback. The status is always `200 OK` with an
/// empty body, whatever the dispatcher made of it.
pub async fn post_webhook(State(state): State<GatewayState>, uri: Uri, body: Bytes) -> StatusCode {
    let path = uri.path();
    let outcome = state.dispatcher.dispatch(path, &body).await;
    if !matches!(outcome, DispatchOutcome::Ingested(_)) {
        tracing::debug!(path, ?outcome, "webhook acknowledged without ingestion");
    }
    StatusCode::OK
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.start_time.elapsed().as_secs(),
        desk: state.engine.snapshot().await,
    })
}
