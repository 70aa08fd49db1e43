// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.

use std::time::Instant;

use axum::{
    Router,
    routing::{get, post},
};
use omnidesk_config::model::WebhookConfig;
use omnidesk_core::OmnideskError;
use omnidesk_routing::{ChannelDispatcher, RoutingEngine};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub dispatcher: ChannelDispatcher,
    pub engine: RoutingEngine,
    /// Process start time for uptime reporting.
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(engine: RoutingEngine) -> Self {
        Self {
            dispatcher: ChannelDispatcher::new(engine.clone()),
            engine,
            start_time: Instant::now(),
        }
    }
}

/// Builds the router:
/// - `GET /health`
/// - `POST /{channel}/...` for provider webhooks
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route("/", post(handlers::post_webhook))
        .route("/{*path}", post(handlers::post_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds the webhook listener and serves until `cancel` fires.
pub async fn start_server(
    config: &WebhookConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), OmnideskError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| OmnideskError::Channel {
            message: format!("failed to bind webhook server to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| OmnideskError::Channel {
            message: format!("webhook server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("webhook server stopped");
    Ok(())
}
