//! Axum router construction for the ClearPath API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /health` -- liveness
/// - `GET /ws` -- `WebSocket` event stream and command channel
/// - `POST /api/emergency/trigger`, `POST /api/emergency/reset`
/// - `GET /api/status`, `/api/alerts`, `/api/notifications`,
///   `/api/analytics`, `/api/traffic-signals`
/// - `POST /api/contact`
/// - `POST /api/traffic-signals/{id}/preempt`
/// - `POST /api/alerts/{id}/acknowledge`
///
/// When [`AppState::static_dir`] is set, unmatched paths are served from
/// that directory so the dashboard loads from `/`.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.static_dir.clone();

    let router = Router::new()
        .route("/health", get(handlers::health))
        // WebSocket
        .route("/ws", get(ws::ws_events))
        // Emergency lifecycle
        .route("/api/emergency/trigger", post(handlers::trigger_emergency))
        .route("/api/emergency/reset", post(handlers::reset_emergency))
        // Reads
        .route("/api/status", get(handlers::get_status))
        .route("/api/alerts", get(handlers::get_alerts))
        .route("/api/notifications", get(handlers::get_notifications))
        .route("/api/analytics", get(handlers::get_analytics))
        .route("/api/traffic-signals", get(handlers::get_traffic_signals))
        // Commands
        .route("/api/contact", post(handlers::submit_contact))
        .route(
            "/api/traffic-signals/{id}/preempt",
            post(handlers::preempt_signal),
        )
        .route(
            "/api/alerts/{id}/acknowledge",
            post(handlers::acknowledge_alert),
        );

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
