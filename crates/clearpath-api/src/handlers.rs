//! REST API endpoint handlers.
//!
//! Every handler is a thin adapter: extract, call the [`Dispatcher`],
//! wrap the result in the [`ApiResponse`] envelope.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness and observer count |
//! | `POST` | `/api/emergency/trigger` | Start an emergency run |
//! | `POST` | `/api/emergency/reset` | Cancel the run, restore idle state |
//! | `GET` | `/api/status` | Full state |
//! | `GET` | `/api/alerts` | Officer alerts |
//! | `GET` | `/api/notifications` | Driver notifications |
//! | `GET` | `/api/analytics` | Analytics (re-randomized on every fetch) |
//! | `POST` | `/api/contact` | Contact form submission |
//! | `GET` | `/api/traffic-signals` | Signal table |
//! | `POST` | `/api/traffic-signals/{id}/preempt` | Preempt one signal |
//! | `POST` | `/api/alerts/{id}/acknowledge` | Acknowledge one alert |
//!
//! [`Dispatcher`]: clearpath_core::Dispatcher

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use clearpath_types::{
    Alert, AnalyticsSnapshot, ContactRequest, ContactSubmission, Notification, SignalId,
    SignalState, SimulationState,
};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Reply message for a submitted contact form.
pub const CONTACT_THANKS: &str =
    "Thank you for your interest! We'll get back to you within 24 hours.";

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

/// Payload of `GET /health`.
#[derive(Debug, serde::Serialize)]
pub struct Health {
    /// Whether a scenario run is live.
    pub scenario_running: bool,
    /// Number of connected WebSocket observers.
    pub observers: usize,
}

/// Report liveness.
pub async fn health(State(state): State<Arc<AppState>>) -> ApiResponse<Health> {
    let dispatcher = &state.dispatcher;
    ApiResponse::data(Health {
        scenario_running: dispatcher.is_running().await,
        observers: dispatcher.broadcaster().observer_count(),
    })
}

// ---------------------------------------------------------------------------
// Emergency lifecycle
// ---------------------------------------------------------------------------

/// `POST /api/emergency/trigger` -- start an emergency run.
pub async fn trigger_emergency(
    State(state): State<Arc<AppState>>,
) -> Result<ApiResponse<SimulationState>, ApiError> {
    let snapshot = state.dispatcher.trigger_emergency().await?;
    Ok(ApiResponse::with_message("Emergency mode activated", snapshot))
}

/// `POST /api/emergency/reset` -- cancel any run and restore defaults.
pub async fn reset_emergency(State(state): State<Arc<AppState>>) -> ApiResponse<SimulationState> {
    let snapshot = state.dispatcher.reset_emergency().await;
    ApiResponse::with_message("Emergency mode reset", snapshot)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// `GET /api/status` -- the full simulation state.
pub async fn get_status(State(state): State<Arc<AppState>>) -> ApiResponse<SimulationState> {
    ApiResponse::data(state.dispatcher.status().await)
}

/// `GET /api/alerts` -- officer alerts in creation order.
pub async fn get_alerts(State(state): State<Arc<AppState>>) -> ApiResponse<Vec<Alert>> {
    ApiResponse::data(state.dispatcher.alerts().await)
}

/// `GET /api/notifications` -- driver notifications in creation order.
pub async fn get_notifications(
    State(state): State<Arc<AppState>>,
) -> ApiResponse<Vec<Notification>> {
    ApiResponse::data(state.dispatcher.notifications().await)
}

/// `GET /api/analytics` -- regenerate and return analytics.
pub async fn get_analytics(State(state): State<Arc<AppState>>) -> ApiResponse<AnalyticsSnapshot> {
    ApiResponse::data(state.dispatcher.refresh_analytics().await)
}

/// `GET /api/traffic-signals` -- the signal table.
pub async fn get_traffic_signals(
    State(state): State<Arc<AppState>>,
) -> ApiResponse<BTreeMap<SignalId, SignalState>> {
    ApiResponse::data(state.dispatcher.traffic_signals().await)
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// `POST /api/contact` -- accept a contact form.
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<ApiResponse<ContactSubmission>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::InvalidBody(e.body_text()))?;
    let submission = state.dispatcher.submit_contact(request);
    Ok(ApiResponse::with_message(CONTACT_THANKS, submission))
}

/// `POST /api/traffic-signals/{id}/preempt` -- preempt one signal.
pub async fn preempt_signal(
    State(state): State<Arc<AppState>>,
    Path(signal_id): Path<String>,
) -> Result<ApiResponse<SignalState>, ApiError> {
    let updated = state.dispatcher.preempt_signal(&signal_id).await?;
    Ok(ApiResponse::with_message(
        format!("Signal {signal_id} preempted successfully"),
        updated,
    ))
}

/// `POST /api/alerts/{id}/acknowledge` -- acknowledge a pending alert.
pub async fn acknowledge_alert(
    State(state): State<Arc<AppState>>,
    Path(alert_id): Path<String>,
) -> Result<ApiResponse<Alert>, ApiError> {
    let alert = state.dispatcher.acknowledge_alert(&alert_id).await?;
    Ok(ApiResponse::with_message(
        "Alert acknowledged successfully",
        alert,
    ))
}
