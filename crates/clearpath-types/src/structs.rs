//! Core state and record structs.
//!
//! [`SimulationState`] is the single record the whole simulator revolves
//! around. Field names match the JSON consumed by the browser dashboard.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{AlertStatus, NotificationKind, SignalId, SignalStatus};
use crate::ids::{AlertId, ContactId, NotificationId};

/// Ambulance position shown while no emergency is running.
pub const IDLE_POSITION: u32 = 30;
/// ETA placeholder shown while no emergency is running.
pub const IDLE_ETA: &str = "--:--";
/// Severity placeholder shown while no emergency is running.
pub const IDLE_SEVERITY: &str = "--";

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// State of a single traffic signal.
///
/// `preempted` mirrors `status` for clients that only read the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SignalState {
    /// Operating mode.
    pub status: SignalStatus,
    /// Whether the signal has been preempted.
    pub preempted: bool,
}

impl SignalState {
    /// The preempted state.
    pub const PREEMPTED: Self = Self {
        status: SignalStatus::Preempted,
        preempted: true,
    };

    /// Force the signal into preemption.
    pub const fn preempt(&mut self) {
        *self = Self::PREEMPTED;
    }
}

/// Build the signal table with every junction back on its normal cycle.
pub fn default_signals() -> BTreeMap<SignalId, SignalState> {
    SignalId::ALL
        .into_iter()
        .map(|id| (id, SignalState::default()))
        .collect()
}

// ---------------------------------------------------------------------------
// Alerts and notifications
// ---------------------------------------------------------------------------

/// An alert raised for traffic officers at a junction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Alert {
    /// Unique alert identifier.
    pub id: AlertId,
    /// Junction the alert concerns.
    pub intersection: SignalId,
    /// Instruction shown to officers.
    pub message: String,
    /// When the alert was raised.
    pub timestamp: DateTime<Utc>,
    /// Pending until an officer acknowledges it.
    pub status: AlertStatus,
    /// When the alert was acknowledged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    /// Raise a pending officer alert for the given junction.
    pub fn officer(intersection: SignalId) -> Self {
        Self {
            id: AlertId::new(),
            intersection,
            message: format!(
                "Ambulance approaching Junction {intersection} - Clear left lanes and hold cross traffic"
            ),
            timestamp: Utc::now(),
            status: AlertStatus::Pending,
            acknowledged_at: None,
        }
    }

    /// Whether the alert is still waiting for an officer.
    pub fn is_pending(&self) -> bool {
        self.status == AlertStatus::Pending
    }
}

/// A notification pushed to drivers near a junction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Unique notification identifier.
    pub id: NotificationId,
    /// Junction the notification concerns.
    pub intersection: SignalId,
    /// Text shown to drivers.
    pub message: String,
    /// When the notification was sent.
    pub timestamp: DateTime<Utc>,
    /// Audience.
    #[serde(rename = "type")]
    pub kind: NotificationKind,
}

impl Notification {
    /// Build a driver notification for the given junction.
    pub fn driver(intersection: SignalId) -> Self {
        Self {
            id: NotificationId::new(),
            intersection,
            message: format!(
                "Emergency vehicle approaching Junction {intersection} - Move left when safe. ETA 2 minutes"
            ),
            timestamp: Utc::now(),
            kind: NotificationKind::Driver,
        }
    }
}

// ---------------------------------------------------------------------------
// Analytics
// ---------------------------------------------------------------------------

/// Synthetic dashboard analytics. Values are regenerated wholesale on
/// every refresh; nothing is retained between refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnalyticsSnapshot {
    /// Average response time in minutes.
    pub response_time: f64,
    /// Route efficiency percentage.
    pub route_efficiency: f64,
    /// Successful arrival percentage.
    pub success_rate: f64,
    /// Average officer response in minutes.
    pub officer_response: f64,
}

impl Default for AnalyticsSnapshot {
    fn default() -> Self {
        Self {
            response_time: 2.3,
            route_efficiency: 94.0,
            success_rate: 97.0,
            officer_response: 1.8,
        }
    }
}

// ---------------------------------------------------------------------------
// Simulation state
// ---------------------------------------------------------------------------

/// The complete simulator state served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationState {
    /// Whether an emergency run is in progress.
    pub emergency_active: bool,
    /// Ambulance progress along the route, 0-100.
    pub ambulance_position: u32,
    /// Ambulance speed in km/h.
    pub current_speed: u32,
    /// Estimated time of arrival, `m:ss`.
    pub eta: String,
    /// Dispatch severity code.
    pub severity_code: String,
    /// Officer alerts in creation order.
    pub alerts: Vec<Alert>,
    /// Driver notifications in creation order.
    pub notifications: Vec<Notification>,
    /// Per-junction signal state.
    pub traffic_signals: BTreeMap<SignalId, SignalState>,
    /// Dashboard analytics.
    pub analytics: AnalyticsSnapshot,
}

impl Default for SimulationState {
    fn default() -> Self {
        Self {
            emergency_active: false,
            ambulance_position: IDLE_POSITION,
            current_speed: 0,
            eta: IDLE_ETA.to_owned(),
            severity_code: IDLE_SEVERITY.to_owned(),
            alerts: Vec::new(),
            notifications: Vec::new(),
            traffic_signals: default_signals(),
            analytics: AnalyticsSnapshot::default(),
        }
    }
}

impl SimulationState {
    /// Put every scenario field back to its idle value.
    ///
    /// Analytics are left alone; they belong to the ticker, not to a run.
    pub fn reset_scenario(&mut self) {
        let analytics = self.analytics;
        *self = Self {
            analytics,
            ..Self::default()
        };
    }

    /// Look up an alert by ID for mutation.
    pub fn alert_mut(&mut self, id: AlertId) -> Option<&mut Alert> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }
}

// ---------------------------------------------------------------------------
// Contact form
// ---------------------------------------------------------------------------

/// Body of `POST /api/contact`. Every field is optional; the form is
/// accepted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ContactRequest {
    /// Sender name.
    #[serde(default)]
    pub name: Option<String>,
    /// Sender email.
    #[serde(default)]
    pub email: Option<String>,
    /// Sender organization.
    #[serde(default)]
    pub organization: Option<String>,
    /// Area of interest picked on the form.
    #[serde(default)]
    pub interest: Option<String>,
    /// Free-form message.
    #[serde(default)]
    pub message: Option<String>,
}

/// A processed contact form submission, echoed back to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ContactSubmission {
    /// Generated submission identifier.
    pub id: ContactId,
    /// Sender name.
    pub name: Option<String>,
    /// Sender email.
    pub email: Option<String>,
    /// Sender organization.
    pub organization: Option<String>,
    /// Area of interest.
    pub interest: Option<String>,
    /// Free-form message.
    pub message: Option<String>,
    /// When the form was received.
    pub timestamp: DateTime<Utc>,
    /// Processing status; always `"new"`.
    pub status: String,
}

impl ContactSubmission {
    /// Stamp a request with a fresh ID and the current time.
    pub fn from_request(request: ContactRequest) -> Self {
        Self {
            id: ContactId::new(),
            name: request.name,
            email: request.email,
            organization: request.organization,
            interest: request.interest,
            message: request.message,
            timestamp: Utc::now(),
            status: String::from("new"),
        }
    }
}
