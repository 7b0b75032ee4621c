//! Real-time channel messages.
//!
//! Every frame on the WebSocket is a JSON object of the form
//! `{"event": "<name>", "data": <payload>}`. [`ServerEvent`] covers the
//! server-to-client direction, [`ClientCommand`] the client-to-server one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{SignalId, SignalStatus};
use crate::ids::AlertId;
use crate::structs::{Alert, AnalyticsSnapshot, Notification, SimulationState};

/// Payload of the `connected` greeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Connected {
    /// Greeting text.
    pub message: String,
}

impl Default for Connected {
    fn default() -> Self {
        Self {
            message: String::from("Connected to ClearPath system"),
        }
    }
}

/// Payload of `signal_preempted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SignalPreempted {
    /// The preempted junction.
    pub signal_id: SignalId,
    /// New signal status; always preempted.
    pub status: SignalStatus,
    /// When the preemption happened.
    pub timestamp: DateTime<Utc>,
}

impl SignalPreempted {
    /// Build the event for a signal preempted just now.
    pub fn now(signal_id: SignalId) -> Self {
        Self {
            signal_id,
            status: SignalStatus::Preempted,
            timestamp: Utc::now(),
        }
    }
}

/// Payload of `alert_acknowledged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AlertAcknowledged {
    /// The acknowledged alert.
    pub alert_id: AlertId,
    /// When it was acknowledged.
    pub timestamp: DateTime<Utc>,
}

/// Payload of `ambulance_position_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct PositionUpdate {
    /// Progress along the route, 0-100.
    pub position: u32,
    /// Current speed in km/h.
    pub speed: u32,
}

/// A server-to-client event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ServerEvent {
    /// Greeting sent to a client right after it connects.
    Connected(Connected),
    /// Full state snapshot, sent on connect and on request.
    StatusUpdate(Box<SimulationState>),
    /// An emergency run started.
    EmergencyTriggered(Box<SimulationState>),
    /// The scenario was reset to idle.
    EmergencyReset(Box<SimulationState>),
    /// An officer alert was raised.
    NewAlert(Alert),
    /// A driver notification was sent.
    NewNotification(Notification),
    /// A signal was preempted.
    SignalPreempted(SignalPreempted),
    /// An officer acknowledged an alert.
    AlertAcknowledged(AlertAcknowledged),
    /// The ambulance moved.
    AmbulancePositionUpdate(PositionUpdate),
    /// The ambulance arrived.
    EmergencyComplete(Box<SimulationState>),
    /// Analytics were regenerated.
    AnalyticsUpdate(AnalyticsSnapshot),
}

impl ServerEvent {
    /// The wire name of the event, as it appears in the `event` field.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::StatusUpdate(_) => "status_update",
            Self::EmergencyTriggered(_) => "emergency_triggered",
            Self::EmergencyReset(_) => "emergency_reset",
            Self::NewAlert(_) => "new_alert",
            Self::NewNotification(_) => "new_notification",
            Self::SignalPreempted(_) => "signal_preempted",
            Self::AlertAcknowledged(_) => "alert_acknowledged",
            Self::AmbulancePositionUpdate(_) => "ambulance_position_update",
            Self::EmergencyComplete(_) => "emergency_complete",
            Self::AnalyticsUpdate(_) => "analytics_update",
        }
    }
}

/// A client-to-server command received over the WebSocket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "event", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ClientCommand {
    /// Ask for a fresh `status_update`.
    RequestStatus,
    /// Start an emergency run.
    EmergencyTrigger,
    /// Reset the scenario.
    EmergencyReset,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_envelope_uses_event_and_data() {
        let event = ServerEvent::AmbulancePositionUpdate(PositionUpdate {
            position: 45,
            speed: 65,
        });
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(json["event"], "ambulance_position_update");
        assert_eq!(json["data"]["position"], 45);
        assert_eq!(json["data"]["speed"], 65);
    }

    #[test]
    fn name_matches_serialized_tag() {
        let events = [
            ServerEvent::Connected(Connected::default()),
            ServerEvent::StatusUpdate(Box::default()),
            ServerEvent::EmergencyComplete(Box::default()),
            ServerEvent::SignalPreempted(SignalPreempted::now(SignalId::B)),
            ServerEvent::AnalyticsUpdate(AnalyticsSnapshot::default()),
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap_or_default();
            assert_eq!(json["event"], event.name());
        }
    }

    #[test]
    fn client_commands_parse_from_event_tag() {
        let parsed: Result<ClientCommand, _> =
            serde_json::from_str(r#"{"event":"emergency_trigger"}"#);
        assert_eq!(parsed.ok(), Some(ClientCommand::EmergencyTrigger));

        let parsed: Result<ClientCommand, _> =
            serde_json::from_str(r#"{"event":"request_status","data":null}"#);
        assert_eq!(parsed.ok(), Some(ClientCommand::RequestStatus));
    }

    #[test]
    fn unknown_client_command_is_rejected() {
        let parsed: Result<ClientCommand, _> = serde_json::from_str(r#"{"event":"reboot"}"#);
        assert!(parsed.is_err());
    }
}
