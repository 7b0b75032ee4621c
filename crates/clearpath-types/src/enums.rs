//! Enumeration types for the ClearPath simulator.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Traffic signals
// ---------------------------------------------------------------------------

/// One of the fixed set of simulated intersections on the ambulance route.
///
/// Serialized as the bare junction letter (`"A"`, `"B"`, `"C"`), which is
/// also the form used in REST paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum SignalId {
    /// Junction A, the first on the route.
    A,
    /// Junction B.
    B,
    /// Junction C, the last before arrival.
    C,
}

impl SignalId {
    /// All signals in route order.
    pub const ALL: [Self; 3] = [Self::A, Self::B, Self::C];

    /// The junction letter.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
        }
    }
}

impl core::fmt::Display for SignalId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSignal(pub String);

impl core::fmt::Display for UnknownSignal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "unknown signal: {}", self.0)
    }
}

impl std::error::Error for UnknownSignal {}

impl core::str::FromStr for SignalId {
    type Err = UnknownSignal;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            other => Err(UnknownSignal(other.to_owned())),
        }
    }
}

/// Operating mode of a traffic signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum SignalStatus {
    /// Running its regular cycle.
    #[default]
    Normal,
    /// Held green for the approaching emergency vehicle.
    Preempted,
}

// ---------------------------------------------------------------------------
// Alerts and notifications
// ---------------------------------------------------------------------------

/// Lifecycle of an officer alert. Transitions only pending -> acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum AlertStatus {
    /// Raised, waiting for an officer.
    #[default]
    Pending,
    /// An officer confirmed the alert.
    Acknowledged,
}

/// Audience of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum NotificationKind {
    /// Pushed to civilian drivers near the junction.
    #[default]
    Driver,
}

// ---------------------------------------------------------------------------
// Response envelope
// ---------------------------------------------------------------------------

/// Outcome tag carried by every JSON reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum ResponseStatus {
    /// The request was applied.
    Success,
    /// The request was rejected.
    Error,
}
