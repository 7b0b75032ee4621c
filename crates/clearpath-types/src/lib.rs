//! Shared type definitions for the ClearPath dispatch simulator.
//!
//! Every type that crosses the wire lives here so the HTTP layer, the
//! scenario engine, and the browser dashboard agree on one shape. Types
//! flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for alerts, notifications, runs
//! - [`enums`] -- Signal identifiers and status enums
//! - [`structs`] -- [`SimulationState`] and the records it holds
//! - [`events`] -- WebSocket event envelope in both directions

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

pub use enums::{
    AlertStatus, NotificationKind, ResponseStatus, SignalId, SignalStatus, UnknownSignal,
};
pub use events::{
    AlertAcknowledged, ClientCommand, Connected, PositionUpdate, ServerEvent, SignalPreempted,
};
pub use ids::{AlertId, ContactId, NotificationId, RunId};
pub use structs::{
    Alert, AnalyticsSnapshot, ContactRequest, ContactSubmission, Notification, SignalState,
    SimulationState, default_signals,
};
