//! Scenario engine for the ClearPath dispatch simulator.
//!
//! This crate owns the simulator's only moving parts: the shared state
//! record, the event channel, the run guard, the scripted emergency
//! sequencer, and the analytics ticker. The HTTP and WebSocket layers are
//! thin adapters over [`Dispatcher`].
//!
//! # Modules
//!
//! - [`analytics`] -- Random analytics refresh and the periodic ticker.
//! - [`broadcast`] -- [`Broadcaster`], at-most-once fan-out of events.
//! - [`config`] -- Configuration loading from `clearpath-config.yaml`.
//! - [`control`] -- [`ScenarioControl`], the one-run-at-a-time guard.
//! - [`dispatch`] -- [`Dispatcher`], command handling for every client.
//! - [`error`] -- [`DispatchError`].
//! - [`scenario`] -- The scripted emergency timeline and its playback.
//! - [`store`] -- [`StateStore`], owner of the simulation state.

pub mod analytics;
pub mod broadcast;
pub mod config;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod scenario;
pub mod store;

pub use broadcast::Broadcaster;
pub use config::ClearPathConfig;
pub use control::{RunHandle, ScenarioControl};
pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use store::StateStore;
