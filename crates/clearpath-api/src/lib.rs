//! HTTP and `WebSocket` API for the ClearPath dispatch simulator.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) for the live event stream and the
//!   dashboard's trigger, reset, and status commands
//! - **REST endpoints** under `/api` for the emergency lifecycle, state
//!   reads, signal preemption, alert acknowledgement, and the contact form
//! - **Static dashboard** assets as the router fallback, when configured
//!
//! # Architecture
//!
//! Handlers hold no state of their own. Every request is forwarded to the
//! [`Dispatcher`](clearpath_core::Dispatcher) inside [`AppState`], which
//! owns the simulation state and the broadcast channel. `WebSocket`
//! clients receive events via that channel with automatic lag handling.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use response::ApiResponse;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
