//! Shared application state for the API server.

use std::path::PathBuf;

use clearpath_core::Dispatcher;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`](std::sync::Arc) and injected via Axum's `State`
/// extractor. Everything stateful lives behind the [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct AppState {
    /// Command entry point and owner of the simulation state.
    pub dispatcher: Dispatcher,
    /// Directory of dashboard assets served as the router fallback.
    pub static_dir: Option<PathBuf>,
}

impl AppState {
    /// Create an application state around the given dispatcher.
    pub const fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            static_dir: None,
        }
    }

    /// Serve dashboard assets from `dir`.
    #[must_use]
    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }
}
