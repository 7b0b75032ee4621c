//! Error types for the ClearPath server binary.
//!
//! [`StartupError`] is the top-level error type that wraps all possible
//! failure modes during startup and serving.

/// Top-level error for the server binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: clearpath_core::config::ConfigError,
    },

    /// The log filter directive could not be parsed.
    #[error("invalid log level {level:?}: {message}")]
    LogFilter {
        /// The rejected directive.
        level: String,
        /// Parser message.
        message: String,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: clearpath_api::ServerError,
    },
}
