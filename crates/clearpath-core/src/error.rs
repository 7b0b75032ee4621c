//! Errors returned by dispatcher operations.
//!
//! These are the only user-visible failure kinds. Each is reported to
//! the caller as a structured error reply and never retried.

/// A rejected dispatcher command.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// A trigger arrived while a scenario run is live.
    #[error("Emergency already active")]
    AlreadyActive,

    /// The requested signal does not exist.
    #[error("Signal {0} not found")]
    SignalNotFound(String),

    /// No pending alert has the requested ID.
    #[error("Alert not found")]
    AlertNotFound,
}
