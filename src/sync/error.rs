//! Error definitions for the state-sync subsystem.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The broker refused every connection attempt inside the startup
    /// budget. Fatal: the process exits and the supervisor restarts it.
    #[error("broker unreachable for {} s since startup", limit.as_secs())]
    StartupDeadline { limit: Duration },

    /// A publish or subscribe request could not be handed to the client.
    #[error("bus request failed: {0}")]
    Bus(String),

    /// Two handlers were registered for the same subscription.
    #[error("duplicate handler for subscription `{0}`")]
    DuplicateRoute(String),
}
