//! Error taxonomy shared by every pvectl component

use thiserror::Error;

/// Errors surfaced by session, inventory, placement and lifecycle calls
#[derive(Error, Debug)]
pub enum PveError {
    /// Connectivity failure, timeout or a body that could not be decoded
    #[error("Transport error: {0}")]
    Transport(String),

    /// Credentials rejected by the ticket endpoint
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Authenticated call rejected with a non-2xx response
    #[error("Could not {action}: {status} - {detail}")]
    Status {
        action: String,
        status: u16,
        detail: String,
    },

    /// Lookup against an in-memory inventory found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input handed to a request builder or parser
    #[error("Validation error: {0}")]
    Validation(String),

    /// Placement is impossible because the inventory holds no nodes
    #[error("No nodes found in cluster inventory")]
    NoNodes,
}

impl PveError {
    /// Classify a reqwest failure, labelling timeouts explicitly
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PveError::Transport(format!("timeout: {}", err))
        } else if err.is_decode() {
            PveError::Transport(format!("could not decode response: {}", err))
        } else {
            PveError::Transport(err.to_string())
        }
    }

    /// Whether this error came from the credential exchange
    pub fn is_auth(&self) -> bool {
        matches!(self, PveError::Auth(_))
    }
}

impl From<serde_json::Error> for PveError {
    fn from(err: serde_json::Error) -> Self {
        PveError::Transport(format!("could not decode response: {}", err))
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, PveError>;
