//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;

/// Errors that can occur while dispatching a query.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The request was rejected before any work was done.
    #[error("{reason}")]
    Validation { reason: String },

    /// Dataset store read or write failed.
    #[error("database error: {reason}")]
    DatabaseError { reason: String },

    /// Serialization error.
    #[error("serialization error: {reason}")]
    SerializationError { reason: String },

    /// A text-generation collaborator failed.
    #[error("{collaborator} failed: {source}")]
    CollaboratorFailed {
        collaborator: &'static str,
        #[source]
        source: InferenceError,
    },

    /// A collaborator answered with nothing usable.
    #[error("{collaborator} returned an empty reply")]
    EmptyReply { collaborator: &'static str },
}

impl From<rusqlite::Error> for AgentError {
    fn from(e: rusqlite::Error) -> Self {
        AgentError::DatabaseError {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for AgentError {
    fn from(e: serde_json::Error) -> Self {
        AgentError::SerializationError {
            reason: e.to_string(),
        }
    }
}
