//! Sync error types.

use thiserror::Error;

use crate::models::CounterResource;

/// Failure of a single remote operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never produced a response
    #[error("HTTP error: {0}")]
    Http(String),

    /// Credentials were missing or rejected
    #[error("Server rejected credentials (status {0})")]
    Unauthorized(u16),

    /// The server answered with a non-success status
    #[error("Server returned status {0}")]
    Status(u16),

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    Decode(String),

    /// The backend does not implement the operation
    #[error("Operation not supported by server: {0}")]
    Unsupported(String),
}

impl RemoteError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, RemoteError::Unsupported(_))
    }
}

/// Errors surfaced by [`CounterSync`](super::CounterSync) operations.
///
/// Every variant is reported after the engine has already restored a
/// consistent local state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Requested value is negative or out of range; nothing was changed
    #[error("Invalid value {0}: counts must be between 0 and {max}", max = u32::MAX)]
    InvalidInput(i64),

    /// A stepped batch stopped part-way and the local count was reverted
    #[error(
        "Could not update {resource}: step {failed_step} of {attempted} failed ({source}); \
         reverted to {reverted_to}"
    )]
    StepFailed {
        resource: CounterResource,
        /// Steps the server acknowledged before the failure
        applied: u32,
        attempted: u32,
        failed_step: u32,
        reverted_to: u32,
        source: RemoteError,
    },

    /// A single absolute set failed and the local value was reverted
    #[error("Could not update {resource}: {source}; reverted to {reverted_to}")]
    SetFailed {
        resource: CounterResource,
        reverted_to: u32,
        source: RemoteError,
    },

    /// Fetching the authoritative state failed; local state is unchanged
    #[error("Could not load {resource}: {source}")]
    RefreshFailed {
        resource: CounterResource,
        source: RemoteError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failed_message() {
        let err = SyncError::StepFailed {
            resource: CounterResource::Hydration,
            applied: 2,
            attempted: 3,
            failed_step: 3,
            reverted_to: 3,
            source: RemoteError::Status(500),
        };
        let msg = err.to_string();
        assert!(msg.contains("hydration"));
        assert!(msg.contains("step 3 of 3"));
        assert!(msg.contains("reverted to 3"));
    }

    #[test]
    fn test_invalid_input_message() {
        assert!(SyncError::InvalidInput(-1).to_string().contains("-1"));
    }

    #[test]
    fn test_is_unsupported() {
        assert!(RemoteError::Unsupported("set count".into()).is_unsupported());
        assert!(!RemoteError::Status(404).is_unsupported());
    }
}
