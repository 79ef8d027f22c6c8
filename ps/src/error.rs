//! Store error taxonomy
//!
//! `NotFound`, `AlreadyExists`, and `InvalidInput` are expected conditions a
//! surface can display directly. `Transport` only ever comes from the remote
//! client, so a caller can tell an unreachable server apart from a missing
//! record and fall back to a local engine. `Internal` is an engine or driver
//! failure; it is never retried here and propagates unchanged.

use thiserror::Error;

/// Unrecognized status name at a validated write path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized status: {0}")]
pub struct InvalidStatus(pub String);

/// Errors surfaced by every store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record under the requested key
    #[error("not found: {0}")]
    NotFound(String),

    /// A record already occupies the requested key
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Rejected before touching storage
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The exchange with a remote server could not complete
    #[error("transport: {0}")]
    Transport(String),

    /// Storage engine or driver failure
    #[error("internal: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(project: &str, key: &str) -> Self {
        Self::NotFound(format!("{project}/{key}"))
    }

    pub fn already_exists(project: &str, key: &str) -> Self {
        Self::AlreadyExists(format!("{project}/{key}"))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<InvalidStatus> for StoreError {
    fn from(err: InvalidStatus) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

// Uniqueness violations carry key context the driver error lacks, so the
// engine maps those at the call site; everything else is Internal.
impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_formatting() {
        let err = StoreError::not_found("proj", "x.md");
        assert_eq!(err.to_string(), "not found: proj/x.md");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_status_maps_to_invalid_input() {
        let err: StoreError = InvalidStatus("bogus".to_string()).into();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(err.to_string(), "invalid input: unrecognized status: bogus");
    }

    #[test]
    fn test_transport_is_distinct() {
        let err = StoreError::Transport("connection refused".to_string());
        assert!(err.is_transport());
        assert!(!err.is_not_found());
    }
}
