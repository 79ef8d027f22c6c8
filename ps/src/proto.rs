//! Wire messages for the plan store protocol
//!
//! JSON-over-newline: each frame is a single line of JSON followed by `\n`.
//! One request/response exchange per store operation. Domain errors cross the
//! wire with their kind intact; `Transport` never does - it describes the
//! exchange itself failing and only ever originates client-side.

use serde::{Deserialize, Serialize};

use crate::entry::{PlanEntry, TopicEntry};
use crate::error::StoreError;

/// Version string reported by the liveness probe
pub const PROTOCOL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound on a single frame; larger frames end the connection
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Requests from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    Create { project: String, entry: PlanEntry },
    Get { project: String, filename: String },
    Update { project: String, filename: String, entry: PlanEntry },
    Rename { project: String, old: String, new: String },
    List { project: String },
    ListByStatus { project: String, statuses: Vec<String> },
    ListByTopic { project: String, topic: String },
    ListTopics { project: String },
    CreateTopic { project: String, topic: TopicEntry },
    GetContent { project: String, filename: String },
    SetContent { project: String, filename: String, content: String },
    Ping,
}

/// Responses from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    Ok,
    Entry { entry: PlanEntry },
    Entries { entries: Vec<PlanEntry> },
    Topics { topics: Vec<TopicEntry> },
    Content { content: Option<String> },
    Pong { version: String },
    Err { kind: ErrorKind, message: String },
}

/// Error classes that cross the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    Internal,
}

impl From<&StoreError> for Response {
    fn from(err: &StoreError) -> Self {
        let (kind, message) = match err {
            StoreError::NotFound(m) => (ErrorKind::NotFound, m.clone()),
            StoreError::AlreadyExists(m) => (ErrorKind::AlreadyExists, m.clone()),
            StoreError::InvalidInput(m) => (ErrorKind::InvalidInput, m.clone()),
            StoreError::Transport(m) | StoreError::Internal(m) => (ErrorKind::Internal, m.clone()),
        };
        Response::Err { kind, message }
    }
}

/// Rebuild the domain error a server reported
pub fn domain_error(kind: ErrorKind, message: String) -> StoreError {
    match kind {
        ErrorKind::NotFound => StoreError::NotFound(message),
        ErrorKind::AlreadyExists => StoreError::AlreadyExists(message),
        ErrorKind::InvalidInput => StoreError::InvalidInput(message),
        ErrorKind::Internal => StoreError::Internal(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_serialize() {
        let json = serde_json::to_string(&Request::Ping).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_get_serialize() {
        let req = Request::Get {
            project: "proj".to_string(),
            filename: "a.md".to_string(),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"Get","project":"proj","filename":"a.md"}"#);
    }

    #[test]
    fn test_err_response_serialize() {
        let resp = Response::Err {
            kind: ErrorKind::NotFound,
            message: "proj/a.md".to_string(),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"Err","kind":"not_found","message":"proj/a.md"}"#);
    }

    #[test]
    fn test_request_roundtrip() {
        let req = Request::ListByStatus {
            project: "proj".to_string(),
            statuses: vec!["ready".to_string(), "done".to_string()],
        };
        let json = serde_json::to_string(&req).unwrap();
        let parsed: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, req);
    }

    #[test]
    fn test_error_kinds_roundtrip_to_domain() {
        let err = StoreError::already_exists("proj", "a.md");
        let Response::Err { kind, message } = Response::from(&err) else {
            panic!("expected error response");
        };
        let rebuilt = domain_error(kind, message);
        assert!(rebuilt.is_already_exists());
        assert_eq!(rebuilt.to_string(), err.to_string());
    }

    #[test]
    fn test_transport_never_crosses_the_wire() {
        let err = StoreError::Transport("refused".to_string());
        let resp = Response::from(&err);
        assert!(matches!(
            resp,
            Response::Err {
                kind: ErrorKind::Internal,
                ..
            }
        ));
    }
}
