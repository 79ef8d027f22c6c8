//! Audit log interface
//!
//! Append-only sink for timestamped coordination events, queryable with a
//! capped result size. The surface records what happened (transitions,
//! force-overrides, signal consumption) keyed by kind, project, plan, and
//! the acting instance; implementations live with the control surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Hard cap on query result size
pub const MAX_AUDIT_RESULTS: usize = 500;

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event class, e.g. `transition` or `force_set_status`
    pub kind: String,
    pub project: String,
    #[serde(default)]
    pub plan_file: Option<String>,
    /// The agent or surface instance that acted
    #[serde(default)]
    pub instance: Option<String>,
    pub at: DateTime<Utc>,
    #[serde(default)]
    pub detail: Option<Value>,
}

impl AuditEvent {
    pub fn new(kind: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            project: project.into(),
            plan_file: None,
            instance: None,
            at: Utc::now(),
            detail: None,
        }
    }
}

/// Filter for reading events back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub project: String,
    #[serde(default)]
    pub plan_file: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    MAX_AUDIT_RESULTS
}

impl AuditQuery {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            plan_file: None,
            kind: None,
            since: None,
            until: None,
            limit: MAX_AUDIT_RESULTS,
        }
    }

    /// Requested result size, never above the cap
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_AUDIT_RESULTS)
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink: {0}")]
    Sink(String),
}

/// Append-only audit event sink
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError>;

    /// Events matching `query`, newest first, at most
    /// [`AuditQuery::effective_limit`] of them.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, AuditError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_capped() {
        let mut query = AuditQuery::new("proj");
        assert_eq!(query.effective_limit(), MAX_AUDIT_RESULTS);

        query.limit = 10;
        assert_eq!(query.effective_limit(), 10);

        query.limit = 100_000;
        assert_eq!(query.effective_limit(), MAX_AUDIT_RESULTS);
    }

    #[test]
    fn test_query_defaults_from_serde() {
        let query: AuditQuery = serde_json::from_str(r#"{"project":"proj"}"#).unwrap();
        assert_eq!(query.limit, MAX_AUDIT_RESULTS);
        assert!(query.kind.is_none());
    }
}
