//! Plan and topic records
//!
//! [`PlanEntry`] and [`TopicEntry`] are the two persisted record types, keyed
//! by `(project, filename)` and `(project, name)` respectively. The status is
//! stored as free text so entries written by newer code stay readable and
//! listable; [`PlanStatus`] is the recognized vocabulary, enforced only at the
//! validated write paths (force-override and migration).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvalidStatus;

/// Recognized plan lifecycle statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Registered, no phase in flight
    #[default]
    Ready,
    /// A planner agent is writing or rewriting the plan document
    Planning,
    /// Implementation waves are running
    Implementing,
    /// Awaiting review of the implementation
    Reviewing,
    /// Review approved
    Done,
    /// Abandoned; can be reopened
    Cancelled,
}

impl PlanStatus {
    pub const ALL: [PlanStatus; 6] = [
        PlanStatus::Ready,
        PlanStatus::Planning,
        PlanStatus::Implementing,
        PlanStatus::Reviewing,
        PlanStatus::Done,
        PlanStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Ready => "ready",
            PlanStatus::Planning => "planning",
            PlanStatus::Implementing => "implementing",
            PlanStatus::Reviewing => "reviewing",
            PlanStatus::Done => "done",
            PlanStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlanStatus::Done | PlanStatus::Cancelled)
    }
}

impl fmt::Display for PlanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(PlanStatus::Ready),
            "planning" => Ok(PlanStatus::Planning),
            "implementing" => Ok(PlanStatus::Implementing),
            "reviewing" => Ok(PlanStatus::Reviewing),
            "done" => Ok(PlanStatus::Done),
            "cancelled" => Ok(PlanStatus::Cancelled),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// A tracked unit of work
///
/// The optional plan document body is not part of the record; it lives in its
/// own column and is reached through `get_content`/`set_content` only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Key within the project, e.g. `add-auth.md`
    pub filename: String,

    /// Lifecycle status; an open set at rest (see [`PlanStatus`])
    pub status: String,

    #[serde(default)]
    pub description: String,

    /// Working branch for the implementation phase
    #[serde(default)]
    pub branch: String,

    /// Topic grouping; empty when ungrouped
    #[serde(default)]
    pub topic: String,

    pub created_at: DateTime<Utc>,

    /// Set once an implementation has landed
    #[serde(default)]
    pub implemented: bool,
}

impl PlanEntry {
    /// New entry in the initial `ready` status, stamped now
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            status: PlanStatus::Ready.to_string(),
            description: String::new(),
            branch: String::new(),
            topic: String::new(),
            created_at: Utc::now(),
            implemented: false,
        }
    }
}

/// A named, immutable grouping of plans within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl TopicEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_parse_roundtrip() {
        for status in PlanStatus::ALL {
            let parsed: PlanStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_status_rejects_unknown_name() {
        let err = "paused".parse::<PlanStatus>().unwrap_err();
        assert_eq!(err.0, "paused");
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&PlanStatus::Implementing).unwrap();
        assert_eq!(json, r#""implementing""#);
    }

    #[test]
    fn test_new_entry_defaults() {
        let entry = PlanEntry::new("x.md");
        assert_eq!(entry.filename, "x.md");
        assert_eq!(entry.status, "ready");
        assert!(!entry.implemented);
        assert!(entry.topic.is_empty());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(PlanStatus::Done.is_terminal());
        assert!(PlanStatus::Cancelled.is_terminal());
        assert!(!PlanStatus::Reviewing.is_terminal());
    }
}
