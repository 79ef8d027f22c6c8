//! Sentinel-file signals
//!
//! Agent processes report phase completion by dropping marker files into the
//! plan directory; the control surface polls a [`SignalScanner`] and applies
//! the parsed events. The directory is the only channel between agents and
//! the surface - crash-tolerant, dependency-free, at-least-once.
//!
//! Two filename grammars are recognized:
//!
//! - `<prefix>-<planFilename>` where the prefix is the kebab-case form of a
//!   lifecycle event, e.g. `planner-finished-add-auth.md`
//! - `implement-wave-<N>-<planFilename>`, announcing that wave N of the
//!   plan's implementation should begin; carries no lifecycle event
//!
//! Agents only ever append new sentinel files; the surface alone reads and
//! deletes them, so there are no write-write races on this artifact class.

mod scanner;

pub use scanner::{ScanBatch, SignalScanner};

use std::path::PathBuf;

use crate::lifecycle::Event;

/// A parsed agent sentinel mapped to a lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub event: Event,
    /// Base filename of the plan the sentinel refers to
    pub plan_file: String,
    /// Trimmed sentinel file content, e.g. reviewer feedback
    pub body: Option<String>,
    /// Originating sentinel file, deleted on consumption
    pub path: PathBuf,
}

impl Signal {
    /// Callers buffering scans dedup on this key; re-scans yield the same
    /// sentinel again until it is consumed.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.event, self.plan_file)
    }
}

/// A parsed wave sentinel; drives orchestration directly, no lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveSignal {
    pub wave: u32,
    pub plan_file: String,
    pub path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_is_event_plus_plan() {
        let signal = Signal {
            event: Event::PlannerFinished,
            plan_file: "a.md".to_string(),
            body: None,
            path: PathBuf::from("/tmp/planner-finished-a.md"),
        };
        assert_eq!(signal.dedup_key(), "planner_finished:a.md");
    }
}
