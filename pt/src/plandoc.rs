//! Plan document structure
//!
//! Interface for the collaborator that turns a plan document into ordered
//! waves of tasks. The orchestration loop consumes this when a wave sentinel
//! arrives; implementations live with the control surface.

use thiserror::Error;

/// One task within a wave
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub number: u32,
    pub title: String,
    pub body: String,
}

/// A parallelizable group of tasks; waves run in order, tasks within a wave
/// may run together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wave {
    pub number: u32,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Error)]
pub enum PlanDocError {
    /// The document contains no wave markers at all
    #[error("no wave markers in plan document")]
    NoWaves,

    #[error("malformed plan document: {0}")]
    Malformed(String),
}

/// Parses plan document text into its waves
pub trait PlanDocParser: Send + Sync {
    /// Produce the ordered waves of tasks described by `text`. Fails
    /// [`PlanDocError::NoWaves`] when the document has no wave markers.
    fn parse(&self, text: &str) -> Result<Vec<Wave>, PlanDocError>;
}
