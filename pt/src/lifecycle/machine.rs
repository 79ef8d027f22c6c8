//! Plan state machine
//!
//! Validates and applies lifecycle transitions for one project's plans,
//! delegating persistence to the configured store. Nothing is cached between
//! calls - every operation re-reads authoritative state, so several surfaces
//! and agent helpers can coexist against one store.

use std::path::PathBuf;
use std::sync::Arc;

use planstore::{InvalidStatus, PlanStatus, PlanStore, StoreError};
use thiserror::Error;
use tracing::{debug, info};

use super::event::{Event, next_state};
use super::lock::PlanDirLock;
use crate::signals::Signal;

/// Errors from lifecycle operations
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The (state, event) pair is not in the transition table
    #[error("invalid transition: event {event} in state {state}")]
    InvalidTransition { state: String, event: Event },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LifecycleError {
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }
}

/// Applies validated transitions for one project
pub struct StateMachine {
    store: Arc<dyn PlanStore>,
    project: String,
    plan_dir: PathBuf,
}

impl StateMachine {
    pub fn new(store: Arc<dyn PlanStore>, project: impl Into<String>, plan_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            project: project.into(),
            plan_dir: plan_dir.into(),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn store(&self) -> &Arc<dyn PlanStore> {
        &self.store
    }

    /// Apply `event` to `plan_file` and persist the tabulated next status,
    /// returning it. The read-check-write sequence runs under the advisory
    /// plan-directory lock; a failed validation leaves the stored status
    /// untouched.
    pub async fn transition(&self, plan_file: &str, event: Event) -> Result<PlanStatus, LifecycleError> {
        let _lock = PlanDirLock::acquire(&self.plan_dir);

        let mut entry = self.store.get(&self.project, plan_file).await?;
        // A stored status outside the recognized vocabulary has no table row,
        // so every event is invalid for it; the raw string is reported as-is.
        let next = entry
            .status
            .parse::<PlanStatus>()
            .ok()
            .and_then(|current| next_state(current, event));
        let Some(next) = next else {
            debug!(
                project = %self.project,
                plan = %plan_file,
                state = %entry.status,
                %event,
                "transition rejected"
            );
            return Err(LifecycleError::InvalidTransition {
                state: entry.status,
                event,
            });
        };

        entry.status = next.to_string();
        self.store.update(&self.project, plan_file, &entry).await?;

        info!(project = %self.project, plan = %plan_file, %event, status = %next, "transition applied");
        Ok(next)
    }

    /// Transition by a scanned signal's event. The signal boundary has
    /// already discarded user-only events; a stale re-delivery is rejected
    /// here as an invalid transition.
    pub async fn apply_signal(&self, signal: &Signal) -> Result<PlanStatus, LifecycleError> {
        self.transition(&signal.plan_file, signal.event).await
    }

    /// Set a status directly, bypassing the table. The name must still be a
    /// recognized status; anything else is rejected without touching the
    /// stored entry.
    pub async fn force_set_status(&self, plan_file: &str, status: &str) -> Result<PlanStatus, LifecycleError> {
        let parsed: PlanStatus = status
            .parse()
            .map_err(|e: InvalidStatus| StoreError::from(e))?;

        let mut entry = self.store.get(&self.project, plan_file).await?;
        let previous = std::mem::replace(&mut entry.status, parsed.to_string());
        self.store.update(&self.project, plan_file, &entry).await?;

        info!(
            project = %self.project,
            plan = %plan_file,
            from = %previous,
            to = %parsed,
            "status force-set"
        );
        Ok(parsed)
    }
}
