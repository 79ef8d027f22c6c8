//! Lifecycle events and the transition table

use planstore::PlanStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Events that advance a plan's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    PlanStart,
    PlannerFinished,
    ImplementStart,
    ImplementFinished,
    ReviewApproved,
    ReviewChangesRequested,
    StartOver,
    Cancel,
    Reopen,
}

impl Event {
    pub const ALL: [Event; 9] = [
        Event::PlanStart,
        Event::PlannerFinished,
        Event::ImplementStart,
        Event::ImplementFinished,
        Event::ReviewApproved,
        Event::ReviewChangesRequested,
        Event::StartOver,
        Event::Cancel,
        Event::Reopen,
    ];

    /// Events only the interactive surface may issue. The signal-ingestion
    /// boundary discards these so an agent-authored sentinel can never
    /// trigger them.
    pub fn is_user_only(&self) -> bool {
        matches!(self, Event::StartOver | Event::Cancel | Event::Reopen)
    }

    /// Kebab-case sentinel filename prefix for this event
    pub fn sentinel_prefix(&self) -> &'static str {
        match self {
            Event::PlanStart => "plan-start",
            Event::PlannerFinished => "planner-finished",
            Event::ImplementStart => "implement-start",
            Event::ImplementFinished => "implement-finished",
            Event::ReviewApproved => "review-approved",
            Event::ReviewChangesRequested => "review-changes-requested",
            Event::StartOver => "start-over",
            Event::Cancel => "cancel",
            Event::Reopen => "reopen",
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Event::PlanStart => "plan_start",
            Event::PlannerFinished => "planner_finished",
            Event::ImplementStart => "implement_start",
            Event::ImplementFinished => "implement_finished",
            Event::ReviewApproved => "review_approved",
            Event::ReviewChangesRequested => "review_changes_requested",
            Event::StartOver => "start_over",
            Event::Cancel => "cancel",
            Event::Reopen => "reopen",
        };
        f.write_str(name)
    }
}

/// Look up the tabulated next state. Any pair not listed here is rejected.
pub fn next_state(from: PlanStatus, event: Event) -> Option<PlanStatus> {
    use Event::*;
    use PlanStatus::*;

    match (from, event) {
        (Ready, PlanStart) => Some(Planning),
        (Ready, ImplementStart) => Some(Implementing),
        (Ready, Cancel) => Some(Cancelled),

        // Self-transition: a planner that crashed mid-phase restarts cleanly
        (Planning, PlanStart) => Some(Planning),
        (Planning, PlannerFinished) => Some(Ready),
        (Planning, Cancel) => Some(Cancelled),

        (Implementing, ImplementFinished) => Some(Reviewing),
        (Implementing, Cancel) => Some(Cancelled),

        (Reviewing, ReviewApproved) => Some(Done),
        (Reviewing, ReviewChangesRequested) => Some(Implementing),
        (Reviewing, Cancel) => Some(Cancelled),

        (Done, StartOver) => Some(Planning),
        (Done, Cancel) => Some(Cancelled),

        (Cancelled, Reopen) => Some(Planning),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Event::*;
    use PlanStatus::*;

    const TABLE: [(PlanStatus, Event, PlanStatus); 14] = [
        (Ready, PlanStart, Planning),
        (Ready, ImplementStart, Implementing),
        (Ready, Cancel, Cancelled),
        (Planning, PlanStart, Planning),
        (Planning, PlannerFinished, Ready),
        (Planning, Cancel, Cancelled),
        (Implementing, ImplementFinished, Reviewing),
        (Implementing, Cancel, Cancelled),
        (Reviewing, ReviewApproved, Done),
        (Reviewing, ReviewChangesRequested, Implementing),
        (Reviewing, Cancel, Cancelled),
        (Done, StartOver, Planning),
        (Done, Cancel, Cancelled),
        (Cancelled, Reopen, Planning),
    ];

    #[test]
    fn test_every_tabulated_pair_yields_its_next_state() {
        for (from, event, to) in TABLE {
            assert_eq!(next_state(from, event), Some(to), "{from} + {event}");
        }
    }

    #[test]
    fn test_every_unlisted_pair_is_rejected() {
        for from in PlanStatus::ALL {
            for event in Event::ALL {
                let tabulated = TABLE.iter().any(|(f, e, _)| *f == from && *e == event);
                if !tabulated {
                    assert_eq!(next_state(from, event), None, "{from} + {event}");
                }
            }
        }
    }

    #[test]
    fn test_user_only_flags() {
        assert!(StartOver.is_user_only());
        assert!(Cancel.is_user_only());
        assert!(Reopen.is_user_only());
        for event in [PlanStart, PlannerFinished, ImplementStart, ImplementFinished, ReviewApproved, ReviewChangesRequested] {
            assert!(!event.is_user_only(), "{event}");
        }
    }

    #[test]
    fn test_sentinel_prefixes_are_distinct() {
        for a in Event::ALL {
            for b in Event::ALL {
                if a != b {
                    assert_ne!(a.sentinel_prefix(), b.sentinel_prefix());
                }
            }
        }
    }

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(PlanStart.to_string(), "plan_start");
        assert_eq!(ReviewChangesRequested.to_string(), "review_changes_requested");
    }
}
