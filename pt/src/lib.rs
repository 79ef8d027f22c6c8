//! Plantrack - plan lifecycle coordination
//!
//! Tracks plans through their lifecycle as independent agent processes report
//! phase completion via sentinel files, with no live channel between agents
//! and the interactive control surface.
//!
//! # Flow
//!
//! An agent finishes a phase and drops a sentinel file into the plan
//! directory. The control surface polls [`SignalScanner`], which parses the
//! directory into typed signals (discarding anything only a user may issue).
//! [`StateMachine`] validates each signal's event against the transition
//! table and persists the new status through the configured
//! [`planstore::PlanStore`] backend. Only then is the sentinel consumed;
//! a crash in between costs at most one harmless re-observation.
//!
//! # Modules
//!
//! - [`lifecycle`] - the transition table, events, and StateMachine
//! - [`signals`] - sentinel-file scanning and consumption
//! - [`plandoc`] / [`audit`] - interfaces the control surface implements
//! - [`config`] - surface configuration

pub mod audit;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod plandoc;
pub mod signals;

pub use audit::{AuditError, AuditEvent, AuditQuery, AuditSink, MAX_AUDIT_RESULTS};
pub use config::Config;
pub use lifecycle::{Event, LifecycleError, PlanDirLock, StateMachine, next_state};
pub use logging::init_tracing;
pub use plandoc::{PlanDocError, PlanDocParser, Task, Wave};
pub use signals::{ScanBatch, Signal, SignalScanner, WaveSignal};

// Re-export the persistence crate so downstream callers need one import root
pub use planstore;
