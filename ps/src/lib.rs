//! Plan and topic persistence
//!
//! One capability contract ([`PlanStore`]) with interchangeable backends:
//!
//! - [`LocalStore`] - durable SQLite engine, read-after-write for the process
//!   holding the handle
//! - [`RemoteStore`] - speaks one request/response exchange per operation to a
//!   counterpart server
//! - [`EmbeddedServer`] - serves a [`LocalStore`] on loopback so several
//!   same-host processes can share one engine through [`RemoteStore`]
//!
//! Callers depend only on the trait; the backends behave identically apart
//! from the [`StoreError::Transport`] class, which only the remote client can
//! produce. [`migrate`] holds the one-shot legacy snapshot import.

pub mod api;
pub mod entry;
pub mod error;
pub mod local;
pub mod migrate;
pub mod proto;
pub mod remote;
pub mod server;

pub use api::{PlanStore, StoreResult};
pub use entry::{PlanEntry, PlanStatus, TopicEntry};
pub use error::{InvalidStatus, StoreError};
pub use local::LocalStore;
pub use migrate::{MigrationReport, import_snapshot};
pub use remote::RemoteStore;
pub use server::EmbeddedServer;
