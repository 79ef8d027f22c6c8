//! The plan store capability contract
//!
//! Every backend implements this one trait; callers hold an
//! `Arc<dyn PlanStore>` and never see which backend is behind it. Operations
//! block on disk or network I/O and carry no built-in cancellation - callers
//! needing timeouts impose them externally.

use async_trait::async_trait;

use crate::entry::{PlanEntry, TopicEntry};
use crate::error::StoreError;

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Register a new plan. Fails `AlreadyExists` on a duplicate
    /// `(project, filename)`.
    async fn create(&self, project: &str, entry: &PlanEntry) -> StoreResult<()>;

    /// Fetch one plan. Fails `NotFound`.
    async fn get(&self, project: &str, filename: &str) -> StoreResult<PlanEntry>;

    /// Replace the metadata of an existing plan. The key is the `filename`
    /// argument; the entry's own filename field is not consulted and the
    /// document body is untouched. Fails `NotFound`.
    async fn update(&self, project: &str, filename: &str, entry: &PlanEntry) -> StoreResult<()>;

    /// Move a plan to a new filename, atomically: `old` vanishes iff `new`
    /// appears. Fails `NotFound` / `AlreadyExists` on collision.
    async fn rename(&self, project: &str, old: &str, new: &str) -> StoreResult<()>;

    /// All plans in the project, sorted by filename ascending.
    async fn list(&self, project: &str) -> StoreResult<Vec<PlanEntry>>;

    /// Plans whose status is in `statuses`, sorted by filename ascending.
    /// Status strings are matched verbatim; unknown values are legal here.
    async fn list_by_status(&self, project: &str, statuses: &[String]) -> StoreResult<Vec<PlanEntry>>;

    /// Plans grouped under `topic`, sorted by filename ascending.
    async fn list_by_topic(&self, project: &str, topic: &str) -> StoreResult<Vec<PlanEntry>>;

    /// All topics in the project, sorted by name ascending.
    async fn list_topics(&self, project: &str) -> StoreResult<Vec<TopicEntry>>;

    /// Register a topic. Topics are immutable once created; fails
    /// `AlreadyExists` on a duplicate `(project, name)`.
    async fn create_topic(&self, project: &str, topic: &TopicEntry) -> StoreResult<()>;

    /// The plan document body, if one has been stored. Fails `NotFound` when
    /// the plan itself is absent.
    async fn get_content(&self, project: &str, filename: &str) -> StoreResult<Option<String>>;

    /// Store the plan document body. Fails `NotFound` when the plan is absent.
    async fn set_content(&self, project: &str, filename: &str, content: &str) -> StoreResult<()>;

    /// Liveness probe. For the remote backend this is where unreachability
    /// surfaces as `Transport`.
    async fn ping(&self) -> StoreResult<()>;

    /// Release underlying resources. Further calls fail `Internal`.
    async fn close(&self) -> StoreResult<()>;
}
