//! Legacy snapshot import
//!
//! One-shot import of the old flat-file cache: a single JSON document holding
//! plan and topic records, with plan bodies as plain-text sibling files named
//! by each plan's filename key. The import is resumable - records that
//! already exist are skipped, any other failure aborts the run without
//! rolling back prior writes - and re-running after a full success performs
//! zero writes.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{PlanStore, StoreResult};
use crate::entry::{PlanEntry, PlanStatus, TopicEntry};
use crate::error::StoreError;

#[derive(Debug, Clone, Deserialize)]
struct LegacyPlan {
    status: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    branch: String,
    #[serde(default)]
    topic: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    implemented: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct LegacyTopic {
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacySnapshot {
    #[serde(default)]
    plans: BTreeMap<String, LegacyPlan>,
    #[serde(default)]
    topics: BTreeMap<String, LegacyTopic>,
}

/// Counters from one import run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub plans_imported: usize,
    pub plans_skipped: usize,
    pub topics_imported: usize,
    pub topics_skipped: usize,
    pub bodies_imported: usize,
}

impl MigrationReport {
    /// True when the run changed nothing
    pub fn is_noop(&self) -> bool {
        self.plans_imported == 0 && self.topics_imported == 0 && self.bodies_imported == 0
    }
}

/// Import the snapshot at `snapshot` into `store` under `project`.
///
/// A missing snapshot file is success with zero records. Status names are
/// validated strictly; an unrecognized one aborts the run as `InvalidInput`.
pub async fn import_snapshot(
    store: &dyn PlanStore,
    project: &str,
    snapshot: &Path,
) -> StoreResult<MigrationReport> {
    let mut report = MigrationReport::default();

    if !snapshot.exists() {
        info!(snapshot = %snapshot.display(), "no legacy snapshot, nothing to import");
        return Ok(report);
    }

    let raw = std::fs::read_to_string(snapshot)?;
    let parsed: LegacySnapshot = serde_json::from_str(&raw).map_err(|e| {
        StoreError::InvalidInput(format!("malformed snapshot {}: {e}", snapshot.display()))
    })?;
    let base = snapshot.parent().unwrap_or_else(|| Path::new("."));

    for (filename, legacy) in &parsed.plans {
        let status: PlanStatus = legacy.status.parse()?;
        let entry = PlanEntry {
            filename: filename.clone(),
            status: status.to_string(),
            description: legacy.description.clone(),
            branch: legacy.branch.clone(),
            topic: legacy.topic.clone(),
            created_at: legacy.created_at,
            implemented: legacy.implemented,
        };

        match store.create(project, &entry).await {
            Ok(()) => {
                report.plans_imported += 1;
                let body_path = base.join(filename);
                if body_path.is_file() {
                    let body = std::fs::read_to_string(&body_path)?;
                    store.set_content(project, filename, &body).await?;
                    report.bodies_imported += 1;
                }
            }
            Err(e) if e.is_already_exists() => {
                debug!(filename, "plan already migrated, skipping");
                report.plans_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    for (name, legacy) in &parsed.topics {
        let topic = TopicEntry {
            name: name.clone(),
            created_at: legacy.created_at,
        };
        match store.create_topic(project, &topic).await {
            Ok(()) => report.topics_imported += 1,
            Err(e) if e.is_already_exists() => {
                debug!(name, "topic already migrated, skipping");
                report.topics_skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        plans = report.plans_imported,
        plans_skipped = report.plans_skipped,
        topics = report.topics_imported,
        topics_skipped = report.topics_skipped,
        bodies = report.bodies_imported,
        "legacy snapshot import complete"
    );
    Ok(report)
}
