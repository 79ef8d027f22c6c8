//! SQLite-backed plan store
//!
//! Single durable engine holding the `plans` and `topics` relations. All
//! access serializes through one connection mutex; WAL mode and a busy
//! timeout keep concurrent handles from other processes from failing fast on
//! lock contention. Uniqueness violations are translated into the domain
//! `AlreadyExists` error.

use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::api::{PlanStore, StoreResult};
use crate::entry::{PlanEntry, TopicEntry};
use crate::error::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Durable local engine
pub struct LocalStore {
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
}

impl LocalStore {
    /// Open or create the database at `path`, creating parent directories as
    /// needed and bringing the schema up to date.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;

        // WAL keeps readers from other processes working while we write
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        run_migrations(&conn)?;
        debug!(path = %path.display(), "opened plan store");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path,
        })
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Internal("connection mutex poisoned".to_string()))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| StoreError::Internal("store is closed".to_string()))?;
        f(conn)
    }
}

fn get_schema_version(conn: &Connection) -> StoreResult<i32> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}

fn run_migrations(conn: &Connection) -> StoreResult<()> {
    let current = get_schema_version(conn)?;
    if current >= SCHEMA_VERSION {
        return Ok(());
    }

    if current < 1 {
        info!("running migration 1: plans and topics relations");
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS plans (
                project TEXT NOT NULL,
                filename TEXT NOT NULL,
                status TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                branch TEXT NOT NULL DEFAULT '',
                topic TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                implemented INTEGER NOT NULL DEFAULT 0,
                content TEXT,
                PRIMARY KEY (project, filename)
            );

            CREATE INDEX IF NOT EXISTS idx_plans_status
                ON plans(project, status);

            CREATE INDEX IF NOT EXISTS idx_plans_topic
                ON plans(project, topic);

            CREATE TABLE IF NOT EXISTS topics (
                project TEXT NOT NULL,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                PRIMARY KEY (project, name)
            );
            "#,
        )?;
        conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [1])?;
    }

    Ok(())
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn map_plan_row(row: &rusqlite::Row) -> rusqlite::Result<PlanEntry> {
    let created_at: String = row.get(5)?;
    Ok(PlanEntry {
        filename: row.get(0)?,
        status: row.get(1)?,
        description: row.get(2)?,
        branch: row.get(3)?,
        topic: row.get(4)?,
        created_at: parse_timestamp(&created_at),
        implemented: row.get(6)?,
    })
}

const PLAN_COLUMNS: &str = "filename, status, description, branch, topic, created_at, implemented";

#[async_trait]
impl PlanStore for LocalStore {
    async fn create(&self, project: &str, entry: &PlanEntry) -> StoreResult<()> {
        debug!(project, filename = %entry.filename, "create plan");
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO plans (project, filename, status, description, branch, topic, created_at, implemented)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    project,
                    entry.filename,
                    entry.status,
                    entry.description,
                    entry.branch,
                    entry.topic,
                    entry.created_at.to_rfc3339(),
                    entry.implemented,
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::already_exists(project, &entry.filename)
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    async fn get(&self, project: &str, filename: &str) -> StoreResult<PlanEntry> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {PLAN_COLUMNS} FROM plans WHERE project = ?1 AND filename = ?2"),
                params![project, filename],
                map_plan_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(project, filename))
        })
    }

    async fn update(&self, project: &str, filename: &str, entry: &PlanEntry) -> StoreResult<()> {
        debug!(project, filename, status = %entry.status, "update plan");
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE plans
                 SET status = ?3, description = ?4, branch = ?5, topic = ?6, created_at = ?7, implemented = ?8
                 WHERE project = ?1 AND filename = ?2",
                params![
                    project,
                    filename,
                    entry.status,
                    entry.description,
                    entry.branch,
                    entry.topic,
                    entry.created_at.to_rfc3339(),
                    entry.implemented,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(project, filename));
            }
            Ok(())
        })
    }

    async fn rename(&self, project: &str, old: &str, new: &str) -> StoreResult<()> {
        debug!(project, old, new, "rename plan");
        self.with_conn(|conn| {
            // Single statement: the old key vanishes iff the new one appears
            let changed = conn
                .execute(
                    "UPDATE plans SET filename = ?3 WHERE project = ?1 AND filename = ?2",
                    params![project, old, new],
                )
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        StoreError::already_exists(project, new)
                    } else {
                        e.into()
                    }
                })?;
            if changed == 0 {
                return Err(StoreError::not_found(project, old));
            }
            Ok(())
        })
    }

    async fn list(&self, project: &str) -> StoreResult<Vec<PlanEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM plans WHERE project = ?1 ORDER BY filename"
            ))?;
            let entries = stmt
                .query_map([project], map_plan_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    async fn list_by_status(&self, project: &str, statuses: &[String]) -> StoreResult<Vec<PlanEntry>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let placeholders = (0..statuses.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "SELECT {PLAN_COLUMNS} FROM plans
                 WHERE project = ?1 AND status IN ({placeholders})
                 ORDER BY filename"
            );

            let mut params_vec: Vec<&dyn rusqlite::ToSql> = vec![&project as &dyn rusqlite::ToSql];
            for status in statuses {
                params_vec.push(status as &dyn rusqlite::ToSql);
            }

            let mut stmt = conn.prepare(&sql)?;
            let entries = stmt
                .query_map(params_vec.as_slice(), map_plan_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    async fn list_by_topic(&self, project: &str, topic: &str) -> StoreResult<Vec<PlanEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM plans WHERE project = ?1 AND topic = ?2 ORDER BY filename"
            ))?;
            let entries = stmt
                .query_map(params![project, topic], map_plan_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(entries)
        })
    }

    async fn list_topics(&self, project: &str) -> StoreResult<Vec<TopicEntry>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT name, created_at FROM topics WHERE project = ?1 ORDER BY name")?;
            let topics = stmt
                .query_map([project], |row| {
                    let created_at: String = row.get(1)?;
                    Ok(TopicEntry {
                        name: row.get(0)?,
                        created_at: parse_timestamp(&created_at),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(topics)
        })
    }

    async fn create_topic(&self, project: &str, topic: &TopicEntry) -> StoreResult<()> {
        debug!(project, name = %topic.name, "create topic");
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO topics (project, name, created_at) VALUES (?1, ?2, ?3)",
                params![project, topic.name, topic.created_at.to_rfc3339()],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::already_exists(project, &topic.name)
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    async fn get_content(&self, project: &str, filename: &str) -> StoreResult<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT content FROM plans WHERE project = ?1 AND filename = ?2",
                params![project, filename],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(project, filename))
        })
    }

    async fn set_content(&self, project: &str, filename: &str, content: &str) -> StoreResult<()> {
        debug!(project, filename, bytes = content.len(), "set plan content");
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE plans SET content = ?3 WHERE project = ?1 AND filename = ?2",
                params![project, filename, content],
            )?;
            if changed == 0 {
                return Err(StoreError::not_found(project, filename));
            }
            Ok(())
        })
    }

    async fn ping(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }

    async fn close(&self) -> StoreResult<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StoreError::Internal("connection mutex poisoned".to_string()))?;
        if let Some(conn) = guard.take() {
            conn.close()
                .map_err(|(_, e)| StoreError::Internal(e.to_string()))?;
            debug!(path = %self.path.display(), "plan store closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(temp: &TempDir) -> LocalStore {
        LocalStore::open(temp.path().join("plans.db")).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_get_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut entry = PlanEntry::new("a.md");
        entry.description = "add auth".to_string();
        entry.branch = "feat/auth".to_string();
        store.create("proj", &entry).await.unwrap();

        let got = store.get("proj", "a.md").await.unwrap();
        assert_eq!(got, entry);
    }

    #[tokio::test]
    async fn test_duplicate_create_leaves_original() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut first = PlanEntry::new("a.md");
        first.description = "original".to_string();
        store.create("proj", &first).await.unwrap();

        let mut second = PlanEntry::new("a.md");
        second.description = "imposter".to_string();
        let err = store.create("proj", &second).await.unwrap_err();
        assert!(err.is_already_exists());

        let got = store.get("proj", "a.md").await.unwrap();
        assert_eq!(got.description, "original");
    }

    #[tokio::test]
    async fn test_get_missing_fails_not_found() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let err = store.get("proj", "ghost.md").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_update_missing_fails_not_found() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let entry = PlanEntry::new("ghost.md");
        let err = store.update("proj", "ghost.md", &entry).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rename_is_atomic() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut entry = PlanEntry::new("old.md");
        entry.description = "payload".to_string();
        store.create("proj", &entry).await.unwrap();
        store.set_content("proj", "old.md", "body text").await.unwrap();

        store.rename("proj", "old.md", "new.md").await.unwrap();

        assert!(store.get("proj", "old.md").await.unwrap_err().is_not_found());
        let moved = store.get("proj", "new.md").await.unwrap();
        assert_eq!(moved.description, "payload");
        assert_eq!(
            store.get_content("proj", "new.md").await.unwrap().as_deref(),
            Some("body text")
        );
    }

    #[tokio::test]
    async fn test_rename_collision_fails_already_exists() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.create("proj", &PlanEntry::new("a.md")).await.unwrap();
        store.create("proj", &PlanEntry::new("b.md")).await.unwrap();

        let err = store.rename("proj", "a.md", "b.md").await.unwrap_err();
        assert!(err.is_already_exists());
        // Both originals still present
        store.get("proj", "a.md").await.unwrap();
        store.get("proj", "b.md").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_sorted_by_filename() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        for name in ["c.md", "a.md", "b.md"] {
            store.create("proj", &PlanEntry::new(name)).await.unwrap();
        }
        store.create("other", &PlanEntry::new("z.md")).await.unwrap();

        let names: Vec<String> = store
            .list("proj")
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.filename)
            .collect();
        assert_eq!(names, ["a.md", "b.md", "c.md"]);
    }

    #[tokio::test]
    async fn test_list_by_status_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut planning = PlanEntry::new("b.md");
        planning.status = "planning".to_string();
        store.create("proj", &planning).await.unwrap();

        let mut done = PlanEntry::new("a.md");
        done.status = "done".to_string();
        store.create("proj", &done).await.unwrap();

        store.create("proj", &PlanEntry::new("c.md")).await.unwrap();

        let hits = store
            .list_by_status("proj", &["planning".to_string(), "done".to_string()])
            .await
            .unwrap();
        let names: Vec<&str> = hits.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, ["a.md", "b.md"]);

        let none = store.list_by_status("proj", &[]).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_by_status_passes_unknown_values_through() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut foreign = PlanEntry::new("f.md");
        foreign.status = "triaging".to_string();
        store.create("proj", &foreign).await.unwrap();

        let hits = store
            .list_by_status("proj", &["triaging".to_string()])
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].status, "triaging");
    }

    #[tokio::test]
    async fn test_list_by_topic() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let mut grouped = PlanEntry::new("a.md");
        grouped.topic = "auth".to_string();
        store.create("proj", &grouped).await.unwrap();
        store.create("proj", &PlanEntry::new("b.md")).await.unwrap();

        let hits = store.list_by_topic("proj", "auth").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].filename, "a.md");
    }

    #[tokio::test]
    async fn test_topics_create_list_duplicate() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.create_topic("proj", &TopicEntry::new("beta")).await.unwrap();
        store.create_topic("proj", &TopicEntry::new("alpha")).await.unwrap();

        let err = store
            .create_topic("proj", &TopicEntry::new("alpha"))
            .await
            .unwrap_err();
        assert!(err.is_already_exists());

        let names: Vec<String> = store
            .list_topics("proj")
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, ["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_content_roundtrip() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.create("proj", &PlanEntry::new("a.md")).await.unwrap();
        assert_eq!(store.get_content("proj", "a.md").await.unwrap(), None);

        store.set_content("proj", "a.md", "# Plan\n").await.unwrap();
        assert_eq!(
            store.get_content("proj", "a.md").await.unwrap().as_deref(),
            Some("# Plan\n")
        );

        assert!(
            store
                .get_content("proj", "ghost.md")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn test_close_is_terminal_and_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        store.ping().await.unwrap();
        store.close().await.unwrap();
        store.close().await.unwrap();

        let err = store.ping().await.unwrap_err();
        assert!(matches!(err, StoreError::Internal(_)));
    }

    #[tokio::test]
    async fn test_reopen_preserves_data() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plans.db");

        let store = LocalStore::open(&path).unwrap();
        store.create("proj", &PlanEntry::new("a.md")).await.unwrap();
        store.close().await.unwrap();

        let reopened = LocalStore::open(&path).unwrap();
        reopened.get("proj", "a.md").await.unwrap();
    }
}
