//! Advisory plan-directory lock
//!
//! Cooperative same-host exclusion for the transition critical section.
//! Best-effort: when the lock file cannot be created or the filesystem does
//! not support flock, the caller proceeds unlocked.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::Path;
use tracing::{debug, warn};

/// Lock file name inside the plan directory
pub const LOCK_FILE: &str = ".plantrack.lock";

/// Held advisory lock; released on drop
#[derive(Debug)]
pub struct PlanDirLock {
    file: Option<File>,
}

impl PlanDirLock {
    /// Acquire the lock under `dir`, blocking until the current holder
    /// releases it. Any failure degrades to unlocked operation.
    pub fn acquire(dir: &Path) -> Self {
        match try_lock(dir) {
            Ok(file) => {
                debug!(dir = %dir.display(), "plan directory lock acquired");
                Self { file: Some(file) }
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "proceeding without plan directory lock");
                Self { file: None }
            }
        }
    }

    /// False when the lock could not be taken and the caller is running
    /// unlocked
    pub fn is_locked(&self) -> bool {
        self.file.is_some()
    }
}

fn try_lock(dir: &Path) -> std::io::Result<File> {
    fs::create_dir_all(dir)?;
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(dir.join(LOCK_FILE))?;
    FileExt::lock_exclusive(&file)?;
    Ok(file)
}

impl Drop for PlanDirLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take()
            && let Err(e) = FileExt::unlock(&file)
        {
            debug!(error = %e, "lock release failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_acquire_creates_dir_and_lock_file() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("plans");

        let lock = PlanDirLock::acquire(&dir);
        assert!(lock.is_locked());
        assert!(dir.join(LOCK_FILE).exists());
    }

    #[test]
    fn test_reacquire_after_drop() {
        let temp = TempDir::new().unwrap();

        let first = PlanDirLock::acquire(temp.path());
        assert!(first.is_locked());
        drop(first);

        let second = PlanDirLock::acquire(temp.path());
        assert!(second.is_locked());
    }

    #[test]
    fn test_unwritable_dir_degrades_to_unlocked() {
        // A file where the directory should be makes creation fail
        let temp = TempDir::new().unwrap();
        let not_a_dir = temp.path().join("occupied");
        fs::write(&not_a_dir, "x").unwrap();

        let lock = PlanDirLock::acquire(&not_a_dir);
        assert!(!lock.is_locked());
    }
}
