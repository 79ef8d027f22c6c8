//! Surface configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};

/// Configuration for a control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base data directory holding the database
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Project the surface operates on
    #[serde(default = "default_project")]
    pub project: String,

    /// Directory agents drop sentinel files into; also holds the advisory
    /// lock file
    #[serde(default = "default_plan_dir")]
    pub plan_dir: PathBuf,

    /// Polling cadence for signal scans, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// When set, reach the store through a served address instead of opening
    /// the local database directly
    #[serde(default)]
    pub store_addr: Option<String>,
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("plantrack")
}

fn default_project() -> String {
    "default".to_string()
}

fn default_plan_dir() -> PathBuf {
    PathBuf::from(".plans")
}

fn default_poll_interval_secs() -> u64 {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            project: default_project(),
            plan_dir: default_plan_dir(),
            poll_interval_secs: default_poll_interval_secs(),
            store_addr: None,
        }
    }
}

impl Config {
    /// Load from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .context(format!("failed to read config: {}", path.display()))?;
        let config = serde_yaml::from_str(&raw)
            .context(format!("failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    /// Path of the plan database
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("plantrack.db")
    }

    /// Polling cadence as a Duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.project, "default");
        assert_eq!(config.poll_interval_secs, 5);
        assert!(config.store_addr.is_none());
        assert!(config.db_path().ends_with("plantrack.db"));
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("config.yml");
        std::fs::write(&path, "project: web\nstore_addr: \"127.0.0.1:7070\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.project, "web");
        assert_eq!(config.store_addr.as_deref(), Some("127.0.0.1:7070"));
        assert_eq!(config.poll_interval_secs, 5);
    }

    #[test]
    fn test_poll_interval_duration() {
        let config = Config {
            poll_interval_secs: 30,
            ..Default::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }
}
