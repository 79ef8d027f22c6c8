//! Sentinel directory scanner
//!
//! Scanning is read-only and infallible from the caller's point of view:
//! malformed names, unreadable files, and a missing directory all degrade to
//! "no signal", so a misbehaving agent cannot disrupt the control surface.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{Signal, WaveSignal};
use crate::lifecycle::Event;

const WAVE_PREFIX: &str = "implement-wave-";

/// One scan's worth of parsed sentinels, unordered and ephemeral
#[derive(Debug, Clone, Default)]
pub struct ScanBatch {
    pub signals: Vec<Signal>,
    pub waves: Vec<WaveSignal>,
}

impl ScanBatch {
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.waves.is_empty()
    }
}

/// Polls a plan directory for sentinel files
#[derive(Debug, Clone)]
pub struct SignalScanner {
    dir: PathBuf,
}

impl SignalScanner {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Parse the directory into typed signals. Events only a user may issue
    /// are discarded here so agent-authored sentinels can never trigger them.
    pub fn scan(&self) -> ScanBatch {
        let mut batch = ScanBatch::default();

        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.dir.display(), error = %e, "signal directory not readable");
                return batch;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }

            // Wave grammar first: `implement-wave-…` must never be read as an
            // `implement-…` event sentinel
            if let Some(wave) = parse_wave(name, &path) {
                debug!(name, wave = wave.wave, plan = %wave.plan_file, "wave sentinel");
                batch.waves.push(wave);
                continue;
            }

            if let Some(signal) = parse_signal(name, &path) {
                if signal.event.is_user_only() {
                    debug!(name, event = %signal.event, "discarding user-only sentinel");
                    continue;
                }
                debug!(name, event = %signal.event, plan = %signal.plan_file, "signal sentinel");
                batch.signals.push(signal);
            }
        }

        batch
    }

    /// Convenience for callers that do not orchestrate waves
    pub fn scan_signals(&self) -> Vec<Signal> {
        self.scan().signals
    }

    /// Delete the originating sentinel file. Call only after the
    /// corresponding transition is durably applied; a crash before this point
    /// costs one harmless re-observation on the next scan.
    pub fn consume(&self, path: &Path) -> std::io::Result<()> {
        fs::remove_file(path)?;
        debug!(path = %path.display(), "sentinel consumed");
        Ok(())
    }
}

/// Strip any embedded path separators down to the base name
fn base_name(raw: &str) -> &str {
    raw.rsplit(['/', '\\']).next().unwrap_or(raw)
}

fn parse_wave(name: &str, path: &Path) -> Option<WaveSignal> {
    let rest = name.strip_prefix(WAVE_PREFIX)?;
    let (number, plan) = rest.split_once('-')?;
    let wave: u32 = number.parse().ok()?;
    if wave == 0 {
        warn!(name, "ignoring wave sentinel with non-positive wave number");
        return None;
    }
    let plan_file = base_name(plan);
    if plan_file.is_empty() {
        return None;
    }
    Some(WaveSignal {
        wave,
        plan_file: plan_file.to_string(),
        path: path.to_path_buf(),
    })
}

fn parse_signal(name: &str, path: &Path) -> Option<Signal> {
    // Longest prefix wins so no registered prefix can shadow another
    let (event, rest) = Event::ALL
        .iter()
        .filter_map(|event| {
            name.strip_prefix(event.sentinel_prefix())
                .and_then(|r| r.strip_prefix('-'))
                .map(|r| (*event, r))
        })
        .max_by_key(|(event, _)| event.sentinel_prefix().len())?;

    let plan_file = base_name(rest);
    if plan_file.is_empty() {
        return None;
    }

    let body = fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    Some(Signal {
        event,
        plan_file: plan_file.to_string(),
        body,
        path: path.to_path_buf(),
    })
}
