//! `LastUpdateState.json`: when the last successful acquisition ran and how often.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::utils::time::{format_local_date, format_local_datetime, format_local_time};

pub const DEFAULT_UPDATE_SOURCE: &str = "DIFF";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase", default)]
pub struct UpdateState {
    pub last_update_date_time: String,
    pub last_update_date: String,
    pub last_update_time: String,
    pub next_update_date_time: String,
    pub last_successful_update: String,
    pub update_count: u32,
    pub last_update_source: String,
}

impl Default for UpdateState {
    fn default() -> Self {
        Self {
            last_update_date_time: String::new(),
            last_update_date: String::new(),
            last_update_time: String::new(),
            next_update_date_time: String::new(),
            last_successful_update: String::new(),
            update_count: 0,
            last_update_source: DEFAULT_UPDATE_SOURCE.to_string(),
        }
    }
}

impl UpdateState {
    /// State after one more successful run from `source` at `at`.
    #[must_use]
    pub fn succeeded(&self, source: &str, at: OffsetDateTime) -> Self {
        let stamp = format_local_datetime(at);
        Self {
            last_update_date_time: stamp.clone(),
            last_update_date: format_local_date(at),
            last_update_time: format_local_time(at),
            next_update_date_time: String::new(),
            last_successful_update: stamp,
            update_count: self.update_count.saturating_add(1),
            last_update_source: source.to_string(),
        }
    }
}

/// Whole-file reads and writes of the state file, serialised in-process.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl StateStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file reads as the default state.
    pub fn load(&self) -> Result<UpdateState> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        read_state(&self.path)
    }

    pub fn save(&self, state: &UpdateState) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        write_state(&self.path, state)
    }

    /// Loads, bumps and rewrites the state under one lock.
    pub fn record_success(&self, source: &str, at: OffsetDateTime) -> Result<UpdateState> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let next = read_state(&self.path)?.succeeded(source, at);
        write_state(&self.path, &next)?;
        log::info!(
            "update state recorded: source={source} count={}",
            next.update_count
        );
        Ok(next)
    }
}

fn read_state(path: &Path) -> Result<UpdateState> {
    if !path.exists() {
        return Ok(UpdateState::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read update state: {}", path.display()))?;
    let raw = raw.trim_start_matches('\u{feff}');
    if raw.trim().is_empty() {
        return Ok(UpdateState::default());
    }
    serde_json::from_str(raw)
        .with_context(|| format!("failed to parse update state: {}", path.display()))
}

fn write_state(path: &Path, state: &UpdateState) -> Result<()> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let encoded = serde_json::to_string_pretty(state).context("failed to encode update state")?;
    std::fs::write(path, encoded)
        .with_context(|| format!("failed to write update state: {}", path.display()))
}
