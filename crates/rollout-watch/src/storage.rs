//! JSON file holding the last acted-on version and count.

use std::path::{Path, PathBuf};

use crate::types::{PersistedState, WatchError, WatchResult};

/// Reads and writes [`PersistedState`] at a fixed path.
///
/// No locking: runs are expected not to overlap.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load saved state. A missing or empty file yields the defaults.
    pub fn load(&self) -> WatchResult<PersistedState> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no state file, starting fresh");
            return Ok(PersistedState::default());
        }

        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(PersistedState::default());
        }

        serde_json::from_str(&raw).map_err(|e| {
            WatchError::State(format!(
                "Cannot read {}: {e}",
                self.path.display()
            ))
        })
    }

    /// Overwrite the file with `state`.
    pub fn save(&self, state: &PersistedState) -> WatchResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let payload = serde_json::to_string_pretty(state)?;
        std::fs::write(&self.path, payload)?;
        tracing::debug!(
            path = %self.path.display(),
            version = %state.last_version,
            count = state.last_count,
            "state saved"
        );
        Ok(())
    }
}
