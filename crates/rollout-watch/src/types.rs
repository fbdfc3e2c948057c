//! Core data types for rollout observations and persisted state.

use serde::{Deserialize, Serialize};

/// Version label stored before any firmware has ever been seen.
pub const NO_VERSION: &str = "None";

/// Default growth (in vehicles) that counts as a new wave.
pub const DEFAULT_WAVE_THRESHOLD: u64 = 5;

/// The latest firmware row as read from the rollout table on one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub version: String,
    /// Installed + pending.
    pub count: u64,
}

impl Observation {
    pub fn new(version: impl Into<String>, count: u64) -> Self {
        Self {
            version: version.into(),
            count,
        }
    }
}

/// The last version and count this watcher acted on.
///
/// Stored on disk as a flat two-field JSON object. Fields missing from an
/// existing file take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default = "default_last_version")]
    pub last_version: String,
    #[serde(default)]
    pub last_count: u64,
}

fn default_last_version() -> String {
    NO_VERSION.to_string()
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            last_version: default_last_version(),
            last_count: 0,
        }
    }
}

impl PersistedState {
    pub fn new(last_version: impl Into<String>, last_count: u64) -> Self {
        Self {
            last_version: last_version.into(),
            last_count,
        }
    }

    /// True until a real version has been recorded.
    pub fn is_fresh(&self) -> bool {
        self.last_version == NO_VERSION
    }
}

/// Errors that can occur in the rollout-watch library.
#[derive(thiserror::Error, Debug)]
pub enum WatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("State error: {0}")]
    State(String),
}

/// Convenience result type.
pub type WatchResult<T> = Result<T, WatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = PersistedState::default();
        assert_eq!(state.last_version, "None");
        assert_eq!(state.last_count, 0);
        assert!(state.is_fresh());
    }

    #[test]
    fn test_state_missing_fields_default() {
        let state: PersistedState = serde_json::from_str("{}").unwrap();
        assert_eq!(state, PersistedState::default());

        let state: PersistedState =
            serde_json::from_str(r#"{"last_version": "2025.44.1"}"#).unwrap();
        assert_eq!(state.last_version, "2025.44.1");
        assert_eq!(state.last_count, 0);
        assert!(!state.is_fresh());
    }

    #[test]
    fn test_state_serializes_two_fields() {
        let state = PersistedState::new("2025.44.1", 1006);
        let value = serde_json::to_value(&state).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert_eq!(obj["last_version"], "2025.44.1");
        assert_eq!(obj["last_count"], 1006);
    }
}
