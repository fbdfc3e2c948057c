//! Rollout change detection — classify an observation against saved state.

use serde::{Deserialize, Serialize};

use crate::types::{Observation, PersistedState, DEFAULT_WAVE_THRESHOLD};

/// Link text used in new-build messages.
const DETAIL_LINK_LABEL: &str = "TeslaFi";

/// What one run observed relative to the saved baseline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// The top row carries a version we have not recorded yet.
    NewBuild { version: String, count: u64 },
    /// Same version, and the count grew by at least the wave threshold.
    Wave {
        version: String,
        diff: u64,
        count: u64,
    },
    /// Nothing worth announcing. The baseline still moves to `count`.
    NoChange { count: u64 },
}

impl Decision {
    /// Short name used in logs and JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Decision::NewBuild { .. } => "new_build",
            Decision::Wave { .. } => "wave",
            Decision::NoChange { .. } => "no_change",
        }
    }

    /// Whether this outcome produces a notification.
    pub fn is_alert(&self) -> bool {
        !matches!(self, Decision::NoChange { .. })
    }

    /// State to persist after acting on this decision.
    pub fn next_state(&self, prior: &PersistedState) -> PersistedState {
        match self {
            Decision::NewBuild { version, count } => PersistedState::new(version.clone(), *count),
            Decision::Wave { count, .. } | Decision::NoChange { count } => {
                PersistedState::new(prior.last_version.clone(), *count)
            }
        }
    }

    /// Markdown notification text, or `None` when nothing should be sent.
    pub fn message(&self, source_url: &str) -> Option<String> {
        match self {
            Decision::NewBuild { version, count } => Some(format!(
                "🆕 *New Build* – `{version}`\nInitial Rollout to {count} on [{DETAIL_LINK_LABEL}]({})",
                detail_url(source_url, version)
            )),
            Decision::Wave { version, diff, .. } => Some(format!(
                "🌊 A new wave of `{version}` is rolling out now.\nRollout Size: {diff}"
            )),
            Decision::NoChange { .. } => None,
        }
    }
}

/// Deep link to the per-version page of the rollout table.
pub fn detail_url(source_url: &str, version: &str) -> String {
    let sep = if source_url.contains('?') { '&' } else { '?' };
    format!("{source_url}{sep}detail={version}")
}

/// Classifies observations using a fixed wave threshold.
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    wave_threshold: u64,
}

impl Comparator {
    pub fn new(wave_threshold: u64) -> Self {
        Self { wave_threshold }
    }

    pub fn wave_threshold(&self) -> u64 {
        self.wave_threshold
    }

    /// Classify `observed` against `prior`.
    ///
    /// A version change always wins over a wave, whatever the counts say.
    pub fn classify(&self, prior: &PersistedState, observed: &Observation) -> Decision {
        if observed.version != prior.last_version {
            return Decision::NewBuild {
                version: observed.version.clone(),
                count: observed.count,
            };
        }

        if observed.count >= prior.last_count.saturating_add(self.wave_threshold) {
            return Decision::Wave {
                version: observed.version.clone(),
                diff: observed.count - prior.last_count,
                count: observed.count,
            };
        }

        Decision::NoChange {
            count: observed.count,
        }
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new(DEFAULT_WAVE_THRESHOLD)
    }
}
