//! One watch pass: fetch, parse, compare, notify, persist.

use rollout_watch::{
    parse_latest_row, Comparator, CountFallback, Decision, Observation, PersistedState,
    StateStore, WatchError,
};
use serde::Serialize;

use crate::config::WatchConfig;
use crate::fetch::{build_client, FetchError, PageFetcher};
use crate::notify::{NotifyOutcome, TelegramNotifier};

/// Why a pass ended early.
#[derive(thiserror::Error, Debug)]
pub enum RunError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("could not find version data: {0}")]
    Parse(#[source] WatchError),

    #[error("state file error: {0}")]
    State(#[source] WatchError),
}

impl RunError {
    /// Fetch and parse failures are expected from time to time and end the
    /// pass quietly; state problems need an operator.
    pub fn is_transient(&self) -> bool {
        matches!(self, RunError::Fetch(_) | RunError::Parse(_))
    }
}

/// Everything one pass saw and did.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub observation: Observation,
    pub fallbacks: Vec<CountFallback>,
    pub previous: PersistedState,
    pub decision: Decision,
    pub notification: NotifyOutcome,
    /// Whether the state file was written.
    pub saved: bool,
}

/// Wires the fetcher, comparator, notifier and store together.
pub struct Watcher {
    fetcher: PageFetcher,
    notifier: TelegramNotifier,
    store: StateStore,
    comparator: Comparator,
    source_url: String,
}

impl Watcher {
    pub fn new(config: &WatchConfig) -> Result<Self, FetchError> {
        let client = build_client(config.timeout)?;
        Ok(Self {
            fetcher: PageFetcher::new(client.clone(), config.source_url.clone()),
            notifier: TelegramNotifier::new(
                client,
                config.api_base.clone(),
                config.credentials.clone(),
            ),
            store: StateStore::new(config.state_file_path.clone()),
            comparator: Comparator::new(config.wave_threshold),
            source_url: config.source_url.clone(),
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Run a single pass.
    ///
    /// With `dry_run` the decision is computed and logged but nothing is sent
    /// and the state file is left alone.
    pub async fn run_once(&self, dry_run: bool) -> Result<RunReport, RunError> {
        tracing::info!(url = %self.fetcher.url(), "fetching rollout data");
        let html = self.fetcher.fetch().await?;

        let parsed = parse_latest_row(&html).map_err(RunError::Parse)?;
        let observation = parsed.observation;

        let previous = self.store.load().map_err(RunError::State)?;

        tracing::info!(
            version = %observation.version,
            count = observation.count,
            "current"
        );
        tracing::info!(
            version = %previous.last_version,
            count = previous.last_count,
            "saved"
        );

        let decision = self.comparator.classify(&previous, &observation);

        let notification = match decision.message(&self.source_url) {
            None => {
                tracing::info!("no significant change");
                NotifyOutcome::NotNeeded
            }
            Some(text) if dry_run => {
                tracing::info!(kind = decision.kind(), message = %text, "dry run, not sending");
                NotifyOutcome::NotNeeded
            }
            Some(text) => {
                tracing::info!(kind = decision.kind(), "rollout change detected");
                self.notifier.send(&text).await
            }
        };

        let next = decision.next_state(&previous);
        let saved = if dry_run || next == previous {
            false
        } else {
            self.store.save(&next).map_err(RunError::State)?;
            true
        };

        Ok(RunReport {
            observation,
            fallbacks: parsed.fallbacks,
            previous,
            decision,
            notification,
            saved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let parse = RunError::Parse(WatchError::Parse("no rows".to_string()));
        assert!(parse.is_transient());

        let state = RunError::State(WatchError::State("bad json".to_string()));
        assert!(!state.is_transient());
    }
}
