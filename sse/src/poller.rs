//! Fetch-compare-announce loop for repository channels.

use crate::channel::Emitter;
use crate::message::Event;
use log::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use upstream::{RepoKey, RepoSnapshot, ResourceSource};

/// Polls one repository and announces changes to its channel.
///
/// The stored snapshot is owned by the poller task alone and lives exactly as
/// long as the channel that spawned it.
pub(crate) struct Poller {
    repo: RepoKey,
    source: Arc<dyn ResourceSource>,
    period: Duration,
    fetch_timeout: Duration,
    snapshot: Option<RepoSnapshot>,
}

impl Poller {
    pub fn new(
        repo: RepoKey,
        source: Arc<dyn ResourceSource>,
        period: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            source,
            period,
            fetch_timeout,
            snapshot: None,
        }
    }

    /// Poll until `cancel` fires. The first fetch runs immediately and sets
    /// the baseline; later fetches follow every `period`.
    pub async fn run(mut self, emitter: Emitter, cancel: CancellationToken) {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            "Poller started for {} every {:?}",
            self.repo, self.period
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                fetched = time::timeout(self.fetch_timeout, self.source.fetch_repository(&self.repo)) => fetched,
            };

            let result = fetched.unwrap_or_else(|_| Err(upstream::Error::timeout()));
            if let Some(event) = self.observe(result) {
                emitter.publish(event);
            }
        }

        debug!("Poller stopped for {}", self.repo);
    }

    /// Fold one fetch result into the stored snapshot.
    ///
    /// Returns the event to announce: `repo_update` when a tracked counter
    /// moved since the last successful fetch, `error` on failure, nothing
    /// otherwise. A failure leaves the stored snapshot untouched.
    pub fn observe(&mut self, result: Result<RepoSnapshot, upstream::Error>) -> Option<Event> {
        match result {
            Ok(current) => {
                let event = match &self.snapshot {
                    Some(previous) => {
                        let changed = current.changed_fields(previous);
                        if changed.is_empty() {
                            None
                        } else {
                            info!("{} changed: {}", self.repo, changed.join(", "));
                            Some(Event::repo_update(&current, &changed))
                        }
                    }
                    None => {
                        debug!("Baseline snapshot for {}: {:?}", self.repo, current);
                        None
                    }
                };
                self.snapshot = Some(current);
                event
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", self.repo, e);
                Some(Event::error(e.to_string()))
            }
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Option<&RepoSnapshot> {
        self.snapshot.as_ref()
    }
}
