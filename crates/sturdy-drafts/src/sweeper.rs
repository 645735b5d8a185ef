//! Background retention sweep for the draft store.
//!
//! The store's cleanup is normally run opportunistically once per client
//! start; long-lived clients can additionally spawn this task to keep the
//! snapshot from accumulating stale drafts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, MissedTickBehavior};

use sturdy_core::config::drafts::DraftsConfig;

use crate::store::DraftStore;

/// Periodically evicts drafts older than the retention window.
#[derive(Debug)]
pub struct DraftSweeper {
    store: Arc<DraftStore>,
    interval: Duration,
}

impl DraftSweeper {
    /// Creates a sweeper running at the configured interval.
    pub fn new(store: Arc<DraftStore>, config: &DraftsConfig) -> Self {
        Self {
            store,
            interval: Duration::from_secs(config.sweep_interval_minutes * 60),
        }
    }

    /// Runs until the cancel signal flips to `true`. The first sweep fires
    /// immediately, covering the once-per-start opportunistic cleanup.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.store.cleanup_old_data().await {
                        Ok(0) => {}
                        Ok(removed) => tracing::info!(removed, "Draft sweep removed stale records"),
                        Err(e) => tracing::warn!(error = %e, "Draft sweep failed"),
                    }
                }
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("Draft sweeper stopped");
    }
}
