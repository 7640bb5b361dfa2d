//! Daily sweep that re-applies the rent lifecycle to rentals nobody touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::repository::{MarketplaceRepository, RepositoryError};
use crate::clock::Clock;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSummary {
    pub scanned: usize,
    pub updated: usize,
    pub failed: usize,
}

pub struct StatusRefresher<R> {
    repository: Arc<R>,
}

impl<R> StatusRefresher<R>
where
    R: MarketplaceRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Re-evaluate every open rent for `today`, writing back only those that changed.
    ///
    /// A failed write is logged and counted; the remaining rents are still processed.
    /// A rent closed while the sweep was running is skipped, not counted.
    /// Running the sweep again for the same day changes nothing.
    pub fn sweep(&self, today: NaiveDate) -> Result<RefreshSummary, RepositoryError> {
        let rents = self.repository.open_rents()?;
        let mut summary = RefreshSummary {
            scanned: rents.len(),
            ..RefreshSummary::default()
        };

        for mut rent in rents {
            let previous = rent.status;
            if !rent.apply_lifecycle(today) {
                continue;
            }

            match self.repository.update_rent(rent.clone()) {
                Ok(()) => {
                    summary.updated += 1;
                    debug!(
                        rent_id = %rent.id,
                        from = previous.label(),
                        to = rent.status.label(),
                        "rent status refreshed"
                    );
                }
                Err(RepositoryError::Conflict) => {
                    debug!(rent_id = %rent.id, "rent finished during sweep, left as is");
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(rent_id = %rent.id, error = %err, "failed to persist refreshed rent");
                }
            }
        }

        info!(
            %today,
            scanned = summary.scanned,
            updated = summary.updated,
            failed = summary.failed,
            "rent status sweep finished"
        );
        Ok(summary)
    }

    /// Run the sweep now and then once per `every` on a background task.
    pub fn spawn_daily<C>(self, clock: Arc<C>, every: Duration) -> JoinHandle<()>
    where
        C: Clock + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = interval(every.max(Duration::from_secs(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sweep(clock.today()) {
                    error!(error = %err, "rent status sweep aborted");
                }
            }
        })
    }
}
