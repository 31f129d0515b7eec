use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::merge::{merge_season, merge_standings};
use super::policy::RefreshPolicy;
use super::random::Randomness;
use crate::db::models::Dataset;
use crate::db::SnapshotStore;
use crate::sources::{AdapterError, Freshness, Produced, SourceAdapter};

/// How one adapter fared during a cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    pub adapter: String,
    pub outcome: String,
    pub elapsed_ms: u64,
}

/// Summary of the most recent refresh cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Adapter whose output was used; `None` when nothing was produced.
    pub source: Option<String>,
    /// True when the policy allowed serving the stored snapshot directly.
    pub served_from_cache: bool,
    pub attempts: Vec<Attempt>,
    pub teams: usize,
    pub fixtures: usize,
}

pub struct RefreshOutcome {
    pub dataset: Option<Dataset>,
    pub report: RefreshReport,
}

/// Runs refresh cycles over an ordered adapter chain.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: SnapshotStore,
    policy: RefreshPolicy,
    rng: Arc<Randomness>,
    adapter_timeout: Duration,
    /// Held for the whole cycle so the store has a single writer.
    cycle: Mutex<()>,
}

impl Aggregator {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: SnapshotStore,
        policy: RefreshPolicy,
        rng: Arc<Randomness>,
        adapter_timeout: Duration,
    ) -> Self {
        Aggregator {
            adapters,
            store,
            policy,
            rng,
            adapter_timeout,
            cycle: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Request a forced refresh: the next policy check passes and the stored
    /// Dataset is dropped. Waits for any running cycle to finish first.
    pub async fn force_refresh(&self) -> anyhow::Result<()> {
        let _guard = self.cycle.lock().await;
        self.store.force_refresh()?;
        info!("Force refresh requested; stored snapshot cleared");
        Ok(())
    }

    /// Run one cycle: serve the stored snapshot when the policy allows,
    /// otherwise try each adapter in order until one yields data.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.cycle.lock().await;
        let started_at = Utc::now();

        if !self.policy.should_refresh(&self.store) {
            if let Some(cached) = self.store.get() {
                info!("Snapshot still fresh, serving stored data");
                let report = report(started_at, Some("snapshot store"), true, vec![], Some(&cached));
                return RefreshOutcome {
                    dataset: Some(cached),
                    report,
                };
            }
        }

        let prior = self.store.get();
        let mut attempts = Vec::with_capacity(self.adapters.len());

        for adapter in &self.adapters {
            let began = Instant::now();
            let result = self.attempt(adapter.as_ref(), prior.as_ref()).await;
            let elapsed_ms = began.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(Some(dataset)) => {
                    attempts.push(Attempt {
                        adapter: adapter.name().to_string(),
                        outcome: "ok".to_string(),
                        elapsed_ms,
                    });
                    info!("Using data from {}", adapter.name());
                    let dataset = self.finish(adapter.as_ref(), dataset);
                    let report = report(started_at, Some(adapter.name()), false, attempts, Some(&dataset));
                    return RefreshOutcome {
                        dataset: Some(dataset),
                        report,
                    };
                }
                Ok(None) => {
                    info!("{} produced nothing", adapter.name());
                    "empty".to_string()
                }
                Err(e) => {
                    warn!("{} failed: {}", adapter.name(), e);
                    format!("error: {}", e)
                }
            };
            attempts.push(Attempt {
                adapter: adapter.name().to_string(),
                outcome,
                elapsed_ms,
            });
        }

        error!("Every source failed; keeping previous data");
        let report = report(started_at, None, false, attempts, prior.as_ref());
        RefreshOutcome {
            dataset: prior,
            report,
        }
    }

    /// Produce and resolve one adapter's output into a full Dataset.
    async fn attempt(
        &self,
        adapter: &dyn SourceAdapter,
        prior: Option<&Dataset>,
    ) -> Result<Option<Dataset>, AdapterError> {
        let produced = tokio::time::timeout(self.adapter_timeout, adapter.produce(prior))
            .await
            .map_err(|_| AdapterError::Timeout(self.adapter_timeout))??;

        let Some(produced) = produced.filter(|p| !p.is_empty()) else {
            return Ok(None);
        };
        let dataset = match produced {
            Produced::Dataset(ds) => ds,
            Produced::Standings(table) => {
                let prior = prior.ok_or_else(|| {
                    AdapterError::NotFound("standings without a cached dataset".into())
                })?;
                merge_standings(prior, &table)
            }
            Produced::Season(season) => merge_season(prior, &season, &self.rng, Utc::now()),
        };
        Ok(Some(dataset))
    }

    /// Live output is stamped and persisted; fallbacks are served as stored.
    fn finish(&self, adapter: &dyn SourceAdapter, mut dataset: Dataset) -> Dataset {
        if adapter.freshness() == Freshness::Fallback {
            return dataset;
        }
        dataset.last_updated = Utc::now();
        if let Err(e) = self.store.put(&dataset) {
            error!("Failed to persist snapshot (serving it anyway): {}", e);
        }
        dataset
    }
}

fn report(
    started_at: DateTime<Utc>,
    source: Option<&str>,
    served_from_cache: bool,
    attempts: Vec<Attempt>,
    dataset: Option<&Dataset>,
) -> RefreshReport {
    RefreshReport {
        started_at,
        finished_at: Utc::now(),
        source: source.map(str::to_string),
        served_from_cache,
        attempts,
        teams: dataset.map_or(0, |ds| ds.teams.len()),
        fixtures: dataset.map_or(0, |ds| ds.fixtures.len()),
    }
}
