use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::pipeline::{Aggregator, RefreshReport};
use crate::publish::Publisher;

/// Owns the refresh cycle: aggregate, then publish.
pub struct Controller {
    aggregator: Aggregator,
    publisher: Publisher,
}

impl Controller {
    pub fn new(aggregator: Aggregator, publisher: Publisher) -> Self {
        Controller {
            aggregator,
            publisher,
        }
    }

    /// One refresh cycle; returns its report.
    pub async fn run_cycle(&self) -> RefreshReport {
        let outcome = self.aggregator.refresh().await;
        let report = outcome.report.clone();
        self.publisher.publish(outcome).await;
        report
    }

    /// Drop the stored snapshot and refresh immediately.
    pub async fn force_cycle(&self) -> anyhow::Result<RefreshReport> {
        self.aggregator.force_refresh().await?;
        Ok(self.run_cycle().await)
    }

    /// Re-run the cycle every `interval` in the background. The first tick
    /// is skipped since `main` runs a cycle before serving.
    pub fn spawn_refresh_loop(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let report = self.run_cycle().await;
                info!(
                    "Scheduled refresh done: source={}",
                    report.source.as_deref().unwrap_or("none")
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SnapshotStore;
    use crate::pipeline::{Randomness, RefreshPolicy};
    use crate::publish::AppState;
    use crate::sources::{DefaultSnapshot, SourceAdapter};

    fn controller(store: &SnapshotStore) -> (Controller, Arc<AppState>) {
        let rng = Arc::new(Randomness::seeded(3));
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(DefaultSnapshot)];
        let aggregator = Aggregator::new(
            adapters,
            store.clone(),
            RefreshPolicy::new(Duration::from_secs(3600)),
            rng.clone(),
            Duration::from_secs(5),
        );
        let state = Arc::new(AppState::new());
        let publisher = Publisher::new(state.clone(), vec![], rng);
        (Controller::new(aggregator, publisher), state)
    }

    #[tokio::test]
    async fn test_cycle_publishes_default() {
        let store = SnapshotStore::open(":memory:").unwrap();
        let (controller, state) = controller(&store);
        let report = controller.run_cycle().await;

        assert_eq!(report.source.as_deref(), Some("default"));
        assert_eq!(report.teams, 6);
        assert!(state.dataset.read().await.is_some());
        assert!(state.last_report.read().await.is_some());
    }

    #[tokio::test]
    async fn test_force_cycle_consumes_flag() {
        let store = SnapshotStore::open(":memory:").unwrap();
        let (controller, _) = controller(&store);
        controller.force_cycle().await.unwrap();
        assert!(!store.take_force_refresh());
    }
}
