use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::{debug, info};

use crate::db::SnapshotStore;

/// Decides whether a refresh cycle is due.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    pub interval: Duration,
}

impl RefreshPolicy {
    pub fn new(interval: Duration) -> Self {
        RefreshPolicy { interval }
    }

    pub fn should_refresh(&self, store: &SnapshotStore) -> bool {
        self.should_refresh_at(store, Utc::now())
    }

    /// A pending force flag always wins and is consumed. Otherwise refresh
    /// when nothing was ever fetched or the last fetch is older than the
    /// interval.
    pub fn should_refresh_at(&self, store: &SnapshotStore, now: DateTime<Utc>) -> bool {
        if store.take_force_refresh() {
            info!("Forced refresh requested");
            return true;
        }
        let Some(last) = store.last_fetch_time() else {
            debug!("No previous fetch recorded");
            return true;
        };
        let elapsed = now.signed_duration_since(last);
        match chrono::Duration::from_std(self.interval) {
            Ok(interval) => elapsed > interval,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::Dataset;

    fn policy() -> RefreshPolicy {
        RefreshPolicy::new(Duration::from_secs(3600))
    }

    fn store_fetched_at(at: DateTime<Utc>) -> SnapshotStore {
        let store = SnapshotStore::open(":memory:").unwrap();
        store.put_at(&Dataset::empty(at), at).unwrap();
        store
    }

    #[test]
    fn test_stale_fetch_refreshes() {
        let now = Utc::now();
        let store = store_fetched_at(now - chrono::Duration::hours(2));
        assert!(policy().should_refresh_at(&store, now));
    }

    #[test]
    fn test_recent_fetch_does_not_refresh() {
        let now = Utc::now();
        let store = store_fetched_at(now - chrono::Duration::minutes(10));
        assert!(!policy().should_refresh_at(&store, now));
    }

    #[test]
    fn test_never_fetched_refreshes() {
        let store = SnapshotStore::open(":memory:").unwrap();
        assert!(policy().should_refresh(&store));
    }

    #[test]
    fn test_force_flag_wins_and_clears() {
        let now = Utc::now();
        let store = store_fetched_at(now - chrono::Duration::minutes(1));
        store.set_force_refresh().unwrap();

        assert!(policy().should_refresh_at(&store, now));
        // flag consumed: the recent fetch gates again
        assert!(!policy().should_refresh_at(&store, now));
        assert!(!store.take_force_refresh());
    }
}
