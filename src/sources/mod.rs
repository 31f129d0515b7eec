pub mod cricinfo;
pub mod direct;
pub mod fetch;
pub mod names;
pub mod provider;
pub mod rules;
pub mod snapshots;

pub use cricinfo::CricinfoScraper;
pub use direct::DirectScraper;
pub use fetch::{Fetch, HttpFetcher};
pub use provider::{AdapterError, Freshness, Produced, ScrapedSeason, SourceAdapter};
pub use snapshots::{CachedSnapshot, DefaultSnapshot, HardcodedUpdates};

use std::sync::Arc;
use tracing::info;

use crate::db::SnapshotStore;
use crate::pipeline::random::Randomness;

/// The adapters in priority order: manual update, psl-t20.com, Cricinfo,
/// stored snapshot, bundled default.
pub fn adapter_chain(
    fetch: Arc<dyn Fetch>,
    store: SnapshotStore,
    rng: Arc<Randomness>,
    tournament_year: i32,
    hardcoded: bool,
) -> Result<Vec<Arc<dyn SourceAdapter>>, AdapterError> {
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::new();
    if hardcoded {
        adapters.push(Arc::new(HardcodedUpdates::embedded()?));
    } else {
        info!("Hardcoded updates disabled");
    }
    adapters.push(Arc::new(DirectScraper::new(fetch.clone(), rng)));
    adapters.push(Arc::new(CricinfoScraper::new(fetch, tournament_year)));
    adapters.push(Arc::new(CachedSnapshot::new(store)));
    adapters.push(Arc::new(DefaultSnapshot));
    Ok(adapters)
}
