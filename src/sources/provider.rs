use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::db::models::{Dataset, Fixture, MatchResult, Standings};

/// Why an adapter produced nothing usable.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("network failure fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("parse failure: {0}")]
    Parse(String),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("no data: {0}")]
    NotFound(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Records scraped from the primary site in one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScrapedSeason {
    pub standings: Standings,
    /// Keyed by match id.
    pub fixtures: Vec<(String, Fixture)>,
    pub results: Vec<MatchResult>,
}

/// What an adapter hands to the Aggregator.
#[derive(Debug, Clone, PartialEq)]
pub enum Produced {
    /// A complete Dataset (embedded snapshots, cache).
    Dataset(Dataset),
    /// Only a standings table; merged into the prior cached Dataset.
    Standings(Standings),
    /// Standings, fixtures and results; the merger derives everything else.
    Season(ScrapedSeason),
}

impl Produced {
    /// Empty output is treated like no output at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Produced::Dataset(ds) => ds.is_empty(),
            Produced::Standings(table) => table.is_empty(),
            Produced::Season(season) => season.standings.is_empty(),
        }
    }
}

/// Whether the adapter's output is fresh data or a stored fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Newly produced; stamped and persisted by the Aggregator.
    Live,
    /// Previously stored or bundled; served as-is.
    Fallback,
}

/// Trait that every data source must implement.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Produce data, given the Dataset cached before this refresh cycle.
    /// `Ok(None)` means the source has nothing to offer right now.
    async fn produce(&self, prior: Option<&Dataset>) -> Result<Option<Produced>, AdapterError>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;

    fn freshness(&self) -> Freshness {
        Freshness::Live
    }
}
