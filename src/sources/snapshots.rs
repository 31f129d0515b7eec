//! Adapters that serve stored data: the embedded manual update, the last
//! persisted Dataset and the bundled default snapshot.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::info;

use super::provider::{AdapterError, Freshness, Produced, SourceAdapter};
use crate::db::models::{trim_form, Dataset, Fixture, HeadToHead, TeamRecord};
use crate::db::SnapshotStore;

const DEFAULT_SNAPSHOT_JSON: &str = include_str!("../../data/default_snapshot.json");
const HARDCODED_UPDATES_JSON: &str = include_str!("../../data/hardcoded_updates.json");

/// Decode stored snapshot JSON; a malformed document is a storage failure.
fn decode<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, AdapterError> {
    serde_json::from_str(json).map_err(|e| AdapterError::Storage(format!("{}: {}", what, e)))
}

/// The Dataset compiled into the binary, used when nothing else is available.
pub fn default_dataset() -> Result<Dataset, AdapterError> {
    decode(DEFAULT_SNAPSHOT_JSON, "bundled default snapshot")
}

// ── Manual update ───────────────────────────────────────────────────────────

/// A hand-maintained update copied from the official points table.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualUpdate {
    pub as_of: NaiveDate,
    pub teams: BTreeMap<String, TeamRecord>,
    pub head_to_head: BTreeMap<String, HeadToHead>,
    #[serde(rename = "matches")]
    pub fixtures: BTreeMap<String, Fixture>,
    pub news_items: Vec<String>,
}

impl ManualUpdate {
    pub fn embedded() -> Result<Self, AdapterError> {
        decode(HARDCODED_UPDATES_JSON, "embedded manual update")
    }

    /// Overlay onto `base`. Teams already in `base` get their stats and recent
    /// matches replaced; head-to-head entries and fixtures are overwritten by
    /// key; news is replaced outright.
    pub fn apply(&self, mut base: Dataset) -> Dataset {
        for (name, update) in &self.teams {
            if let Some(team) = base.teams.get_mut(name) {
                *team = TeamRecord {
                    no_results: Some(update.no_results.unwrap_or(0)),
                    form: trim_form(&update.form),
                    form_approximate: false,
                    ..update.clone()
                };
            }
        }
        for (key, h2h) in &self.head_to_head {
            base.head_to_head.insert(key.clone(), h2h.clone());
        }
        for (id, fixture) in &self.fixtures {
            base.fixtures.insert(id.clone(), fixture.clone());
        }
        base.news_items = self.news_items.clone();
        base
    }
}

pub struct HardcodedUpdates {
    update: ManualUpdate,
}

impl HardcodedUpdates {
    pub fn new(update: ManualUpdate) -> Self {
        HardcodedUpdates { update }
    }

    pub fn embedded() -> Result<Self, AdapterError> {
        Ok(Self::new(ManualUpdate::embedded()?))
    }
}

#[async_trait]
impl SourceAdapter for HardcodedUpdates {
    fn name(&self) -> &str {
        "hardcoded"
    }

    async fn produce(&self, prior: Option<&Dataset>) -> Result<Option<Produced>, AdapterError> {
        let base = match prior.filter(|ds| !ds.is_empty()) {
            Some(ds) => ds.clone(),
            None => default_dataset()?,
        };
        info!("Applying manual update as of {}", self.update.as_of);
        Ok(Some(Produced::Dataset(self.update.apply(base))))
    }
}

// ── Fallbacks ───────────────────────────────────────────────────────────────

/// Serves whatever the Snapshot Store holds.
pub struct CachedSnapshot {
    store: SnapshotStore,
}

impl CachedSnapshot {
    pub fn new(store: SnapshotStore) -> Self {
        CachedSnapshot { store }
    }
}

#[async_trait]
impl SourceAdapter for CachedSnapshot {
    fn name(&self) -> &str {
        "cache"
    }

    fn freshness(&self) -> Freshness {
        Freshness::Fallback
    }

    async fn produce(&self, _prior: Option<&Dataset>) -> Result<Option<Produced>, AdapterError> {
        Ok(self.store.get().map(Produced::Dataset))
    }
}

pub struct DefaultSnapshot;

#[async_trait]
impl SourceAdapter for DefaultSnapshot {
    fn name(&self) -> &str {
        "default"
    }

    fn freshness(&self) -> Freshness {
        Freshness::Fallback
    }

    async fn produce(&self, _prior: Option<&Dataset>) -> Result<Option<Produced>, AdapterError> {
        Ok(Some(Produced::Dataset(default_dataset()?)))
    }
}
