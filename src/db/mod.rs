use anyhow::{anyhow, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub mod models;
use models::Dataset;

/// Serialized Dataset.
pub const DATA_KEY: &str = "psl_2025_data";
/// Epoch milliseconds of the last successful `put`, as a decimal string.
pub const LAST_FETCH_KEY: &str = "psl_2025_last_fetch";
/// "true" while a forced refresh is pending; cleared on read.
pub const FORCE_REFRESH_KEY: &str = "psl_force_refresh";

/// Persisted key-value cache for the last computed Dataset.
///
/// A single SQLite connection behind a mutex; clones share it.
#[derive(Clone)]
pub struct SnapshotStore {
    conn: Arc<Mutex<Connection>>,
}

impl SnapshotStore {
    /// Open (or create) the store at the given path. `:memory:` works for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(SnapshotStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("snapshot store lock poisoned"))
    }

    fn read_key(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn write_key(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(UPSERT_SQL, params![key, value, Utc::now()])?;
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }

    // ── Dataset ───────────────────────────────────────────────────────────────

    /// The cached Dataset. Missing, unreadable and corrupt entries all read
    /// as `None`.
    pub fn get(&self) -> Option<Dataset> {
        let raw = match self.read_key(DATA_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read cached dataset: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(dataset) => Some(dataset),
            Err(e) => {
                warn!("Discarding corrupt cached dataset: {}", e);
                None
            }
        }
    }

    /// Persist the Dataset and stamp the fetch time.
    pub fn put(&self, dataset: &Dataset) -> Result<()> {
        self.put_at(dataset, Utc::now())
    }

    /// Both rows are written in one transaction, so a failed write leaves the
    /// previous pair intact.
    pub fn put_at(&self, dataset: &Dataset, fetched_at: DateTime<Utc>) -> Result<()> {
        let json = serde_json::to_string(dataset)?;
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let now = Utc::now();
        tx.execute(UPSERT_SQL, params![DATA_KEY, json, now])?;
        tx.execute(
            UPSERT_SQL,
            params![LAST_FETCH_KEY, fetched_at.timestamp_millis().to_string(), now],
        )?;
        tx.commit()?;
        debug!("Stored dataset ({} bytes)", json.len());
        Ok(())
    }

    /// Remove the cached Dataset. The fetch timestamp is kept.
    pub fn clear(&self) -> Result<()> {
        self.remove_key(DATA_KEY)
    }

    /// Time of the last successful `put`, if any.
    pub fn last_fetch_time(&self) -> Option<DateTime<Utc>> {
        let raw = match self.read_key(LAST_FETCH_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("Failed to read last fetch time: {}", e);
                return None;
            }
        };
        let millis: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }

    // ── Force-refresh flag ────────────────────────────────────────────────────

    pub fn set_force_refresh(&self) -> Result<()> {
        self.write_key(FORCE_REFRESH_KEY, "true")
    }

    /// Read and clear the force flag. Clearing an absent flag is a no-op.
    pub fn take_force_refresh(&self) -> bool {
        let set = match self.read_key(FORCE_REFRESH_KEY) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!("Failed to read force-refresh flag: {}", e);
                false
            }
        };
        if let Err(e) = self.remove_key(FORCE_REFRESH_KEY) {
            warn!("Failed to clear force-refresh flag: {}", e);
        }
        set
    }

    /// Request a refresh on the next cycle and drop the cached Dataset.
    pub fn force_refresh(&self) -> Result<()> {
        self.set_force_refresh()?;
        self.clear()
    }
}

const UPSERT_SQL: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at";

/// SQLite schema (idempotent CREATE IF NOT EXISTS)
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key         TEXT    PRIMARY KEY,
    value       TEXT    NOT NULL,
    updated_at  TEXT    NOT NULL
);
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::*;
    use chrono::Duration;

    fn store() -> SnapshotStore {
        SnapshotStore::open(":memory:").unwrap()
    }

    fn sample_dataset() -> Dataset {
        let mut ds = Dataset::empty(Utc::now());
        ds.teams.insert(
            "Lahore Qalandars".into(),
            TeamRecord {
                matches: 9,
                wins: 4,
                losses: 4,
                no_results: Some(1),
                points: 9,
                nrr: "+0.958".into(),
                form: "LWNWW".into(),
                form_approximate: false,
                recent_matches: vec![RecentMatch {
                    opponent: "Karachi Kings".into(),
                    result: "Lost by 4 wickets".into(),
                    date: "2025-05-04".into(),
                }],
            },
        );
        // Optional column missing, odd characters in keys and text
        ds.teams.insert(
            "Qalandars \"Lahore\" – ü/ñ".into(),
            TeamRecord {
                no_results: None,
                ..TeamRecord::default()
            },
        );
        ds.venues.insert(
            "Rawalpindi <Pindi> & Co".into(),
            VenueStats {
                matches: 4,
                avg_first_innings: 198,
                avg_second_innings: 178,
                toss_decision: "75% elected to field first".into(),
                winning_toss: String::new(),
            },
        );
        ds.news_items.push("Zalmi's \"late\" surge\nnew line".into());
        ds
    }

    #[test]
    fn test_get_on_empty_store_is_none() {
        let s = store();
        assert!(s.get().is_none());
        assert!(s.last_fetch_time().is_none());
    }

    #[test]
    fn test_put_get_round_trip() {
        let s = store();
        let ds = sample_dataset();
        s.put(&ds).unwrap();
        assert_eq!(s.get(), Some(ds));
    }

    #[test]
    fn test_round_trip_with_empty_mappings() {
        let s = store();
        let ds = Dataset::empty(Utc::now());
        s.put(&ds).unwrap();
        assert_eq!(s.get(), Some(ds));
    }

    #[test]
    fn test_put_records_fetch_time() {
        let s = store();
        let at = Utc::now() - Duration::minutes(10);
        s.put_at(&sample_dataset(), at).unwrap();
        let stored = s.last_fetch_time().unwrap();
        assert_eq!(stored.timestamp_millis(), at.timestamp_millis());
    }

    #[test]
    fn test_corrupt_cache_reads_as_none() {
        let s = store();
        s.write_key(DATA_KEY, "{not json").unwrap();
        assert!(s.get().is_none());
    }

    #[test]
    fn test_clear_keeps_timestamp() {
        let s = store();
        s.put(&sample_dataset()).unwrap();
        s.clear().unwrap();
        assert!(s.get().is_none());
        assert!(s.last_fetch_time().is_some());
    }

    #[test]
    fn test_force_flag_is_self_clearing() {
        let s = store();
        assert!(!s.take_force_refresh());
        s.set_force_refresh().unwrap();
        assert!(s.take_force_refresh());
        assert!(!s.take_force_refresh());
    }

    #[test]
    fn test_force_refresh_drops_dataset() {
        let s = store();
        s.put(&sample_dataset()).unwrap();
        s.force_refresh().unwrap();
        assert!(s.get().is_none());
        assert!(s.take_force_refresh());
    }
}
