//! Disk cache for fetched visit rows.
//!
//! Database fetches are memoized per source and date range for an hour so
//! that switching between the daily and monthly views does not re-run the
//! query. Only raw rows are stored, never computed stats.

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use routeboard_core::period::DateRange;
use routeboard_core::{VisitRecord, VisitSource};
use serde::{Deserialize, Serialize};

/// Cache staleness threshold: 1 hour
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

const CACHE_DIR_ENV: &str = "ROUTEBOARD_CACHE_DIR";

/// `ROUTEBOARD_CACHE_DIR` if set, otherwise `~/.cache/routeboard/`.
fn cache_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    dirs::home_dir().map(|h| h.join(".cache").join("routeboard"))
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedVisits {
    timestamp: u64,
    source: String,
    range_start: String,
    range_end: String,
    visits: Vec<VisitRecord>,
}

#[derive(Debug, Clone)]
pub struct FetchCache {
    dir: PathBuf,
    ttl: Duration,
}

impl FetchCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            dir: dir.into(),
            ttl,
        }
    }

    pub fn default_location() -> Option<Self> {
        cache_dir().map(|dir| Self::new(dir, CACHE_TTL))
    }

    fn file_for(&self, source: &str, range: DateRange) -> PathBuf {
        let mut hasher = DefaultHasher::new();
        source.hash(&mut hasher);
        self.dir.join(format!(
            "visits-{:016x}-{}-{}.json",
            hasher.finish(),
            range.start_param(),
            range.end_param()
        ))
    }

    fn is_fresh(&self, timestamp: u64, now: u64) -> bool {
        now.saturating_sub(timestamp) < self.ttl.as_secs()
    }

    /// Cached rows for `source` and `range`, if present and not stale.
    pub fn load(&self, source: &str, range: DateRange) -> Option<Vec<VisitRecord>> {
        self.load_at(source, range, now_secs())
    }

    fn load_at(&self, source: &str, range: DateRange, now: u64) -> Option<Vec<VisitRecord>> {
        let file = File::open(self.file_for(source, range)).ok()?;
        let cached: CachedVisits = serde_json::from_reader(BufReader::new(file)).ok()?;

        let matches = cached.source == source
            && cached.range_start == range.start_param()
            && cached.range_end == range.end_param();
        if !matches || !self.is_fresh(cached.timestamp, now) {
            return None;
        }
        Some(cached.visits)
    }

    pub fn store(&self, source: &str, range: DateRange, visits: &[VisitRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache dir {}", self.dir.display()))?;

        let cached = CachedVisits {
            timestamp: now_secs(),
            source: source.to_string(),
            range_start: range.start_param(),
            range_end: range.end_param(),
            visits: visits.to_vec(),
        };

        let path = self.file_for(source, range);
        let file = File::create(&path)
            .with_context(|| format!("Failed to write cache file {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), &cached)?;
        Ok(())
    }
}

/// Fetch through the cache. A cache that cannot be written only costs a
/// warning.
pub fn fetch_cached(
    source: &dyn VisitSource,
    range: DateRange,
    cache: Option<&FetchCache>,
) -> Result<Vec<VisitRecord>> {
    let name = source.describe();
    let key = source.cache_key();

    if let Some(visits) = cache.and_then(|c| c.load(&key, range)) {
        tracing::debug!(source = %name, %range, rows = visits.len(), "cache hit");
        return Ok(visits);
    }

    let visits = source
        .fetch(range)
        .with_context(|| format!("Failed to fetch visits from {name} for {range}"))?;

    if let Some(cache) = cache {
        if let Err(err) = cache.store(&key, range, &visits) {
            tracing::warn!(error = %err, "could not write fetch cache");
        }
    }

    Ok(visits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use routeboard_core::period::day_range;
    use routeboard_core::SqliteSource;
    use std::cell::Cell;

    struct CountingSource {
        calls: Cell<usize>,
    }

    impl VisitSource for CountingSource {
        fn describe(&self) -> String {
            "test:counting".to_string()
        }

        fn fetch(&self, _range: DateRange) -> routeboard_core::Result<Vec<VisitRecord>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![sample_visit()])
        }
    }

    fn sample_visit() -> VisitRecord {
        let ts = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok();
        VisitRecord {
            technician: Some("Ana".to_string()),
            session_id: Some("7".to_string()),
            started_travel: ts("2025-10-01 08:50:00"),
            arrival: ts("2025-10-01 09:00:00"),
            departure: ts("2025-10-01 09:40:00"),
            latitude: Some(40.41),
            longitude: Some(-3.7),
            company_name: Some("Acme".to_string()),
            service_code: None,
        }
    }

    fn oct_1() -> DateRange {
        day_range(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap())
    }

    #[test]
    fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), CACHE_TTL);
        cache.store("sqlite:/a.db", oct_1(), &[sample_visit()]).unwrap();

        let loaded = cache.load("sqlite:/a.db", oct_1()).unwrap();
        assert_eq!(loaded, vec![sample_visit()]);
    }

    #[test]
    fn test_miss_for_other_source_or_range() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), CACHE_TTL);
        cache.store("sqlite:/a.db", oct_1(), &[sample_visit()]).unwrap();

        assert!(cache.load("sqlite:/b.db", oct_1()).is_none());
        let oct_2 = day_range(NaiveDate::from_ymd_opt(2025, 10, 2).unwrap());
        assert!(cache.load("sqlite:/a.db", oct_2).is_none());
    }

    #[test]
    fn test_changed_query_is_not_served_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("routes.db");
        let conn = rusqlite::Connection::open(&db).unwrap();
        conn.execute_batch(
            "CREATE TABLE v (LeadTechnician TEXT, StartedTravel TEXT,
                             ArrivalTimeReal TEXT, DepartureTimeReal TEXT);
             INSERT INTO v VALUES
                 ('Ana', '2025-10-01 08:50:00', '2025-10-01 09:00:00', '2025-10-01 09:40:00'),
                 ('Ben', '2025-10-01 10:00:00', '2025-10-01 10:30:00', '2025-10-01 12:00:00');",
        )
        .unwrap();
        drop(conn);

        let cache = FetchCache::new(dir.path().join("cache"), CACHE_TTL);
        let all = SqliteSource::new(&db, "SELECT * FROM v");
        let only_ana = SqliteSource::new(&db, "SELECT * FROM v WHERE LeadTechnician = 'Ana'");

        assert_eq!(fetch_cached(&all, oct_1(), Some(&cache)).unwrap().len(), 2);
        assert_eq!(fetch_cached(&only_ana, oct_1(), Some(&cache)).unwrap().len(), 1);
        assert_eq!(fetch_cached(&all, oct_1(), Some(&cache)).unwrap().len(), 2);
    }

    #[test]
    fn test_stale_entry_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), CACHE_TTL);
        cache.store("sqlite:/a.db", oct_1(), &[sample_visit()]).unwrap();

        let later = now_secs() + CACHE_TTL.as_secs() + 1;
        assert!(cache.load_at("sqlite:/a.db", oct_1(), later).is_none());
    }

    #[test]
    fn test_fetch_cached_hits_source_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FetchCache::new(dir.path(), CACHE_TTL);
        let source = CountingSource { calls: Cell::new(0) };

        let first = fetch_cached(&source, oct_1(), Some(&cache)).unwrap();
        let second = fetch_cached(&source, oct_1(), Some(&cache)).unwrap();
        assert_eq!(first, second);
        assert_eq!(source.calls.get(), 1);
    }

    #[test]
    fn test_fetch_without_cache() {
        let source = CountingSource { calls: Cell::new(0) };
        fetch_cached(&source, oct_1(), None).unwrap();
        fetch_cached(&source, oct_1(), None).unwrap();
        assert_eq!(source.calls.get(), 2);
    }
}
