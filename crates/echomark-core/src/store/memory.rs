//! In-memory catalog backed by a hash index.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::debug;

use super::CatalogStore;
use crate::error::{Error, Result};
use crate::types::{CatalogStats, LandmarkHash, LandmarkRecord};

type Index = HashMap<LandmarkHash, Vec<LandmarkRecord>>;

/// An in-memory catalog. Clones share the same index.
#[derive(Clone, Default)]
pub struct MemoryCatalog {
    index: Arc<RwLock<Index>>,
}

impl MemoryCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from existing records.
    pub fn from_records(records: Vec<LandmarkRecord>) -> Self {
        let mut index = Index::new();
        for record in records {
            index.entry(record.hash).or_default().push(record);
        }
        Self {
            index: Arc::new(RwLock::new(index)),
        }
    }

    /// Snapshot every stored record, ordered by hash.
    pub fn records(&self) -> Result<Vec<LandmarkRecord>> {
        let index = self.read()?;
        let mut hashes: Vec<&LandmarkHash> = index.keys().collect();
        hashes.sort();
        Ok(hashes
            .into_iter()
            .flat_map(|hash| index[hash].iter().cloned())
            .collect())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Index>> {
        self.index.read().map_err(|e| Error::store(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Index>> {
        self.index.write().map_err(|e| Error::store(e.to_string()))
    }
}

fn remove_from(index: &mut Index, recording_id: &str) -> usize {
    let mut removed = 0;
    index.retain(|_, records| {
        let before = records.len();
        records.retain(|r| r.recording_id != recording_id);
        removed += before - records.len();
        !records.is_empty()
    });
    removed
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn insert(&self, records: &[LandmarkRecord]) -> Result<()> {
        let mut index = self.write()?;
        for record in records {
            index.entry(record.hash).or_default().push(record.clone());
        }
        debug!(records = records.len(), "Inserted landmarks");
        Ok(())
    }

    async fn query_by_hashes(&self, hashes: &HashSet<LandmarkHash>) -> Result<Vec<LandmarkRecord>> {
        let index = self.read()?;
        Ok(hashes
            .iter()
            .filter_map(|hash| index.get(hash))
            .flat_map(|records| records.iter().cloned())
            .collect())
    }

    async fn remove_recording(&self, recording_id: &str) -> Result<usize> {
        let mut index = self.write()?;
        Ok(remove_from(&mut index, recording_id))
    }

    async fn replace_recording(&self, recording_id: &str, records: &[LandmarkRecord]) -> Result<usize> {
        let mut index = self.write()?;
        let removed = remove_from(&mut index, recording_id);
        for record in records {
            index.entry(record.hash).or_default().push(record.clone());
        }
        debug!(
            recording = recording_id,
            removed,
            inserted = records.len(),
            "Replaced landmarks"
        );
        Ok(removed)
    }

    async fn stats(&self) -> Result<CatalogStats> {
        let index = self.read()?;
        let recordings: HashSet<&str> = index
            .values()
            .flatten()
            .map(|r| r.recording_id.as_str())
            .collect();

        Ok(CatalogStats {
            recordings: recordings.len(),
            landmarks: index.values().map(Vec::len).sum(),
            distinct_hashes: index.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: u64, time: f64, id: &str) -> LandmarkRecord {
        LandmarkRecord {
            hash: LandmarkHash(hash),
            anchor_time: time,
            anchor_freq: 500.0,
            target_freq: 750.0,
            time_delta: 0.5,
            recording_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_batched_lookup() {
        let catalog = MemoryCatalog::new();
        catalog
            .insert(&[record(1, 0.0, "a"), record(2, 1.0, "a"), record(1, 3.0, "b")])
            .await
            .unwrap();

        let hashes: HashSet<LandmarkHash> = [LandmarkHash(1), LandmarkHash(9)].into();
        let found = catalog.query_by_hashes(&hashes).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.hash == LandmarkHash(1)));
    }

    #[tokio::test]
    async fn test_empty_hash_set() {
        let catalog = MemoryCatalog::from_records(vec![record(1, 0.0, "a")]);
        let found = catalog.query_by_hashes(&HashSet::new()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_remove_recording() {
        let catalog = MemoryCatalog::new();
        catalog
            .insert(&[record(1, 0.0, "a"), record(2, 1.0, "a"), record(1, 3.0, "b")])
            .await
            .unwrap();

        assert_eq!(catalog.remove_recording("a").await.unwrap(), 2);

        let stats = catalog.stats().await.unwrap();
        assert_eq!(stats.recordings, 1);
        assert_eq!(stats.landmarks, 1);
        assert_eq!(stats.distinct_hashes, 1);
    }

    #[tokio::test]
    async fn test_replace_recording() {
        let catalog = MemoryCatalog::new();
        catalog
            .insert(&[record(1, 0.0, "a"), record(2, 1.0, "a"), record(1, 3.0, "b")])
            .await
            .unwrap();

        let removed = catalog
            .replace_recording("a", &[record(5, 0.5, "a")])
            .await
            .unwrap();
        assert_eq!(removed, 2);

        let hashes: HashSet<LandmarkHash> = [LandmarkHash(1), LandmarkHash(2), LandmarkHash(5)].into();
        let mut found = catalog.query_by_hashes(&hashes).await.unwrap();
        found.sort_by(|x, y| x.recording_id.cmp(&y.recording_id));
        assert_eq!(found, vec![record(5, 0.5, "a"), record(1, 3.0, "b")]);
    }

    #[test]
    fn test_clones_share_index() {
        let catalog = MemoryCatalog::new();
        let handle = catalog.clone();
        tokio_test::block_on(handle.insert(&[record(7, 0.0, "a")])).unwrap();
        assert_eq!(catalog.records().unwrap().len(), 1);
    }
}
