//! Catalog store interface and implementations.
//!
//! The matcher only needs two things from persistent storage: bulk insert of
//! landmark records and a batched lookup by hash set. Keeping lookups batched
//! holds a query to a single round trip regardless of how many hashes it has.

pub mod file;
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{CatalogStats, LandmarkHash, LandmarkRecord};

/// Storage for catalog landmarks, keyed by hash.
///
/// Failures are reported as [`crate::Error::StoreUnavailable`]; callers own
/// any retry policy.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Insert landmark records.
    async fn insert(&self, records: &[LandmarkRecord]) -> Result<()>;

    /// Fetch every record whose hash is in `hashes`.
    async fn query_by_hashes(&self, hashes: &HashSet<LandmarkHash>) -> Result<Vec<LandmarkRecord>>;

    /// Remove all records of a recording, returning how many were dropped.
    async fn remove_recording(&self, recording_id: &str) -> Result<usize>;

    /// Swap every record of `recording_id` for `records` in one step.
    ///
    /// On error the catalog still holds the previous records. Returns how
    /// many records were dropped.
    async fn replace_recording(&self, recording_id: &str, records: &[LandmarkRecord]) -> Result<usize>;

    /// Summarize catalog contents.
    async fn stats(&self) -> Result<CatalogStats>;
}

pub use file::FileCatalog;
pub use memory::MemoryCatalog;
