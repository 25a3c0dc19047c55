//! JSON-file catalog for single-host deployments and the CLI.
//!
//! Records are held in a [`MemoryCatalog`] and written out on [`FileCatalog::flush`].
//! The document remembers the hash scheme it was built with so that a
//! catalog is never queried with incompatible keys.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{CatalogStore, MemoryCatalog};
use crate::error::{Error, Result};
use crate::types::{CatalogStats, HashScheme, LandmarkHash, LandmarkRecord};

/// On-disk format version.
pub const CATALOG_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CatalogDocument {
    version: u32,
    scheme: HashScheme,
    saved_at: DateTime<Utc>,
    records: Vec<LandmarkRecord>,
}

/// A catalog persisted as a JSON document.
pub struct FileCatalog {
    path: PathBuf,
    scheme: HashScheme,
    inner: MemoryCatalog,
    dirty: AtomicBool,
}

impl FileCatalog {
    /// Open the catalog at `path`, creating an empty one if the file is absent.
    pub async fn open(path: impl AsRef<Path>, scheme: HashScheme) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let inner = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let document: CatalogDocument = serde_json::from_slice(&bytes)?;
                if document.version != CATALOG_FORMAT_VERSION {
                    return Err(Error::InvalidConfig(format!(
                        "catalog {} has format version {}, expected {}",
                        path.display(),
                        document.version,
                        CATALOG_FORMAT_VERSION
                    )));
                }
                if document.scheme != scheme {
                    return Err(Error::InvalidConfig(format!(
                        "catalog {} was built with hash scheme {}, configured scheme is {}",
                        path.display(),
                        document.scheme,
                        scheme
                    )));
                }
                info!(
                    path = %path.display(),
                    records = document.records.len(),
                    "Loaded catalog"
                );
                MemoryCatalog::from_records(document.records)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Starting new catalog");
                MemoryCatalog::new()
            }
            Err(e) => return Err(Error::store(format!("{}: {}", path.display(), e))),
        };

        Ok(Self {
            path,
            scheme,
            inner,
            dirty: AtomicBool::new(false),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash scheme of the stored keys.
    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    /// Whether there are changes not yet written to disk.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Write the catalog to disk via a temporary file and rename.
    pub async fn flush(&self) -> Result<()> {
        let document = CatalogDocument {
            version: CATALOG_FORMAT_VERSION,
            scheme: self.scheme,
            saved_at: Utc::now(),
            records: self.inner.records()?,
        };
        let json = serde_json::to_vec(&document)?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| Error::store(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::store(format!("{}: {}", self.path.display(), e)))?;

        self.dirty.store(false, Ordering::Release);
        info!(
            path = %self.path.display(),
            records = document.records.len(),
            "Saved catalog"
        );
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for FileCatalog {
    async fn insert(&self, records: &[LandmarkRecord]) -> Result<()> {
        self.inner.insert(records).await?;
        self.dirty.store(true, Ordering::Release);
        Ok(())
    }

    async fn query_by_hashes(&self, hashes: &HashSet<LandmarkHash>) -> Result<Vec<LandmarkRecord>> {
        self.inner.query_by_hashes(hashes).await
    }

    async fn remove_recording(&self, recording_id: &str) -> Result<usize> {
        let removed = self.inner.remove_recording(recording_id).await?;
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
        }
        Ok(removed)
    }

    async fn replace_recording(&self, recording_id: &str, records: &[LandmarkRecord]) -> Result<usize> {
        let removed = self.inner.replace_recording(recording_id, records).await?;
        self.dirty.store(true, Ordering::Release);
        Ok(removed)
    }

    async fn stats(&self) -> Result<CatalogStats> {
        self.inner.stats().await
    }
}
