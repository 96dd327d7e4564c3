//! Crawl cache: last known record per page URL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::PageRecord;
use crate::storage::CatalogStorage;

/// Page URL -> last successfully ingested record.
pub type PageCache = BTreeMap<String, PageRecord>;

/// In-memory crawl cache with an explicit load/save lifecycle.
///
/// Loaded once before a run, mutated only by the orchestrator, saved once
/// after the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheStore {
    records: PageCache,
}

impl CacheStore {
    pub fn new(records: PageCache) -> Self {
        Self { records }
    }

    /// Load the persisted cache; a missing file yields an empty cache.
    pub async fn load(storage: &dyn CatalogStorage) -> Result<Self> {
        let records = storage.load_cache().await?;
        log::info!("Loaded {} cached pages", records.len());
        Ok(Self { records })
    }

    /// Overwrite the persisted cache with the current contents.
    pub async fn save(&self, storage: &dyn CatalogStorage) -> Result<()> {
        storage.save_cache(&self.records).await?;
        log::info!("Saved {} cached pages", self.records.len());
        Ok(())
    }

    pub fn get(&self, url: &str) -> Option<&PageRecord> {
        self.records.get(url)
    }

    pub fn put(&mut self, url: impl Into<String>, record: PageRecord) {
        self.records.insert(url.into(), record);
    }

    /// The cached record of `url`, if it matches the fetched timestamp.
    pub fn fresh(&self, url: &str, fetched_timestamp: &str) -> Option<&PageRecord> {
        self.get(url)
            .filter(|record| record.is_fresh(fetched_timestamp))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Total number of cached download entries.
    pub fn entry_count(&self) -> usize {
        self.records
            .values()
            .map(|record| record.download_options.len())
            .sum()
    }
}
