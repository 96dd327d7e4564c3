//! Storage abstractions for crawl state and catalog output.
//!
//! ## Directory Structure
//!
//! ```text
//! {storage}/
//! ├── config.toml                    # Crawler configuration
//! ├── hydra_links_igruha.json        # Canonical catalog
//! ├── stats_output.txt               # Last run statistics
//! ├── parser.log
//! ├── cache/
//! │   ├── parser_cache.json          # Page URL -> last ingested record
//! │   └── translation_cache.json     # Source title -> translation
//! └── json/
//!     └── ihl_2024-01-01_10-00-00.json   # Timestamped catalog backups
//! ```

pub mod cache;
pub mod local;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::Result;
use crate::models::{OutputDocument, RunStatistics};
use crate::services::translator::TranslationCache;

// Re-export for convenience
pub use cache::{CacheStore, PageCache};
pub use local::LocalStorage;

/// Trait for crawl state backends.
///
/// Writes are full overwrites; there is no partial flush.
#[async_trait]
pub trait CatalogStorage: Send + Sync {
    /// Load the crawl cache; empty when nothing was saved yet.
    async fn load_cache(&self) -> Result<PageCache>;

    async fn save_cache(&self, cache: &PageCache) -> Result<()>;

    /// Load the translation cache; empty when nothing was saved yet.
    async fn load_translations(&self) -> Result<TranslationCache>;

    async fn save_translations(&self, cache: &TranslationCache) -> Result<()>;

    /// Write the canonical catalog. Returns its location.
    async fn write_catalog(&self, document: &OutputDocument) -> Result<String>;

    /// Write a backup copy of the catalog named after `stamp`. Returns its location.
    async fn write_backup(&self, document: &OutputDocument, stamp: NaiveDateTime) -> Result<String>;

    /// Write the rendered run statistics. Returns their location.
    async fn write_stats(&self, stats: &RunStatistics) -> Result<String>;

    /// Read the canonical catalog, if one exists.
    async fn read_catalog(&self) -> Result<Option<OutputDocument>>;
}
