//! Local filesystem storage implementation.
//!
//! Every file is written atomically (temp file, then rename). JSON is
//! pretty-printed with four-space indentation and keeps non-ASCII text
//! unescaped, so cached Cyrillic titles stay readable.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Serializer;
use serde_json::ser::PrettyFormatter;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{OutputDocument, PathsConfig, RunStatistics};
use crate::services::translator::TranslationCache;
use crate::storage::{CatalogStorage, PageCache};

/// Timestamp format of backup file names.
pub const BACKUP_STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
    paths: PathsConfig,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory with default file names.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self::with_paths(root_dir, PathsConfig::default())
    }

    /// Create a LocalStorage with configured file names.
    pub fn with_paths(root_dir: impl Into<PathBuf>, paths: PathsConfig) -> Self {
        Self {
            root_dir: root_dir.into(),
            paths,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Get the full path for a relative key.
    pub fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Relative key of the backup written at `stamp`.
    pub fn backup_key(&self, stamp: NaiveDateTime) -> String {
        format!(
            "{}/{}_{}.json",
            self.paths.backup_dir,
            self.paths.backup_prefix,
            stamp.format(BACKUP_STAMP_FORMAT)
        )
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<String> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(path.display().to_string())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<String> {
        let bytes = to_json_bytes(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// Serialize with four-space indentation.
fn to_json_bytes<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut serializer)?;
    Ok(bytes)
}

#[async_trait]
impl CatalogStorage for LocalStorage {
    async fn load_cache(&self) -> Result<PageCache> {
        Ok(self.read_json(&self.paths.cache_key()).await?.unwrap_or_default())
    }

    async fn save_cache(&self, cache: &PageCache) -> Result<()> {
        self.write_json(&self.paths.cache_key(), cache).await?;
        Ok(())
    }

    async fn load_translations(&self) -> Result<TranslationCache> {
        Ok(self
            .read_json(&self.paths.translation_cache_key())
            .await?
            .unwrap_or_default())
    }

    async fn save_translations(&self, cache: &TranslationCache) -> Result<()> {
        self.write_json(&self.paths.translation_cache_key(), cache).await?;
        Ok(())
    }

    async fn write_catalog(&self, document: &OutputDocument) -> Result<String> {
        let location = self.write_json(&self.paths.data_file, document).await?;
        log::info!("Catalog with {} entries saved to {}", document.downloads.len(), location);
        Ok(location)
    }

    async fn write_backup(&self, document: &OutputDocument, stamp: NaiveDateTime) -> Result<String> {
        let location = self.write_json(&self.backup_key(stamp), document).await?;
        log::info!("The backup data is saved in file {}", location);
        Ok(location)
    }

    async fn write_stats(&self, stats: &RunStatistics) -> Result<String> {
        self.write_bytes(&self.paths.stats_file, stats.to_report().as_bytes())
            .await
    }

    async fn read_catalog(&self) -> Result<Option<OutputDocument>> {
        self.read_json(&self.paths.data_file).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{DownloadEntry, PageRecord};

    fn document() -> OutputDocument {
        let mut document = OutputDocument::new("Torrents-Igruha");
        document.downloads.push(DownloadEntry {
            title: "Эпоха парусов by xatab".to_string(),
            uris: vec!["magnet:?xt=urn:btih:AAAA&dn=sail&xl=1".to_string()],
            upload_date: "2024-01-01T10:00:00Z".to_string(),
            file_size: "5.2 GB".to_string(),
        });
        document
    }

    #[tokio::test]
    async fn test_catalog_is_pretty_and_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_catalog(&document()).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("hydra_links_igruha.json")).unwrap();
        assert!(text.starts_with("{\n    \"name\": \"Torrents-Igruha\""));
        assert!(text.contains("\"title\": \"Эпоха парусов by xatab\""));
        assert!(text.contains("\"uploadDate\""));
        assert!(!dir.path().join("hydra_links_igruha.tmp").exists());

        assert_eq!(storage.read_catalog().await.unwrap(), Some(document()));
    }

    #[tokio::test]
    async fn test_backup_does_not_replace_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let stamp = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(7, 5, 1)
            .unwrap();

        storage.write_backup(&document(), stamp).await.unwrap();

        assert!(dir.path().join("json/ihl_2024-03-09_07-05-01.json").exists());
        assert_eq!(storage.read_catalog().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_caches_round_trip_in_configured_locations() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathsConfig {
            cache_dir: "state".to_string(),
            cache_file: "pages.json".to_string(),
            translation_cache_file: "titles.json".to_string(),
            ..PathsConfig::default()
        };
        let storage = LocalStorage::with_paths(dir.path(), paths);

        assert!(storage.load_cache().await.unwrap().is_empty());
        assert!(storage.load_translations().await.unwrap().is_empty());

        let mut cache = PageCache::new();
        cache.insert(
            "https://site.test/1.html".to_string(),
            PageRecord {
                page_update_timestamp: "01.01.2024, 10:00".to_string(),
                title_raw: "Игра".to_string(),
                download_options: document().downloads,
            },
        );
        let mut translations = TranslationCache::new();
        translations.insert("Игра".to_string(), "Game".to_string());

        storage.save_cache(&cache).await.unwrap();
        storage.save_translations(&translations).await.unwrap();

        assert!(dir.path().join("state/pages.json").exists());
        assert_eq!(storage.load_cache().await.unwrap(), cache);
        assert_eq!(storage.load_translations().await.unwrap(), translations);
    }

    #[tokio::test]
    async fn test_stats_file_starts_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path());
        let stats = RunStatistics {
            invalid_pages: 3,
            ..RunStatistics::default()
        };

        storage.write_stats(&stats).await.unwrap();

        let text = std::fs::read_to_string(dir.path().join("stats_output.txt")).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(crate::models::STATS_HEADER));
        assert!(text.contains("Invalid Pages: 3"));
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("cache")).unwrap();
        std::fs::write(dir.path().join("cache/parser_cache.json"), "{not json").unwrap();

        let storage = LocalStorage::new(dir.path());
        assert!(matches!(storage.load_cache().await, Err(AppError::Json(_))));
    }
}
