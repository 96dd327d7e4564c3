//! Catalog data structures: per-torrent descriptors, cached page records,
//! and the output document consumed by the download manager.

use serde::{Deserialize, Serialize};

/// A torrent link resolved from a title page.
///
/// Only links whose torrent file decoded successfully become descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentDescriptor {
    /// Descriptor text following the size in the label (e.g. "от xatab")
    pub info_label: String,

    /// Human-readable size (e.g. "5.2 GB")
    pub file_size_label: String,

    /// Torrent creation date (ISO-8601), when the file carries one
    pub creation_date: Option<String>,

    pub magnet_uri: String,
}

/// One downloadable option in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DownloadEntry {
    pub title: String,
    pub uris: Vec<String>,
    pub upload_date: String,
    pub file_size: String,
}

/// Last known crawl result for a page URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRecord {
    /// Raw update timestamp exactly as the site printed it
    #[serde(rename = "site_update_date")]
    pub page_update_timestamp: String,

    /// Page title before translation
    #[serde(rename = "site_game_name")]
    pub title_raw: String,

    #[serde(rename = "download_options")]
    pub download_options: Vec<DownloadEntry>,
}

impl PageRecord {
    /// A record is reusable iff the page still reports the same timestamp string.
    pub fn is_fresh(&self, fetched_timestamp: &str) -> bool {
        self.page_update_timestamp == fetched_timestamp
    }
}

/// The catalog written at the end of every run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputDocument {
    pub name: String,
    pub downloads: Vec<DownloadEntry>,
}

impl OutputDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            downloads: Vec::new(),
        }
    }

    /// Append entries, keeping their order.
    pub fn extend<'a>(&mut self, entries: impl IntoIterator<Item = &'a DownloadEntry>) {
        self.downloads.extend(entries.into_iter().cloned());
    }
}
