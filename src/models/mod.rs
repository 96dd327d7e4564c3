// src/models/mod.rs

//! Domain models for the catalog crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod catalog;
mod config;
mod selectors;
mod stats;

// Re-export all public types
pub use catalog::{DownloadEntry, OutputDocument, PageRecord, TorrentDescriptor};
pub use config::{
    Config, CrawlerConfig, PathsConfig, SiteConfig, TestModeConfig, TranslationConfig,
};
pub use selectors::{CompiledSelectors, PageSelectors};
pub use stats::{RunStatistics, STATS_HEADER};
