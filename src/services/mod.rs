//! Service layer for the crawler application.
//!
//! This module contains the business logic for:
//! - Torrent to magnet conversion (`magnet`)
//! - Download label parsing (`size_info`)
//! - Sitemap reading (`sitemap`)
//! - Page extraction (`PageExtractor`)
//! - Title translation (`TranslationGateway`)
//! - The incremental crawl itself (`CatalogCrawler`)

pub mod crawler;
pub mod extractor;
pub mod magnet;
pub mod size_info;
pub mod sitemap;
pub mod translator;

pub use crawler::{CatalogCrawler, CrawlReport, UrlOutcome};
pub use extractor::{PageExtractor, PageHeader};
pub use magnet::{DecodeError, MagnetInfo};
pub use size_info::{SizeInfo, parse_size_info};
pub use sitemap::{fetch_sitemap, parse_sitemap};
pub use translator::{
    GoogleTranslator, NoopTranslator, TranslationCache, TranslationGateway, Translator,
};
