// src/pipeline/crawl.rs

//! Catalog crawling pipeline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, Utc};

use crate::error::{AppError, Result};
use crate::models::{Config, RunStatistics};
use crate::services::{
    CatalogCrawler, PageExtractor, TranslationCache, TranslationGateway, Translator, fetch_sitemap,
};
use crate::storage::{CacheStore, CatalogStorage};
use crate::utils::http::PageFetcher;

/// Where the URL list comes from and how much of it to crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Crawl the configured regression URLs instead of the sitemap
    pub test_urls: bool,

    /// Crawl only the first N URLs
    pub limit: Option<usize>,

    /// Explicit URLs; overrides both the sitemap and test mode
    pub urls: Vec<String>,
}

/// What a finished run wrote.
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub stats: RunStatistics,
    pub entry_count: usize,
    pub catalog_location: String,
    pub backup_location: String,
    pub stats_location: String,
}

/// Build the ordered URL list for a run.
///
/// An unavailable sitemap or an empty list is fatal: nothing has been
/// loaded or written at this point.
pub async fn resolve_urls(
    config: &Config,
    fetcher: &dyn PageFetcher,
    options: &CrawlOptions,
) -> Result<Vec<String>> {
    let mut urls = if !options.urls.is_empty() {
        log::info!("Crawling {} URLs given on the command line", options.urls.len());
        options.urls.clone()
    } else if options.test_urls || config.test_mode.enabled {
        log::info!(
            "Test mode: crawling {} known problem URLs",
            config.test_mode.problem_urls.len()
        );
        config.test_mode.problem_urls.clone()
    } else {
        fetch_sitemap(fetcher, &config.site.sitemap_url).await?
    };

    if let Some(limit) = options.limit {
        urls.truncate(limit);
    }
    if urls.is_empty() {
        return Err(AppError::crawl("url list", "no URLs to crawl"));
    }
    Ok(urls)
}

/// Run the catalog crawler end to end.
pub async fn run_crawler(
    config: &Config,
    storage: &dyn CatalogStorage,
    fetcher: Arc<dyn PageFetcher>,
    translator: Arc<dyn Translator>,
    options: &CrawlOptions,
) -> Result<CrawlSummary> {
    let start_time = Utc::now();
    log::info!("Parsing {} started", config.site.name);

    let urls = resolve_urls(config, fetcher.as_ref(), options).await?;
    log::info!("{} URLs to process", urls.len());

    let selectors = config.selectors.compile()?;
    let cache = CacheStore::load(storage).await.unwrap_or_else(|e| {
        log::warn!("Crawl cache unreadable, starting empty: {e}");
        CacheStore::default()
    });
    let translations = storage.load_translations().await.unwrap_or_else(|e| {
        log::warn!("Translation cache unreadable, starting empty: {e}");
        TranslationCache::new()
    });

    let extractor = PageExtractor::new(selectors, Arc::clone(&fetcher));
    let gateway = TranslationGateway::new(translator, &config.translation).with_cache(translations);
    let mut crawler = CatalogCrawler::new(fetcher, extractor, gateway, cache)
        .with_request_delay(Duration::from_millis(config.crawler.request_delay_ms));

    let report = crawler.run(&config.site.name, &urls).await;
    let (cache, gateway) = crawler.into_parts();

    // Every write is attempted; the first failure is reported afterwards.
    let mut first_error = None;
    keep_going(cache.save(storage).await, "crawl cache", &mut first_error);
    keep_going(
        storage.save_translations(gateway.cache()).await,
        "translation cache",
        &mut first_error,
    );
    let catalog_location = keep_going(
        storage.write_catalog(&report.document).await,
        "catalog",
        &mut first_error,
    );
    let backup_location = keep_going(
        storage
            .write_backup(&report.document, Local::now().naive_local())
            .await,
        "backup",
        &mut first_error,
    );
    let stats_location = keep_going(
        storage.write_stats(&report.stats).await,
        "statistics",
        &mut first_error,
    );

    for line in report.stats.render() {
        log::info!("{line}");
    }
    let elapsed = Utc::now() - start_time;
    log::info!(
        "Parsing {} finished in {}s",
        config.site.name,
        elapsed.num_seconds()
    );

    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(CrawlSummary {
        entry_count: report.document.downloads.len(),
        stats: report.stats,
        catalog_location: catalog_location.unwrap_or_default(),
        backup_location: backup_location.unwrap_or_default(),
        stats_location: stats_location.unwrap_or_default(),
    })
}

/// Log a failed write and remember the first one.
fn keep_going<T>(result: Result<T>, what: &str, first_error: &mut Option<AppError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::error!("Failed to save {what}: {e}");
            if first_error.is_none() {
                *first_error = Some(e);
            }
            None
        }
    }
}
