// src/services/crawler.rs

//! Incremental catalog crawl.
//!
//! Every URL runs through one pass of the state machine below and ends in
//! exactly one outcome:
//!
//! ```text
//! fetch ─┬─ connectivity failure ─────────────► ERROR_CONNECTING
//!        ├─ timestamp or title missing ───────► INVALID_PAGE
//!        ├─ timestamp equals cached one ──────► CACHE
//!        ├─ no torrent resolves ──────────────► NO_DOWNLOAD_OPTIONS
//!        ├─ downloads found ──────────────────► ADDED | UPDATED
//!        └─ anything else fails ──────────────► ERROR_PROCESSING
//! ```
//!
//! Entries of a page are built in full before the cache and the output are
//! touched, so a failing page never leaves partial state behind.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;

use crate::error::Result;
use crate::models::{DownloadEntry, OutputDocument, PageRecord, RunStatistics, TorrentDescriptor};
use crate::services::extractor::PageExtractor;
use crate::services::translator::TranslationGateway;
use crate::storage::CacheStore;
use crate::utils::date_to_iso;
use crate::utils::http::PageFetcher;

static BY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\bот\b").ok());

/// Terminal state of a successfully processed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    /// Timestamp or title missing; not a game page
    InvalidPage,

    /// Timestamp unchanged; the cached entries are served
    CacheHit { title: String, timestamp: String, entries: Vec<DownloadEntry> },

    /// A game page without any usable torrent
    NoDownloads { title: String, timestamp: String },

    /// Freshly derived record, ready to be committed
    Ingested { record: PageRecord, previous_timestamp: Option<String> },
}

/// Output of a full pass.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub document: OutputDocument,
    pub stats: RunStatistics,
}

/// Orchestrates fetching, cache lookup, extraction and translation.
pub struct CatalogCrawler {
    fetcher: Arc<dyn PageFetcher>,
    extractor: PageExtractor,
    translator: TranslationGateway,
    cache: CacheStore,
    request_delay: Duration,
}

impl CatalogCrawler {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: PageExtractor,
        translator: TranslationGateway,
        cache: CacheStore,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            translator,
            cache,
            request_delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive URLs.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn translator(&self) -> &TranslationGateway {
        &self.translator
    }

    /// Hand back the cache and translator for persisting.
    pub fn into_parts(self) -> (CacheStore, TranslationGateway) {
        (self.cache, self.translator)
    }

    /// Crawl `urls` in order and assemble the catalog.
    ///
    /// Never fails as a whole: every URL ends up in exactly one statistic.
    pub async fn run(&mut self, site_name: &str, urls: &[String]) -> CrawlReport {
        let mut report = CrawlReport {
            document: OutputDocument::new(site_name),
            stats: RunStatistics::default(),
        };

        for (position, url) in urls.iter().enumerate() {
            let index = position + 1;
            if position > 0 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            match self.process_url(url).await {
                Ok(outcome) => self.commit(index, url, outcome, &mut report),
                Err(e) if e.is_connectivity() => {
                    log::error!("{index}. Error connecting to {url}: {e}");
                    report.stats.error_connecting.push(format!("{index}. {url}"));
                }
                Err(e) => {
                    log::error!("{index}. Error processing {url}: {e}");
                    report.stats.error_processing.push(format!("{index}. {url}"));
                }
            }
        }

        log::info!(
            "Crawl finished: {} URLs, {} entries, {} errors",
            urls.len(),
            report.document.downloads.len(),
            report.stats.error_count()
        );
        report
    }

    /// Classify one URL without touching the cache or the output.
    pub async fn process_url(&mut self, url: &str) -> Result<UrlOutcome> {
        let html = self.fetcher.fetch_text(url).await?;

        let header = self.extractor.extract_header(&html);
        let (Some(timestamp), Some(title)) = (header.update_timestamp, header.title) else {
            return Ok(UrlOutcome::InvalidPage);
        };

        if let Some(record) = self.cache.fresh(url, &timestamp) {
            return Ok(UrlOutcome::CacheHit {
                title: record.title_raw.clone(),
                timestamp: record.page_update_timestamp.clone(),
                entries: record.download_options.clone(),
            });
        }
        let previous_timestamp = self
            .cache
            .get(url)
            .map(|record| record.page_update_timestamp.clone());

        let descriptors = self.extractor.extract_download_options(url, &html).await;
        if descriptors.is_empty() {
            return Ok(UrlOutcome::NoDownloads { title, timestamp });
        }

        let translated = self.translator.translate(&title).await;
        let download_options = descriptors
            .into_iter()
            .map(|descriptor| build_entry(&translated, &timestamp, descriptor))
            .collect::<Result<Vec<_>>>()?;

        Ok(UrlOutcome::Ingested {
            record: PageRecord {
                page_update_timestamp: timestamp,
                title_raw: title,
                download_options,
            },
            previous_timestamp,
        })
    }

    /// Apply an outcome to the cache, the output and the statistics.
    fn commit(&mut self, index: usize, url: &str, outcome: UrlOutcome, report: &mut CrawlReport) {
        let stats = &mut report.stats;
        match outcome {
            UrlOutcome::InvalidPage => {
                log::info!("{index}. (INVALID_PAGE) {url}");
                stats.invalid_pages += 1;
            }
            UrlOutcome::CacheHit { title, timestamp, entries } => {
                log::info!("{index}. (CACHE) {title} / {timestamp} / {url}");
                log_entries(&entries);
                stats.download_options += entries.len();
                report.document.extend(&entries);
            }
            UrlOutcome::NoDownloads { title, timestamp } => {
                log::info!("{index}. (NO_DOWNLOAD_OPTIONS) {title} / {timestamp} / {url}");
                stats.no_download_options += 1;
            }
            UrlOutcome::Ingested { record, previous_timestamp } => {
                let line = match previous_timestamp {
                    Some(previous) => {
                        let line = format!(
                            "{index}. (UPDATED) {} / {previous} -> {} / {url}",
                            record.title_raw, record.page_update_timestamp
                        );
                        stats.updated_games.push(line.clone());
                        line
                    }
                    None => {
                        let line = format!(
                            "{index}. (ADDED) {} / {} / {url}",
                            record.title_raw, record.page_update_timestamp
                        );
                        stats.added_games.push(line.clone());
                        line
                    }
                };
                log::info!("{line}");
                log_entries(&record.download_options);

                stats.download_options += record.download_options.len();
                report.document.extend(&record.download_options);
                self.cache.put(url, record);
            }
        }
    }
}

/// Build the catalog entry of one torrent.
fn build_entry(
    translated_title: &str,
    page_timestamp: &str,
    descriptor: TorrentDescriptor,
) -> Result<DownloadEntry> {
    let upload_date = match descriptor.creation_date {
        Some(date) => date,
        None => date_to_iso(page_timestamp)?,
    };

    Ok(DownloadEntry {
        title: format!("{translated_title} {}", replace_by(&descriptor.info_label)),
        uris: vec![descriptor.magnet_uri],
        upload_date,
        file_size: descriptor.file_size_label,
    })
}

/// Replace the whole word "от" with "by".
fn replace_by(info: &str) -> String {
    match BY_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(info, "by").into_owned(),
        None => info.to_string(),
    }
}

fn log_entries(entries: &[DownloadEntry]) {
    for entry in entries {
        log::info!("       {} / {} / {}", entry.title, entry.upload_date, entry.file_size);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::error::AppError;
    use crate::models::{PageSelectors, TranslationConfig};
    use crate::services::extractor::tests::{
        MapFetcher, download_page, title_page, torrent_bytes,
    };
    use crate::services::translator::Translator;

    struct UpperTranslator;

    #[async_trait]
    impl Translator for UpperTranslator {
        async fn translate_line(&self, text: &str, _target: &str, _source: &str) -> Result<String> {
            if text.contains("сломан") {
                return Err(AppError::fetch("translate", "503"));
            }
            Ok(format!("EN {text}"))
        }
    }

    const A: &str = "https://site.test/1-game-a.html";
    const B: &str = "https://site.test/2-game-b.html";
    const C: &str = "https://site.test/3-game-c.html";

    fn crawler(fetcher: MapFetcher, cache: CacheStore) -> CatalogCrawler {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(fetcher);
        let selectors = PageSelectors::default().compile().unwrap();
        let extractor = PageExtractor::new(selectors, fetcher.clone());
        let translator = TranslationGateway::new(Arc::new(UpperTranslator), &TranslationConfig::default());
        CatalogCrawler::new(fetcher, extractor, translator, cache)
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|u| u.to_string()).collect()
    }

    fn game_a(fetcher: MapFetcher, timestamp: &str) -> MapFetcher {
        fetcher
            .with(A, title_page(timestamp, "Game A", &[("5.2 GB от xatab", "/dl/a")]))
            .with("https://site.test/dl/a", download_page("/files/a.torrent"))
            .with("https://site.test/files/a.torrent", torrent_bytes("game-a", 42, None))
    }

    fn cached_b() -> PageRecord {
        PageRecord {
            page_update_timestamp: "02.02.2024, 12:30".to_string(),
            title_raw: "Game B".to_string(),
            download_options: vec![DownloadEntry {
                title: "Game B by R.G. Mechanics".to_string(),
                uris: vec!["magnet:?xt=urn:btih:BBBB&dn=game-b&xl=7".to_string()],
                upload_date: "2023-12-31T08:00:00Z".to_string(),
                file_size: "1.1 GB".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_end_to_end_added_cached_and_unreachable() {
        let fetcher = game_a(MapFetcher::default(), "01.01.2024, 10:00")
            .with(B, title_page("02.02.2024, 12:30", "Game B", &[("1.1 GB", "/dl/b")]));
        let mut cache = CacheStore::default();
        cache.put(B, cached_b());

        let mut crawler = crawler(fetcher, cache);
        let report = crawler.run("Torrents-Igruha", &urls(&[A, B, C])).await;

        let downloads = &report.document.downloads;
        assert_eq!(report.document.name, "Torrents-Igruha");
        assert_eq!(downloads.len(), 2);
        assert_eq!(downloads[0].title, "Game A by xatab");
        assert_eq!(downloads[0].upload_date, "2024-01-01T10:00:00Z");
        assert_eq!(downloads[0].file_size, "5.2 GB");
        assert!(downloads[0].uris[0].starts_with("magnet:?xt=urn:btih:"));
        assert_eq!(downloads[1], cached_b().download_options[0]);

        assert_eq!(
            report.stats.added_games,
            vec![format!("1. (ADDED) Game A / 01.01.2024, 10:00 / {A}")]
        );
        assert_eq!(report.stats.error_connecting, vec![format!("3. {C}")]);
        assert_eq!(report.stats.download_options, 2);
        assert!(report.stats.updated_games.is_empty());

        let record = crawler.cache().get(A).unwrap();
        assert_eq!(record.title_raw, "Game A");
        assert_eq!(record.download_options, vec![downloads[0].clone()]);
        assert!(crawler.cache().get(C).is_none());
    }

    #[tokio::test]
    async fn test_second_run_is_served_from_cache() {
        let fetcher = game_a(MapFetcher::default(), "01.01.2024, 10:00");
        let mut first = crawler(fetcher, CacheStore::default());
        let first_report = first.run("site", &urls(&[A])).await;
        let (cache, _) = first.into_parts();

        // Torrent gone: a cache hit must not touch it.
        let fetcher = MapFetcher::default()
            .with(A, title_page("01.01.2024, 10:00", "Game A", &[("5.2 GB от xatab", "/dl/a")]));
        let mut second = crawler(fetcher, cache);
        let outcome = second.process_url(A).await.unwrap();
        assert!(matches!(outcome, UrlOutcome::CacheHit { .. }));

        let second_report = second.run("site", &urls(&[A])).await;
        assert_eq!(second_report.document.downloads, first_report.document.downloads);
        assert!(second_report.stats.added_games.is_empty());
        assert_eq!(second_report.stats.download_options, 1);
    }

    #[tokio::test]
    async fn test_changed_timestamp_is_an_update() {
        let fetcher = game_a(MapFetcher::default(), "01.01.2024, 10:00");
        let mut first = crawler(fetcher, CacheStore::default());
        first.run("site", &urls(&[A])).await;
        let (cache, _) = first.into_parts();

        let fetcher = game_a(MapFetcher::default(), "05.01.2024, 18:45");
        let mut second = crawler(fetcher, cache);
        let report = second.run("site", &urls(&[A])).await;

        assert_eq!(
            report.stats.updated_games,
            vec![format!("1. (UPDATED) Game A / 01.01.2024, 10:00 -> 05.01.2024, 18:45 / {A}")]
        );
        assert!(report.stats.added_games.is_empty());
        assert_eq!(report.document.downloads[0].upload_date, "2024-01-05T18:45:00Z");
        assert_eq!(
            second.cache().get(A).unwrap().page_update_timestamp,
            "05.01.2024, 18:45"
        );
    }

    #[tokio::test]
    async fn test_page_without_downloads() {
        let fetcher = MapFetcher::default()
            .with(A, title_page("01.01.2024, 10:00", "Game A", &[("5.2 GB", "/dl/a")]))
            .with("https://site.test/dl/a", download_page("/files/a.torrent"))
            .with("https://site.test/files/a.torrent", "not a torrent");

        let mut crawler = crawler(fetcher, CacheStore::default());
        let report = crawler.run("site", &urls(&[A])).await;

        assert!(report.document.downloads.is_empty());
        assert_eq!(report.stats.no_download_options, 1);
        assert!(crawler.cache().get(A).is_none());
    }

    #[tokio::test]
    async fn test_invalid_page_and_processing_error() {
        let fetcher = MapFetcher::default()
            .with(A, "<html><body><h1>Новости</h1></body></html>")
            .with(B, title_page("вчера", "Игра", &[("2 GB", "/dl/b")]))
            .with("https://site.test/dl/b", download_page("/files/b.torrent"))
            .with("https://site.test/files/b.torrent", torrent_bytes("b", 1, None));
        let mut cache = CacheStore::default();
        cache.put(B, cached_b());

        let mut crawler = crawler(fetcher, cache);
        let report = crawler.run("site", &urls(&[A, B])).await;

        assert_eq!(report.stats.invalid_pages, 1);
        assert_eq!(report.stats.error_processing, vec![format!("2. {B}")]);
        assert!(report.document.downloads.is_empty());
        assert_eq!(crawler.cache().get(B), Some(&cached_b()));
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_source_title() {
        let fetcher = MapFetcher::default()
            .with(A, title_page("01.01.2024, 10:00", "сломанная игра", &[("3 GB от FitGirl |", "/dl/a")]))
            .with("https://site.test/dl/a", download_page("/files/a.torrent"))
            .with("https://site.test/files/a.torrent", torrent_bytes("a", 9, Some(1_700_000_000)));

        let mut crawler = crawler(fetcher, CacheStore::default());
        let report = crawler.run("site", &urls(&[A])).await;

        let entry = &report.document.downloads[0];
        assert_eq!(entry.title, "сломанная игра by FitGirl");
        assert_eq!(entry.upload_date, "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_replace_by_whole_word_only() {
        assert_eq!(replace_by("от xatab"), "by xatab");
        assert_eq!(replace_by("Repack от Decepticon"), "Repack by Decepticon");
        assert_eq!(replace_by("отличный"), "отличный");
    }
}
