//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PageSelectors;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Source site identity
    #[serde(default)]
    pub site: SiteConfig,

    /// Where persisted state lives (relative to the storage directory)
    #[serde(default)]
    pub paths: PathsConfig,

    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Title translation settings
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Markup lookups for the source site
    #[serde(default)]
    pub selectors: PageSelectors,

    /// Fixed regression URL list
    #[serde(default)]
    pub test_mode: TestModeConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.site.name.trim().is_empty() {
            return Err(AppError::validation("site.name is empty"));
        }
        if self.site.sitemap_url.trim().is_empty() && !self.test_mode.enabled {
            return Err(AppError::validation(
                "site.sitemap_url is empty and test mode is disabled",
            ));
        }
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.paths.data_file.trim().is_empty() {
            return Err(AppError::validation("paths.data_file is empty"));
        }
        if self.paths.cache_file.trim().is_empty() {
            return Err(AppError::validation("paths.cache_file is empty"));
        }
        if self.paths.translation_cache_file.trim().is_empty() {
            return Err(AppError::validation("paths.translation_cache_file is empty"));
        }
        if !self.test_mode.enabled {
            Url::parse(&self.site.sitemap_url)?;
        }
        if self.test_mode.enabled && self.test_mode.problem_urls.is_empty() {
            return Err(AppError::validation(
                "test_mode is enabled but no problem_urls are defined",
            ));
        }
        self.selectors.compile()?;
        Ok(())
    }
}

/// Source site identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Display name written into the catalog
    #[serde(default = "defaults::site_name")]
    pub name: String,

    /// Sitemap listing every page to crawl
    #[serde(default = "defaults::sitemap_url")]
    pub sitemap_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: defaults::site_name(),
            sitemap_url: defaults::sitemap_url(),
        }
    }
}

/// Locations of persisted files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Log file; empty means log to stderr
    #[serde(default = "defaults::log_file")]
    pub log_file: String,

    /// Canonical catalog output
    #[serde(default = "defaults::data_file")]
    pub data_file: String,

    /// Directory for timestamped catalog copies
    #[serde(default = "defaults::backup_dir")]
    pub backup_dir: String,

    /// File name prefix of backup copies
    #[serde(default = "defaults::backup_prefix")]
    pub backup_prefix: String,

    /// Directory holding both cache files
    #[serde(default = "defaults::cache_dir")]
    pub cache_dir: String,

    /// Crawl cache (page URL -> last known record), inside `cache_dir`
    #[serde(default = "defaults::cache_file")]
    pub cache_file: String,

    /// Translation cache (source text -> translated text), inside `cache_dir`
    #[serde(default = "defaults::translation_cache_file")]
    pub translation_cache_file: String,

    /// Rendered run statistics
    #[serde(default = "defaults::stats_file")]
    pub stats_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_file: defaults::log_file(),
            data_file: defaults::data_file(),
            backup_dir: defaults::backup_dir(),
            backup_prefix: defaults::backup_prefix(),
            cache_dir: defaults::cache_dir(),
            cache_file: defaults::cache_file(),
            translation_cache_file: defaults::translation_cache_file(),
            stats_file: defaults::stats_file(),
        }
    }
}

impl PathsConfig {
    /// Storage key of the crawl cache.
    pub fn cache_key(&self) -> String {
        self.in_cache_dir(&self.cache_file)
    }

    /// Storage key of the translation cache.
    pub fn translation_cache_key(&self) -> String {
        self.in_cache_dir(&self.translation_cache_file)
    }

    fn in_cache_dir(&self, file: &str) -> String {
        Path::new(&self.cache_dir)
            .join(file)
            .to_string_lossy()
            .into_owned()
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between pages in milliseconds
    #[serde(default)]
    pub request_delay_ms: u64,

    /// Extra attempts after a transient fetch failure
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: 0,
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// Title translation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// When disabled, titles are only normalized
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    #[serde(default = "defaults::source_language")]
    pub source_language: String,

    #[serde(default = "defaults::target_language")]
    pub target_language: String,

    /// Translation endpoint (`translate_a/single` compatible)
    #[serde(default = "defaults::translate_endpoint")]
    pub endpoint: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            source_language: defaults::source_language(),
            target_language: defaults::target_language(),
            endpoint: defaults::translate_endpoint(),
        }
    }
}

/// Regression run over a fixed list of known-problematic pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestModeConfig {
    /// Replace the sitemap with `problem_urls`
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "defaults::problem_urls")]
    pub problem_urls: Vec<String>,
}

impl Default for TestModeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            problem_urls: defaults::problem_urls(),
        }
    }
}

mod defaults {
    // Site defaults
    pub fn site_name() -> String {
        "Torrents-Igruha".into()
    }
    pub fn sitemap_url() -> String {
        "https://itorrents-igruha.org/sitemap.xml".into()
    }

    // Path defaults
    pub fn log_file() -> String {
        "parser.log".into()
    }
    pub fn data_file() -> String {
        "hydra_links_igruha.json".into()
    }
    pub fn backup_dir() -> String {
        "json".into()
    }
    pub fn backup_prefix() -> String {
        "ihl".into()
    }
    pub fn cache_dir() -> String {
        "cache".into()
    }
    pub fn cache_file() -> String {
        "parser_cache.json".into()
    }
    pub fn translation_cache_file() -> String {
        "translation_cache.json".into()
    }
    pub fn stats_file() -> String {
        "stats_output.txt".into()
    }

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; catalog-crawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_delay() -> u64 {
        1000
    }

    // Translation defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn source_language() -> String {
        "ru".into()
    }
    pub fn target_language() -> String {
        "en".into()
    }
    pub fn translate_endpoint() -> String {
        "https://translate.googleapis.com/translate_a/single".into()
    }

    // Pages that once broke the parser (dead torrents, missing creation dates)
    pub fn problem_urls() -> Vec<String> {
        [
            "https://itorrents-igruha.org/8095-believe.html",
            "https://itorrents-igruha.org/14496-sailing-era.html",
            "https://itorrents-igruha.org/3671-1-126821717.html",
            "https://itorrents-igruha.org/11642-8-99980.html",
            "https://itorrents-igruha.org/7793-muse-dash.html",
            "https://itorrents-igruha.org/15285-metaphor-refantazio.html",
            "https://itorrents-igruha.org/2576-witchfire.html",
            "https://itorrents-igruha.org/3821-126821717.html",
            "https://itorrents-igruha.org/16170-windblown.html",
        ]
        .into_iter()
        .map(String::from)
        .collect()
    }
}
