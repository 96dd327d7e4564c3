//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler`: Resolve the URL list, crawl it, persist the results

pub mod crawl;

pub use crawl::{CrawlOptions, CrawlSummary, resolve_urls, run_crawler};
