// src/services/sitemap.rs

//! Sitemap reading: the ordered list of page URLs to crawl.

use scraper::{Html, Selector};

use crate::error::{AppError, Result};
use crate::utils::http::PageFetcher;

/// Namespace every standard sitemap declares.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Extract every `<loc>` under a sitemap-namespaced root, in document order.
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(xml);
    let root_sel = parse_selector("urlset, sitemapindex")?;
    let loc_sel = parse_selector("loc")?;

    let urls = document
        .select(&root_sel)
        .filter(|root| root.value().attr("xmlns") == Some(SITEMAP_NAMESPACE))
        .flat_map(|root| root.select(&loc_sel))
        .map(|loc| loc.text().collect::<String>().trim().to_string())
        .filter(|url| !url.is_empty())
        .collect();
    Ok(urls)
}

/// Download and parse a sitemap.
pub async fn fetch_sitemap(fetcher: &dyn PageFetcher, sitemap_url: &str) -> Result<Vec<String>> {
    let xml = fetcher.fetch_text(sitemap_url).await?;
    let urls = parse_sitemap(&xml)?;
    log::info!("Sitemap {} lists {} URLs", sitemap_url, urls.len());
    Ok(urls)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
