// src/services/extractor.rs

//! Page extraction: header fields of a title page and its torrent downloads.
//!
//! Parsed documents never live across an await point; each page is read
//! into owned values first and the network work runs afterwards.

use std::sync::Arc;

use scraper::{ElementRef, Html};

use crate::models::{CompiledSelectors, TorrentDescriptor};
use crate::services::magnet;
use crate::services::size_info::parse_size_info;
use crate::utils::http::PageFetcher;
use crate::utils::{format_size, resolve};

/// Header fields of a title page. A page missing either is not a game page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageHeader {
    /// Raw update timestamp, byte-exact as printed
    pub update_timestamp: Option<String>,
    /// Trimmed page title
    pub title: Option<String>,
}

/// A download trigger found on a title page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    /// Absolute URL of the intermediate download page
    pub url: String,
    /// Text of the size label preceding the link's list
    pub label: Option<String>,
}

/// Reads title pages and resolves their torrent links into descriptors.
pub struct PageExtractor {
    selectors: CompiledSelectors,
    fetcher: Arc<dyn PageFetcher>,
}

impl PageExtractor {
    pub fn new(selectors: CompiledSelectors, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { selectors, fetcher }
    }

    /// Parse the update timestamp and title of a page.
    pub fn extract_header(&self, html: &str) -> PageHeader {
        let document = Html::parse_document(html);

        let update_timestamp = document
            .select(&self.selectors.article_info)
            .next()
            .and_then(|info| info.select(&self.selectors.published_time).next())
            .map(|time| time.text().collect::<String>())
            .filter(|text| !text.is_empty());

        let title = document
            .select(&self.selectors.title_container)
            .next()
            .and_then(|container| container.select(&self.selectors.title_heading).next())
            .map(|heading| heading.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty());

        PageHeader {
            update_timestamp,
            title,
        }
    }

    /// Collect the download triggers of a page, in document order.
    pub fn download_links(&self, page_url: &str, html: &str) -> Vec<DownloadLink> {
        let document = Html::parse_document(html);

        document
            .select(&self.selectors.download_link)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                if href == self.selectors.skip_href {
                    return None;
                }
                Some(DownloadLink {
                    url: resolve(page_url, href),
                    label: self.label_for(&document, link),
                })
            })
            .collect()
    }

    /// Label text of the last label container preceding the link's list.
    fn label_for(&self, document: &Html, link: ElementRef<'_>) -> Option<String> {
        let list = link
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| self.selectors.link_list.matches(el))?;

        let mut container = None;
        for node in document.tree.root().descendants() {
            if node.id() == list.id() {
                break;
            }
            if let Some(el) = ElementRef::wrap(node) {
                if self.selectors.label_container.matches(&el) {
                    container = Some(el);
                }
            }
        }

        let label = container?.select(&self.selectors.size_label).next()?;
        Some(stripped_text(label))
    }

    /// Locate the `.torrent` link on an intermediate download page.
    pub fn torrent_file_url(&self, page_url: &str, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors.torrent_file_link)
            .next()
            .and_then(|link| link.value().attr("href"))
            .map(|href| resolve(page_url, href))
    }

    /// Resolve every download trigger of a page into a descriptor.
    ///
    /// Each link fails on its own: a dead torrent or a failed sub-fetch only
    /// drops that link.
    pub async fn extract_download_options(
        &self,
        page_url: &str,
        html: &str,
    ) -> Vec<TorrentDescriptor> {
        let links = self.download_links(page_url, html);

        let mut descriptors = Vec::new();
        for link in &links {
            if let Some(descriptor) = self.resolve_link(link).await {
                descriptors.push(descriptor);
            }
        }
        descriptors
    }

    async fn resolve_link(&self, link: &DownloadLink) -> Option<TorrentDescriptor> {
        let Some(label) = link.label.as_deref() else {
            log::debug!("No size label for {}", link.url);
            return None;
        };

        let download_page = match self.fetcher.fetch_text(&link.url).await {
            Ok(page) => page,
            Err(e) => {
                log::error!("Failed to process {}: {}", link.url, e);
                return None;
            }
        };
        let Some(torrent_url) = self.torrent_file_url(&link.url, &download_page) else {
            log::debug!("No torrent file link on {}", link.url);
            return None;
        };

        let bytes = match self.fetcher.fetch_bytes(&torrent_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("Failed to download {}: {}", torrent_url, e);
                return None;
            }
        };
        let magnet = match magnet::encode(&bytes) {
            Ok(magnet) => magnet,
            Err(e) => {
                log::error!("Dead torrent {}: {}", torrent_url, e);
                return None;
            }
        };

        let size_info = parse_size_info(label);
        let file_size_label = if size_info.is_unknown_size() && magnet.total_length > 0 {
            format_size(magnet.total_length)
        } else {
            size_info.size
        };

        Some(TorrentDescriptor {
            info_label: size_info.info,
            file_size_label,
            creation_date: magnet.creation_date,
            magnet_uri: magnet.magnet_uri,
        })
    }
}

/// Every text node trimmed, then concatenated.
fn stripped_text(element: ElementRef<'_>) -> String {
    element.text().map(str::trim).collect()
}
