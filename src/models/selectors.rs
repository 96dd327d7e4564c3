// src/models/selectors.rs

//! CSS selectors describing the source site's page markup.

use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// CSS selectors for scraping a title page and its download pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSelectors {
    /// Container holding the article metadata
    #[serde(default = "defaults::article_info")]
    pub article_info: String,

    /// Publication/update time inside `article_info`
    #[serde(default = "defaults::published_time")]
    pub published_time: String,

    /// Container holding the page heading
    #[serde(default = "defaults::title_container")]
    pub title_container: String,

    /// Heading inside `title_container`
    #[serde(default = "defaults::title_heading")]
    pub title_heading: String,

    /// Links that lead to an intermediate download page
    #[serde(default = "defaults::download_link")]
    pub download_link: String,

    /// Href of a navigation link that shares the download link styling
    #[serde(default = "defaults::skip_href")]
    pub skip_href: String,

    /// List wrapping a group of download links
    #[serde(default = "defaults::link_list")]
    pub link_list: String,

    /// Block preceding a link list that carries its size label
    #[serde(default = "defaults::label_container")]
    pub label_container: String,

    /// Size/descriptor label inside `label_container`
    #[serde(default = "defaults::size_label")]
    pub size_label: String,

    /// Link to the `.torrent` file on the intermediate page
    #[serde(default = "defaults::torrent_file_link")]
    pub torrent_file_link: String,
}

impl Default for PageSelectors {
    fn default() -> Self {
        Self {
            article_info: defaults::article_info(),
            published_time: defaults::published_time(),
            title_container: defaults::title_container(),
            title_heading: defaults::title_heading(),
            download_link: defaults::download_link(),
            skip_href: defaults::skip_href(),
            link_list: defaults::link_list(),
            label_container: defaults::label_container(),
            size_label: defaults::size_label(),
            torrent_file_link: defaults::torrent_file_link(),
        }
    }
}

impl PageSelectors {
    /// Parse every selector, failing on the first invalid one.
    pub fn compile(&self) -> Result<CompiledSelectors> {
        Ok(CompiledSelectors {
            article_info: parse_selector(&self.article_info)?,
            published_time: parse_selector(&self.published_time)?,
            title_container: parse_selector(&self.title_container)?,
            title_heading: parse_selector(&self.title_heading)?,
            download_link: parse_selector(&self.download_link)?,
            skip_href: self.skip_href.clone(),
            link_list: parse_selector(&self.link_list)?,
            label_container: parse_selector(&self.label_container)?,
            size_label: parse_selector(&self.size_label)?,
            torrent_file_link: parse_selector(&self.torrent_file_link)?,
        })
    }
}

/// Parsed form of [`PageSelectors`], ready for matching.
#[derive(Debug, Clone)]
pub struct CompiledSelectors {
    pub article_info: Selector,
    pub published_time: Selector,
    pub title_container: Selector,
    pub title_heading: Selector,
    pub download_link: Selector,
    pub skip_href: String,
    pub link_list: Selector,
    pub label_container: Selector,
    pub size_label: Selector,
    pub torrent_file_link: Selector,
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

mod defaults {
    pub fn article_info() -> String {
        "div#article-film-full-info".into()
    }
    pub fn published_time() -> String {
        "time.published".into()
    }
    pub fn title_container() -> String {
        "div.module-title".into()
    }
    pub fn title_heading() -> String {
        "h1".into()
    }
    pub fn download_link() -> String {
        "a.torrent".into()
    }
    pub fn skip_href() -> String {
        "/top-online.html".into()
    }
    pub fn link_list() -> String {
        "ul#navbartor".into()
    }
    pub fn label_container() -> String {
        "center".into()
    }
    pub fn size_label() -> String {
        r#"span[style="font-size:14pt;"]"#.into()
    }
    pub fn torrent_file_link() -> String {
        "a.torrent2".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_selectors_compile() {
        assert!(PageSelectors::default().compile().is_ok());
    }

    #[test]
    fn test_invalid_selector_reports_source() {
        let selectors = PageSelectors {
            link_list: "ul#[".to_string(),
            ..PageSelectors::default()
        };
        match selectors.compile() {
            Err(AppError::Selector { selector, .. }) => assert_eq!(selector, "ul#["),
            other => panic!("expected selector error, got {other:?}"),
        }
    }
}
