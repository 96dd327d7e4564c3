// src/utils/http.rs

//! HTTP client utilities and the page-fetch capability used by the crawler.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Capability to download a resource by URL.
///
/// Any `Err` is treated by callers as a connectivity failure for that URL.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch raw response bytes.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>>;

    /// Fetch a response decoded as text.
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// `reqwest`-backed fetcher with a bounded retry loop for transient failures.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::with_client(create_async_client(config)?, config))
    }

    pub fn with_client(client: Client, config: &CrawlerConfig) -> Self {
        Self {
            client,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Send a GET, retrying transport errors and retryable statuses.
    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            let outcome = self.client.get(url).send().await;
            let retryable = match &outcome {
                Ok(response) => is_retryable(response.status()),
                Err(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            };

            if !retryable || attempt >= self.max_retries {
                let response = outcome?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AppError::fetch(url, format!("HTTP status {status}")));
                }
                return Ok(response);
            }

            attempt += 1;
            log::debug!("Retrying {url} (attempt {attempt}/{})", self.max_retries);
            if !self.retry_delay.is_zero() {
                tokio::time::sleep(self.retry_delay * attempt).await;
            }
        }
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFetcher(&'static [u8]);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_bytes(&self, _url: &str) -> Result<Vec<u8>> {
            Ok(self.0.to_vec())
        }
    }

    #[tokio::test]
    async fn test_default_fetch_text_is_lossy_utf8() {
        let fetcher = StaticFetcher(b"caf\xc3\xa9 \xff");
        let text = fetcher.fetch_text("https://example.com").await.unwrap();
        assert_eq!(text, "café \u{fffd}");
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::OK));
    }

    #[test]
    fn test_client_builds_from_default_config() {
        let fetcher = HttpFetcher::new(&CrawlerConfig::default());
        assert!(fetcher.is_ok());
    }
}
