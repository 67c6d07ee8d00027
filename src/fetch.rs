//! # Fetch Cache Module
//!
//! ## Purpose
//! Retrieves source documents (HTML pages, clerk XML feeds) by URL with a
//! transparent local cache: a cache hit never touches the network, a miss
//! performs one GET and persists the body verbatim before returning it.
//!
//! ## Input/Output Specification
//! - **Input**: URL, cache path, force-reload flag
//! - **Output**: Document body as text; exactly one cache file written per
//!   network fetch
//! - **Expiry**: none — a cache file is valid until a reload is forced
//!
//! Writes go to a temp file in the cache directory and rename into place,
//! so concurrent workers fetching distinct URLs never observe a partial
//! file. Network failures propagate to the caller and abort that entity
//! only.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::config::FetchConfig;
use crate::errors::{PipelineError, Result};

/// Fetch-with-local-cache layer shared by all scrapers
pub struct FetchCache {
    client: Client,
    permits: Arc<Semaphore>,
}

impl FetchCache {
    /// Build the HTTP client and concurrency gate from configuration
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PipelineError::Config {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrent_fetches)),
        })
    }

    /// Retrieve a document, reading the cache file when present unless a
    /// reload is forced.
    // TODO: no retry policy here; a transient network failure fails the
    // entity and the batch caller re-runs the URL on the next pass.
    pub async fn fetch(&self, url: &str, cache_path: &Path, force_reload: bool) -> Result<String> {
        if !force_reload && cache_path.exists() {
            debug!(url, cache = ?cache_path, "cache hit");
            return Ok(tokio::fs::read_to_string(cache_path).await?);
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| PipelineError::Internal {
                message: "fetch semaphore closed".to_string(),
            })?;

        info!(url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Fetch {
                url: url.to_string(),
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(PipelineError::Fetch {
                url: url.to_string(),
                details: format!("HTTP {}", response.status()),
            });
        }

        let body = response.text().await.map_err(|e| PipelineError::Fetch {
            url: url.to_string(),
            details: e.to_string(),
        })?;

        write_atomic(cache_path, &body)?;
        debug!(url, bytes = body.len(), "cached");

        Ok(body)
    }
}

/// Write the body to a temp file beside the target and rename into place.
/// The rename is atomic per path, so a concurrent reader sees either the
/// old file or the new one, never a partial write.
fn write_atomic(path: &Path, body: &str) -> Result<()> {
    let parent = path.parent().ok_or_else(|| PipelineError::Internal {
        message: format!("cache path {path:?} has no parent directory"),
    })?;
    std::fs::create_dir_all(parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(body.as_bytes())?;
    tmp.persist(path).map_err(|e| PipelineError::Internal {
        message: format!("failed to persist cache file {path:?}: {}", e.error),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> FetchConfig {
        FetchConfig {
            user_agent: "congress-pipeline-test".to_string(),
            timeout_seconds: 5,
            max_concurrent_fetches: 2,
            force_reload: false,
        }
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>one</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("page.html");
        let fetcher = FetchCache::new(&test_config()).unwrap();
        let url = format!("{}/page", server.uri());

        let first = fetcher.fetch(&url, &cache_path, false).await.unwrap();
        let second = fetcher.fetch(&url, &cache_path, false).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), first);
    }

    #[tokio::test]
    async fn force_reload_always_hits_the_network_and_overwrites() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>fresh</html>"))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("page.html");
        std::fs::write(&cache_path, "<html>stale</html>").unwrap();

        let fetcher = FetchCache::new(&test_config()).unwrap();
        let url = format!("{}/page", server.uri());

        let body = fetcher.fetch(&url, &cache_path, true).await.unwrap();
        assert_eq!(body, "<html>fresh</html>");
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), body);

        // a second forced fetch goes out again
        fetcher.fetch(&url, &cache_path, true).await.unwrap();
    }

    #[tokio::test]
    async fn http_error_statuses_become_fetch_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("missing.html");
        let fetcher = FetchCache::new(&test_config()).unwrap();
        let url = format!("{}/missing", server.uri());

        match fetcher.fetch(&url, &cache_path, false).await {
            Err(PipelineError::Fetch { details, .. }) => assert!(details.contains("404")),
            other => panic!("expected Fetch error, got {other:?}"),
        }
        // no cache file is left behind for a failed fetch
        assert!(!cache_path.exists());
    }
}
