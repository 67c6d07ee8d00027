//! # Scrape Pipeline Module
//!
//! ## Purpose
//! Orchestrates batch scraping: fetch each source document through the
//! cache, run the entity extractor, persist the record. Entity scrapes are
//! independent, so batches run on a bounded worker pool; one failing URL is
//! caught, logged, and reported in the batch summary without touching the
//! rest.
//!
//! ## Input/Output Specification
//! - **Input**: URL work lists (or a floor-proceedings document name)
//! - **Output**: persisted JSON documents plus an [`IngestSummary`] of
//!   successes and per-URL failures
//! - **Workflow**: Fetch → Extract → Persist, per entity
//!
//! Work-list helpers live here too: member-URL discovery from the roster
//! listing page and the clerk roll-call URL builder.

use std::ops::RangeInclusive;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scraper::Html;
use tracing::{info, warn};

use crate::config::{Config, EntityKind};
use crate::entities::{self, Bill, Representative, Session, Vote};
use crate::errors::Result;
use crate::fetch::FetchCache;
use crate::text;

/// Outcome of one batch scrape. Failures carry enough context for a caller
/// to re-run or report them; a summary never hides a half-built entity.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub succeeded: usize,
    pub failed: Vec<IngestFailure>,
}

/// One failed entity in a batch
#[derive(Debug)]
pub struct IngestFailure {
    pub url: String,
    pub category: &'static str,
    pub message: String,
}

impl IngestSummary {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, url: &str, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.succeeded += 1,
            Err(e) => {
                warn!(url, category = e.category(), error = %e, "entity scrape failed");
                self.failed.push(IngestFailure {
                    url: url.to_string(),
                    category: e.category(),
                    message: e.to_string(),
                });
            }
        }
    }
}

/// A member detail URL discovered on the roster listing page
#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub state: String,
    pub name: String,
    pub url: String,
}

/// Batch scrape orchestrator
pub struct ScrapePipeline {
    fetcher: Arc<FetchCache>,
    config: Config,
}

impl ScrapePipeline {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Arc::new(FetchCache::new(&config.fetch)?);
        Ok(Self { fetcher, config })
    }

    fn force_reload(&self) -> bool {
        self.config.fetch.force_reload
    }

    /// Scrape a batch of bill detail pages
    pub async fn scrape_bills(&self, urls: &[String]) -> IngestSummary {
        info!(count = urls.len(), "scraping bills");
        self.run_batch(urls, |url| async move {
            self.scrape_bill(&url).await.map(|_| ())
        })
        .await
    }

    /// Scrape one bill: fetch, extract, persist
    pub async fn scrape_bill(&self, url: &str) -> Result<Bill> {
        let cache_dir = self.config.data.cache_dir(EntityKind::Bill);
        let cache_path = cache_dir.join(text::cache_name(url));
        let body = self
            .fetcher
            .fetch(url, &cache_path, self.force_reload())
            .await?;
        let mut bill = Bill::from_html(url, &body, &cache_dir, &self.config.scrape.root_url)?;
        bill.save(&self.config.data.json_dir(EntityKind::Bill))?;
        Ok(bill)
    }

    /// Scrape a batch of member detail pages
    pub async fn scrape_reps(&self, urls: &[String]) -> IngestSummary {
        info!(count = urls.len(), "scraping representatives");
        self.run_batch(urls, |url| async move {
            self.scrape_rep(&url).await.map(|_| ())
        })
        .await
    }

    /// Scrape one representative: fetch, extract, persist
    pub async fn scrape_rep(&self, url: &str) -> Result<Representative> {
        let cache_dir = self.config.data.cache_dir(EntityKind::Representative);
        let cache_path = cache_dir.join(text::cache_name(url));
        let body = self
            .fetcher
            .fetch(url, &cache_path, self.force_reload())
            .await?;
        let mut rep = Representative::from_html(url, &body, &cache_dir)?;
        rep.save(&self.config.data.json_dir(EntityKind::Representative))?;
        Ok(rep)
    }

    /// Scrape a batch of roll-call feeds
    pub async fn scrape_votes(&self, urls: &[String]) -> IngestSummary {
        info!(count = urls.len(), "scraping votes");
        self.run_batch(urls, |url| async move {
            self.scrape_vote(&url).await.map(|_| ())
        })
        .await
    }

    /// Scrape one roll-call vote: fetch, extract, persist
    pub async fn scrape_vote(&self, url: &str) -> Result<Vote> {
        let cache_dir = self.config.data.cache_dir(EntityKind::Vote);
        let cache_path = cache_dir.join(text::cache_name(url));
        let body = self
            .fetcher
            .fetch(url, &cache_path, self.force_reload())
            .await?;
        let mut vote = Vote::from_xml(url, &body, &cache_dir)?;
        vote.save(&self.config.data.json_dir(EntityKind::Vote))?;
        Ok(vote)
    }

    /// Scrape one floor-proceedings document. Referenced votes and bills
    /// stay lazy references, so this is a single fetch.
    pub async fn scrape_session(&self, source: &str) -> Result<Session> {
        let url = format!(
            "{}/floorsummary/{}",
            self.config.scrape.clerk_url.trim_end_matches('/'),
            source
        );
        let cache_dir = self.config.data.cache_dir(EntityKind::Session);
        let cache_path = cache_dir.join(source);
        let body = self
            .fetcher
            .fetch(&url, &cache_path, self.force_reload())
            .await?;
        let mut session = Session::from_xml(source, &url, &body, &cache_dir)?;
        session.save(&self.config.data.json_dir(EntityKind::Session))?;
        Ok(session)
    }

    /// Discover member detail URLs from the roster listing page: one table
    /// per state, one member per row. Rows without a link are skipped.
    pub async fn discover_rep_urls(&self) -> Result<Vec<RosterEntry>> {
        let roster_url = self.config.scrape.roster_url.clone();
        let cache_dir = self.config.data.cache_dir(EntityKind::Representative);
        let cache_path = cache_dir.join(text::cache_name(&roster_url));
        let body = self
            .fetcher
            .fetch(&roster_url, &cache_path, self.force_reload())
            .await?;

        let doc = Html::parse_document(&body);
        let mut entries = Vec::new();
        for table in doc.select(&entities::landmark("table.table")) {
            let state = match table.select(&entities::landmark("caption")).next() {
                Some(caption) => entities::element_text(caption),
                None => continue,
            };
            for row in table.select(&entities::landmark("tbody tr")) {
                let Some(anchor) = row.select(&entities::landmark("a")).next() else {
                    continue;
                };
                let Some(href) = anchor.value().attr("href") else {
                    continue;
                };
                entries.push(RosterEntry {
                    state: state.clone(),
                    name: entities::element_text(anchor),
                    url: href.to_string(),
                });
            }
        }
        info!(count = entries.len(), "discovered roster entries");
        Ok(entries)
    }

    /// Build the clerk roll-call feed URLs for a year's vote numbers
    pub fn vote_urls(&self, year: u16, numbers: RangeInclusive<u32>) -> Vec<String> {
        let base = self.config.scrape.clerk_url.trim_end_matches('/');
        numbers
            .map(|n| format!("{base}/evs/{year}/roll{n:03}.xml"))
            .collect()
    }

    /// Run a URL batch on the bounded worker pool, collecting per-entity
    /// outcomes
    async fn run_batch<'a, F, Fut>(&'a self, urls: &[String], job: F) -> IngestSummary
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = Result<()>> + 'a,
    {
        let outcomes: Vec<(String, Result<()>)> = stream::iter(urls.iter().cloned())
            .map(|url| {
                let fut = job(url.clone());
                async move { (url, fut.await) }
            })
            .buffer_unordered(self.config.fetch.max_concurrent_fetches)
            .collect()
            .await;

        let mut summary = IngestSummary::default();
        for (url, outcome) in outcomes {
            summary.record(&url, outcome);
        }
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "batch finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bill_page() -> &'static str {
        r#"<html><body>
<h1 class="legDetail">H.R.9 - Climate Action Now Act<span> 116th Congress (2019-2020)</span></h1>
<div class="overview"><table><tbody>
<tr><th>Sponsor:</th><td><a href="/member/kathy-castor/C001066">Rep. Castor, Kathy [D-FL-14]</a> (Introduced 03/27/2019)</td></tr>
</tbody></table></div>
</body></html>"#
    }

    async fn test_pipeline(server: &MockServer) -> (tempfile::TempDir, ScrapePipeline) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data.root_dir = dir.path().to_path_buf();
        config.scrape.root_url = server.uri();
        config.scrape.clerk_url = server.uri();
        config.scrape.roster_url = format!("{}/representatives", server.uri());
        config.fetch.max_concurrent_fetches = 4;
        (dir, ScrapePipeline::new(config).unwrap())
    }

    #[tokio::test]
    async fn batch_scrape_persists_documents_and_reports_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bill/116/hr9"))
            .respond_with(ResponseTemplate::new(200).set_body_string(bill_page()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bill/116/hr10"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (dir, pipeline) = test_pipeline(&server).await;
        let urls = vec![
            format!("{}/bill/116/hr9", server.uri()),
            format!("{}/bill/116/hr10", server.uri()),
        ];
        let summary = pipeline.scrape_bills(&urls).await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].category, "fetch");
        assert!(!summary.is_clean());

        // the persisted document and the markup cache both exist
        let json_path = dir.path().join("bills/json/116_H.R.9.json");
        assert!(json_path.exists());
        let loaded = Bill::load(&json_path).unwrap();
        assert_eq!(loaded.congress, 116);
    }

    #[tokio::test]
    async fn extraction_failures_are_reported_not_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/bill/broken"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string("<html><body>no heading</body></html>"),
            )
            .mount(&server)
            .await;

        let (_dir, pipeline) = test_pipeline(&server).await;
        let urls = vec![format!("{}/bill/broken", server.uri())];
        let summary = pipeline.scrape_bills(&urls).await;

        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed[0].category, "extraction");
    }

    #[tokio::test]
    async fn roster_discovery_lists_member_links_per_state() {
        let server = MockServer::start().await;
        let roster = r#"<html><body>
<table class="table">
  <caption>Alabama</caption>
  <tbody>
    <tr><td><a href="https://www.congress.gov/member/jerry-carl/C001054">Carl, Jerry</a></td><td>1st</td></tr>
    <tr><td>Vacant</td><td>2nd</td></tr>
  </tbody>
</table>
<table class="table">
  <caption>Alaska</caption>
  <tbody>
    <tr><td><a href="https://www.congress.gov/member/mary-peltola/P000619">Peltola, Mary</a></td><td>At Large</td></tr>
  </tbody>
</table>
</body></html>"#;
        Mock::given(method("GET"))
            .and(path("/representatives"))
            .respond_with(ResponseTemplate::new(200).set_body_string(roster))
            .mount(&server)
            .await;

        let (_dir, pipeline) = test_pipeline(&server).await;
        let entries = pipeline.discover_rep_urls().await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].state, "Alabama");
        assert_eq!(entries[0].name, "Carl, Jerry");
        assert_eq!(entries[1].state, "Alaska");
    }

    #[tokio::test]
    async fn vote_url_builder_pads_roll_numbers() {
        let server = MockServer::start().await;
        let (_dir, pipeline) = test_pipeline(&server).await;

        let urls = pipeline.vote_urls(2019, 7..=9);
        assert_eq!(urls.len(), 3);
        assert!(urls[0].ends_with("/evs/2019/roll007.xml"));
        assert!(urls[2].ends_with("/evs/2019/roll009.xml"));
    }
}
