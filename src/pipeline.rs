//! The collector pipeline.
//!
//! One batch per (topic, source) pair; all batches run concurrently and are
//! only throttled by the transport's per-host cap. Inside a batch:
//!
//! 1. the adapter fetches and normalizes stubs,
//! 2. every stub is scored at one frozen instant and the top of the ranking
//!    is marked for full-text fetch,
//! 3. stubs are persisted with at most `fetch_concurrency` in flight, each
//!    one independently, so a failed fetch or write costs only that record.

use crate::config::CollectorConfig;
use crate::extract::Extractor;
use crate::http::Transport;
use crate::models::{ArticleRecord, ArticleStub, SourceId};
use crate::outputs::json::{write_article_record, PersistError};
use crate::scoring::select_top_n;
use crate::scrapers::{adapter_for, Credentials, SourceAdapter};
use crate::utils::{truncate_content, truncate_for_log};
use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Where a persisted record's content came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentOrigin {
    /// Extracted from the fetched article page.
    FullText,
    /// The stub's summary, or empty when it had none.
    Summary,
}

/// Per-batch counters, for the run summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub source: SourceId,
    pub topic: String,
    /// Stubs that survived normalization, recency and de-duplication.
    pub stubs: usize,
    /// Upstream items dropped before ranking.
    pub skipped: usize,
    /// Records whose content came from a full-text fetch.
    pub full_text: usize,
    pub written: usize,
    /// Records lost to a write failure.
    pub failed: usize,
}

/// Runs every configured (topic, source) batch against one shared
/// [`Transport`] and writes the results under `output_base`.
pub struct Collector {
    config: CollectorConfig,
    transport: Arc<dyn Transport>,
    extractor: Extractor,
    credentials: Credentials,
    output_base: PathBuf,
}

impl Collector {
    /// Create a collector.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated topics, sources and limits
    /// * `transport` - Shared by listing requests and full-text fetches
    /// * `extractor` - Turns fetched article HTML into plain text
    /// * `credentials` - API keys; sources without one are skipped
    /// * `output_base` - Root of the `<source>/<topic>/` tree
    pub fn new(
        config: CollectorConfig,
        transport: Arc<dyn Transport>,
        extractor: Extractor,
        credentials: Credentials,
        output_base: PathBuf,
    ) -> Self {
        Self {
            config,
            transport,
            extractor,
            credentials,
            output_base,
        }
    }

    /// Run every (topic, source) batch and return one report per batch.
    #[instrument(level = "info", skip(self), fields(output_base = %self.output_base.display()))]
    pub async fn run(&self) -> Vec<BatchReport> {
        let adapters: Vec<Box<dyn SourceAdapter>> = self
            .config
            .sources
            .iter()
            .map(|id| adapter_for(*id, &self.credentials))
            .collect();

        let adapters = &adapters;
        let batches = self.config.topics.iter().flat_map(move |topic| {
            adapters
                .iter()
                .map(move |adapter| self.run_batch(&**adapter, topic))
        });
        let reports = join_all(batches).await;

        let written: usize = reports.iter().map(|r| r.written).sum();
        let failed: usize = reports.iter().map(|r| r.failed).sum();
        info!(batches = reports.len(), written, failed, "Collection finished");
        reports
    }

    /// Fetch, rank and persist one batch for `topic` from `adapter`.
    ///
    /// Never fails: a listing failure yields an empty report and per-record
    /// failures are counted in [`BatchReport::failed`].
    #[instrument(level = "info", skip(self, adapter), fields(source = %adapter.id()))]
    pub async fn run_batch(&self, adapter: &dyn SourceAdapter, topic: &str) -> BatchReport {
        let outcome = adapter
            .fetch(self.transport.as_ref(), topic, self.config.max_age_days)
            .await;
        let mut report = BatchReport {
            source: adapter.id(),
            topic: topic.to_string(),
            stubs: outcome.stubs.len(),
            skipped: outcome.skipped.len(),
            full_text: 0,
            written: 0,
            failed: 0,
        };
        if outcome.is_empty() {
            info!(source = %adapter.id(), topic, "No articles found");
            return report;
        }

        // frozen for the rest of the batch
        let selection = select_top_n(&outcome.stubs, topic, self.config.budget, Utc::now());
        for ranked in selection.ranked(&outcome.stubs) {
            debug!(
                index = ranked.index,
                score = ranked.score,
                full_text = selection.wants_full_text(ranked.index),
                title = %truncate_for_log(&ranked.stub.title, 80),
                "Ranked stub"
            );
        }

        let results: Vec<Result<ContentOrigin, PersistError>> =
            stream::iter(outcome.stubs.iter().enumerate())
                .map(|(index, stub)| {
                    self.persist_article(
                        stub,
                        index,
                        selection.scores[index],
                        selection.wants_full_text(index),
                    )
                })
                .buffer_unordered(self.config.fetch_concurrency)
                .collect()
                .await;

        for result in results {
            match result {
                Ok(origin) => {
                    report.written += 1;
                    if origin == ContentOrigin::FullText {
                        report.full_text += 1;
                    }
                }
                Err(_) => report.failed += 1,
            }
        }
        info!(
            source = %report.source,
            topic,
            written = report.written,
            full_text = report.full_text,
            failed = report.failed,
            "Batch persisted"
        );
        report
    }

    /// Build and write the record for `stub`. A failed or empty full-text
    /// fetch falls back to the summary.
    ///
    /// # Arguments
    ///
    /// * `index` - 0-based position in the batch, used for the file name
    /// * `score` - Heuristic score stored in the record
    /// * `full_text` - Whether the stub was selected for a page fetch
    ///
    /// # Errors
    ///
    /// Returns [`PersistError`] when the record cannot be serialized or
    /// written. The error is logged here as well.
    pub async fn persist_article(
        &self,
        stub: &ArticleStub,
        index: usize,
        score: f64,
        full_text: bool,
    ) -> Result<ContentOrigin, PersistError> {
        let fetched = if full_text && !stub.url.is_empty() {
            self.fetch_full_text(stub).await
        } else {
            None
        };
        let (content, origin) = match fetched {
            Some(text) => (text, ContentOrigin::FullText),
            None => (stub.summary.clone().unwrap_or_default(), ContentOrigin::Summary),
        };

        let record = ArticleRecord {
            source: stub.source.to_string(),
            topic: stub.topic.clone(),
            title: stub.title.clone(),
            url: stub.url.clone(),
            published_at: stub.published_at,
            content: truncate_content(&content, self.config.max_content_chars),
            score: Some(score),
        };
        match write_article_record(&self.output_base, &record, index).await {
            Ok(_) => Ok(origin),
            Err(e) => {
                error!(source = %stub.source, topic = %stub.topic, index, error = %e, "Failed to save article");
                Err(e)
            }
        }
    }

    async fn fetch_full_text(&self, stub: &ArticleStub) -> Option<String> {
        let html = match self.transport.get(&stub.url, &[]).await {
            Ok(html) => html,
            Err(e) => {
                error!(source = %stub.source, topic = %stub.topic, url = %stub.url, error = %e, "Article fetch failed; using summary");
                return None;
            }
        };
        let text = self.extractor.extract(&html);
        if text.is_empty() {
            warn!(url = %stub.url, "No text extracted; using summary");
            return None;
        }
        Some(text)
    }
}
