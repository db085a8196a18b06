//! Source adapters: one per upstream, all producing [`ArticleStub`]s.
//!
//! Every adapter follows the same two-step shape:
//!
//! 1. **Request**: build the search URL (and headers) for a topic. Adapters
//!    that need an API credential return `None` when it is absent and the
//!    batch is skipped with an info line.
//! 2. **Normalize**: turn the response body into one `Result` per upstream
//!    item, using an explicit input schema for that upstream.
//!
//! The shared [`SourceAdapter::fetch`] then applies the recency filter and
//! per-batch URL de-duplication, and logs what was dropped.
//!
//! # Supported Sources
//!
//! | Source | Module | Method | Dates |
//! |--------|--------|--------|-------|
//! | Yahoo Finance | [`yahoo`] | HTML scraping | `<time datetime>` |
//! | Google News | [`googlenews`] | HTML scraping | none (discovery time) |
//! | MarketWatch | [`marketwatch`] | HTML scraping | `<time datetime>` |
//! | Reuters | [`reuters`] | HTML scraping | `<time datetime>` |
//! | CNBC | [`cnbc`] | HTML scraping | none (discovery time) |
//! | Google News RSS | [`googlenews_rss`] | RSS feed | `pubDate` |
//! | NewsAPI | [`newsapi`] | JSON API, `NEWSAPI_KEY` | `publishedAt` |
//! | Bing News | [`bingnews`] | JSON API, `BING_NEWS_KEY` | `datePublished` |
//! | Finnhub | [`finnhub`] | JSON API, `FINNHUB_API_KEY` | unix seconds |
//!
//! A transport failure for the listing page yields an empty batch; it is
//! never an error for the caller.

use crate::extract::fragment_text;
use crate::http::Transport;
use crate::models::{ArticleStub, BatchOutcome, SkipReason, Skipped, SourceId};
use crate::utils::{age_days, coerce_datetime, is_recent, truncate_for_log};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itertools::Itertools;
use scraper::{Html, Selector};
use std::collections::HashSet;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub mod bingnews;
pub mod cnbc;
pub mod finnhub;
pub mod googlenews;
pub mod googlenews_rss;
pub mod marketwatch;
pub mod newsapi;
pub mod reuters;
pub mod yahoo;

/// API credentials for the JSON adapters. Absent keys disable the adapter.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub newsapi: Option<String>,
    pub bing_news: Option<String>,
    pub finnhub: Option<String>,
}

/// A ready-to-send listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRequest {
    pub url: String,
    /// Extra headers, typically an API key.
    pub headers: Vec<(&'static str, String)>,
}

impl SourceRequest {
    /// Plain GET of `url` with no extra headers.
    pub fn get(url: String) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }
}

/// One upstream item as normalized by an adapter.
pub type ItemResult = Result<ArticleStub, SkipReason>;

/// One news source: how to ask it for a topic's listing and how to turn
/// the reply into stubs.
///
/// Implementors supply [`request`](SourceAdapter::request) and
/// [`normalize`](SourceAdapter::normalize); the provided
/// [`fetch`](SourceAdapter::fetch) handles transport errors, recency and
/// de-duplication the same way for every source.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Identifier written into every stub and used as the output directory.
    fn id(&self) -> SourceId;

    /// Listing request for `topic`, or `None` when a required credential is
    /// not configured.
    fn request(&self, topic: &str, now: DateTime<Utc>) -> Option<SourceRequest>;

    /// One entry per upstream item, in upstream order. `now` stands in for
    /// missing or unparseable timestamps.
    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult>;

    /// Fetch, normalize, and filter one batch for `topic`.
    #[instrument(level = "info", skip(self, transport))]
    async fn fetch(&self, transport: &dyn Transport, topic: &str, max_age_days: i64) -> BatchOutcome {
        let now = Utc::now();
        let Some(request) = self.request(topic, now) else {
            info!(source = %self.id(), topic, "No API credential configured; skipping source");
            return BatchOutcome::default();
        };
        let headers: Vec<(&str, &str)> = request
            .headers
            .iter()
            .map(|(name, value)| (*name, value.as_str()))
            .collect();

        let body = match transport.get(&request.url, &headers).await {
            Ok(body) => body,
            Err(e) => {
                error!(source = %self.id(), topic, url = %request.url, error = %e, "Listing request failed");
                return BatchOutcome::default();
            }
        };
        debug!(bytes = body.len(), preview = %truncate_for_log(&body, 200), "Listing fetched");

        let outcome = finish_batch(self.normalize(&body, topic, now), max_age_days, now);
        log_outcome(self.id(), topic, &outcome);
        outcome
    }
}

/// Apply the recency filter and drop repeated URLs, keeping upstream order.
pub fn finish_batch(items: Vec<ItemResult>, max_age_days: i64, now: DateTime<Utc>) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    let mut seen = HashSet::new();
    for (index, item) in items.into_iter().enumerate() {
        let reason = match item {
            Err(reason) => reason,
            Ok(stub) => {
                if !is_recent(stub.published_at, now, max_age_days) {
                    SkipReason::NotRecent {
                        age_days: age_days(stub.published_at, now),
                    }
                } else if !seen.insert(stub.url.clone()) {
                    SkipReason::Duplicate
                } else {
                    outcome.stubs.push(stub);
                    continue;
                }
            }
        };
        outcome.skipped.push(Skipped { index, reason });
    }
    outcome
}

fn log_outcome(source: SourceId, topic: &str, outcome: &BatchOutcome) {
    for skipped in &outcome.skipped {
        match skipped.reason {
            SkipReason::MissingTitle | SkipReason::MissingUrl | SkipReason::Malformed(_) => {
                warn!(%source, topic, index = skipped.index, reason = %skipped.reason, "Skipped item")
            }
            SkipReason::NotRecent { .. } | SkipReason::Duplicate => {
                debug!(%source, topic, index = skipped.index, reason = %skipped.reason, "Filtered item")
            }
        }
    }
    let reasons = outcome.skipped.iter().counts_by(|s| s.reason.kind());
    info!(
        %source,
        topic,
        kept = outcome.stubs.len(),
        skipped = outcome.skipped.len(),
        ?reasons,
        "Normalized batch"
    );
}

/// Build a stub from already-extracted fields, enforcing the non-empty
/// title and URL invariant.
pub fn build_stub(
    source: SourceId,
    topic: &str,
    title: Option<&str>,
    url: Option<&str>,
    published_at: DateTime<Utc>,
    summary: Option<&str>,
) -> ItemResult {
    let title = title.map(fragment_text).unwrap_or_default();
    if title.is_empty() {
        return Err(SkipReason::MissingTitle);
    }
    let url = url.map(str::trim).unwrap_or_default();
    if url.is_empty() {
        return Err(SkipReason::MissingUrl);
    }
    let summary = summary.map(fragment_text).filter(|s| !s.is_empty());
    Ok(ArticleStub {
        title,
        url: url.to_string(),
        published_at,
        summary,
        source,
        topic: topic.to_string(),
    })
}

/// Input schema of the HTML scrapers: one search-result card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingItem {
    pub title: Option<String>,
    pub href: Option<String>,
    pub datetime: Option<String>,
}

/// CSS selectors describing a search-results page.
#[derive(Debug)]
pub struct ListingProfile {
    /// One match per result card.
    pub item: Selector,
    /// The headline link inside a card.
    pub link: Selector,
    /// Timestamp element carrying a `datetime` attribute, if the site has one.
    pub time: Option<Selector>,
}

impl ListingProfile {
    /// # Panics
    ///
    /// On an invalid selector; profiles are built from static strings.
    pub fn new(item: &str, link: &str, time: Option<&str>) -> Self {
        Self {
            item: Selector::parse(item).expect("static item selector"),
            link: Selector::parse(link).expect("static link selector"),
            time: time.map(|t| Selector::parse(t).expect("static time selector")),
        }
    }
}

/// Pull every result card out of a search page.
pub fn scrape_listing(html: &str, profile: &ListingProfile) -> Vec<ListingItem> {
    let document = Html::parse_document(html);
    document
        .select(&profile.item)
        .map(|card| {
            let link = card.select(&profile.link).next();
            let datetime = profile
                .time
                .as_ref()
                .and_then(|sel| card.select(sel).next())
                .and_then(|t| t.value().attr("datetime"))
                .map(str::to_string);
            ListingItem {
                title: link.map(|a| a.text().collect::<Vec<_>>().join(" ")),
                href: link.and_then(|a| a.value().attr("href")).map(str::to_string),
                datetime,
            }
        })
        .collect()
}

/// Normalize a scraped card, resolving relative links against `base`.
pub fn listing_to_stub(
    item: &ListingItem,
    base: &Url,
    source: SourceId,
    topic: &str,
    now: DateTime<Utc>,
) -> ItemResult {
    let url = match item.href.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
        None => None,
        Some(href) => Some(
            base.join(href)
                .map_err(|e| SkipReason::Malformed(format!("bad link {href}: {e}")))?
                .to_string(),
        ),
    };
    let published_at = coerce_datetime(item.datetime.as_deref(), now);
    build_stub(source, topic, item.title.as_deref(), url.as_deref(), published_at, None)
}

/// Parse a JSON API body into per-item values, so one malformed entry
/// costs only itself.
pub fn split_json_items<T>(items: Vec<serde_json::Value>, mut normalize: impl FnMut(T) -> ItemResult) -> Vec<ItemResult>
where
    T: serde::de::DeserializeOwned,
{
    items
        .into_iter()
        .map(|value| match serde_json::from_value::<T>(value) {
            Ok(item) => normalize(item),
            Err(e) => Err(SkipReason::Malformed(e.to_string())),
        })
        .collect()
}

/// The adapter for `id`.
pub fn adapter_for(id: SourceId, credentials: &Credentials) -> Box<dyn SourceAdapter> {
    match id {
        SourceId::YahooFinance => Box::new(yahoo::YahooFinance),
        SourceId::GoogleNews => Box::new(googlenews::GoogleNews),
        SourceId::MarketWatch => Box::new(marketwatch::MarketWatch),
        SourceId::Reuters => Box::new(reuters::Reuters),
        SourceId::Cnbc => Box::new(cnbc::Cnbc),
        SourceId::GoogleNewsRss => Box::new(googlenews_rss::GoogleNewsRss),
        SourceId::NewsApi => Box::new(newsapi::NewsApi::new(credentials.newsapi.clone())),
        SourceId::BingNews => Box::new(bingnews::BingNews::new(credentials.bing_news.clone())),
        SourceId::Finnhub => Box::new(finnhub::Finnhub::new(credentials.finnhub.clone())),
    }
}
