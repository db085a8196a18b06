//! Finnhub company-news endpoint. Needs `FINNHUB_API_KEY`.
//!
//! Finnhub is symbol-driven, so the topic is sent as the ticker and
//! timestamps arrive as unix seconds.

use super::{build_stub, split_json_items, ItemResult, SourceAdapter, SourceRequest};
use crate::models::{SkipReason, SourceId};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const ENDPOINT: &str = "https://finnhub.io/api/v1/company-news";

const LOOKBACK_DAYS: i64 = 7;

/// Input schema: one element of the response array.
#[derive(Debug, Deserialize)]
struct CompanyNews {
    headline: Option<String>,
    url: Option<String>,
    summary: Option<String>,
    datetime: Option<i64>,
}

#[derive(Debug)]
pub struct Finnhub {
    api_key: Option<String>,
}

impl Finnhub {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl SourceAdapter for Finnhub {
    fn id(&self) -> SourceId {
        SourceId::Finnhub
    }

    fn request(&self, topic: &str, now: DateTime<Utc>) -> Option<SourceRequest> {
        let key = self.api_key.as_deref()?;
        let from = (now - Duration::days(LOOKBACK_DAYS)).format("%Y-%m-%d");
        let to = now.format("%Y-%m-%d");
        Some(SourceRequest::get(format!(
            "{ENDPOINT}?symbol={}&from={from}&to={to}&token={}",
            urlencoding::encode(&topic.to_uppercase()),
            urlencoding::encode(key)
        )))
    }

    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult> {
        let items: Vec<serde_json::Value> = match serde_json::from_str(body) {
            Ok(items) => items,
            Err(e) => return vec![Err(SkipReason::Malformed(format!("response: {e}")))],
        };
        split_json_items(items, |news: CompanyNews| {
            let published_at = news
                .datetime
                .filter(|ts| *ts > 0)
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
                .unwrap_or(now);
            build_stub(
                self.id(),
                topic,
                news.headline.as_deref(),
                news.url.as_deref(),
                published_at,
                news.summary.as_deref(),
            )
        })
    }
}
