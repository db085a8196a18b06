//! NewsAPI.org `everything` search. Needs `NEWSAPI_KEY`.

use super::{build_stub, split_json_items, ItemResult, SourceAdapter, SourceRequest};
use crate::models::{SkipReason, SourceId};
use crate::utils::coerce_datetime;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const ENDPOINT: &str = "https://newsapi.org/v2/everything";

/// How far back the query window reaches.
const LOOKBACK_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<serde_json::Value>,
}

/// Input schema: one entry of `articles`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug)]
pub struct NewsApi {
    api_key: Option<String>,
}

impl NewsApi {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl SourceAdapter for NewsApi {
    fn id(&self) -> SourceId {
        SourceId::NewsApi
    }

    fn request(&self, topic: &str, now: DateTime<Utc>) -> Option<SourceRequest> {
        let key = self.api_key.as_deref()?;
        let from = (now - Duration::days(LOOKBACK_DAYS)).format("%Y-%m-%d");
        let url = format!(
            "{ENDPOINT}?q={}&from={from}&sortBy=publishedAt&language=en&pageSize=50",
            urlencoding::encode(topic)
        );
        Some(SourceRequest::get(url).with_header("X-Api-Key", key))
    }

    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult> {
        let envelope: Envelope = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(e) => return vec![Err(SkipReason::Malformed(format!("response: {e}")))],
        };
        if envelope.status.as_deref() == Some("error") {
            let message = envelope.message.unwrap_or_default();
            return vec![Err(SkipReason::Malformed(format!("api error: {message}")))];
        }
        split_json_items(envelope.articles, |article: NewsApiArticle| {
            build_stub(
                self.id(),
                topic,
                article.title.as_deref(),
                article.url.as_deref(),
                coerce_datetime(article.published_at.as_deref(), now),
                article.description.as_deref(),
            )
        })
    }
}
