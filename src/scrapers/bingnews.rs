//! Bing News Search v7. Needs `BING_NEWS_KEY`.

use super::{build_stub, split_json_items, ItemResult, SourceAdapter, SourceRequest};
use crate::models::{SkipReason, SourceId};
use crate::utils::coerce_datetime;
use chrono::{DateTime, Utc};
use serde::Deserialize;

const ENDPOINT: &str = "https://api.bing.microsoft.com/v7.0/news/search";

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    value: Vec<serde_json::Value>,
}

/// Input schema: one entry of `value`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BingArticle {
    name: Option<String>,
    url: Option<String>,
    description: Option<String>,
    date_published: Option<String>,
}

#[derive(Debug)]
pub struct BingNews {
    api_key: Option<String>,
}

impl BingNews {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

impl SourceAdapter for BingNews {
    fn id(&self) -> SourceId {
        SourceId::BingNews
    }

    fn request(&self, topic: &str, _now: DateTime<Utc>) -> Option<SourceRequest> {
        let key = self.api_key.as_deref()?;
        let url = format!(
            "{ENDPOINT}?q={}&count=50&freshness=Week&mkt=en-US&sortBy=Date",
            urlencoding::encode(topic)
        );
        Some(SourceRequest::get(url).with_header("Ocp-Apim-Subscription-Key", key))
    }

    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult> {
        let envelope: Envelope = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(e) => return vec![Err(SkipReason::Malformed(format!("response: {e}")))],
        };
        split_json_items(envelope.value, |article: BingArticle| {
            build_stub(
                self.id(),
                topic,
                article.name.as_deref(),
                article.url.as_deref(),
                coerce_datetime(article.date_published.as_deref(), now),
                article.description.as_deref(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_uses_subscription_header() {
        let req = BingNews::new(Some("secret".into())).request("ACME", Utc::now()).unwrap();
        assert!(req.url.starts_with("https://api.bing.microsoft.com/v7.0/news/search?q=ACME&"));
        assert_eq!(req.headers, vec![("Ocp-Apim-Subscription-Key", "secret".to_string())]);
        assert!(BingNews::new(None).request("ACME", Utc::now()).is_none());
    }

    #[test]
    fn test_normalize_value_list() {
        let body = r#"{"_type":"News","value":[
          {"name":"ACME downgraded at Big Bank","url":"https://www.cnbc.com/acme","description":"Analysts cut","datePublished":"2025-05-06T07:45:00.0000000Z"},
          {"name":"No url"}
        ]}"#;
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let items = BingNews::new(Some("k".into())).normalize(body, "ACME", now);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.title, "ACME downgraded at Big Bank");
        assert_eq!(first.published_at, Utc.with_ymd_and_hms(2025, 5, 6, 7, 45, 0).unwrap());
        assert_eq!(items[1], Err(SkipReason::MissingUrl));
    }
}
