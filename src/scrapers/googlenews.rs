//! Google News search-page scraper.
//!
//! Result cards are `<article>` elements whose links are `./articles/...`
//! paths relative to `news.google.com`. The page carries no machine-readable
//! dates, so every stub is stamped with the discovery instant.

use super::{listing_to_stub, scrape_listing, ItemResult, ListingProfile, SourceAdapter, SourceRequest};
use crate::models::SourceId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use url::Url;

const BASE_URL: &str = "https://news.google.com/";

static PROFILE: Lazy<ListingProfile> = Lazy::new(|| ListingProfile::new("article", "a[href]", None));
static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).expect("static base url"));

#[derive(Debug, Default)]
pub struct GoogleNews;

impl SourceAdapter for GoogleNews {
    fn id(&self) -> SourceId {
        SourceId::GoogleNews
    }

    fn request(&self, topic: &str, _now: DateTime<Utc>) -> Option<SourceRequest> {
        Some(SourceRequest::get(format!(
            "{BASE_URL}search?q={}+finance&hl=en&gl=US&ceid=US:en",
            urlencoding::encode(topic)
        )))
    }

    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult> {
        scrape_listing(body, &PROFILE)
            .iter()
            .map(|item| listing_to_stub(item, &BASE, self.id(), topic, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_request_url_encodes_topic() {
        let req = GoogleNews.request("S&P 500", Utc::now()).unwrap();
        assert_eq!(
            req.url,
            "https://news.google.com/search?q=S%26P%20500+finance&hl=en&gl=US&ceid=US:en"
        );
    }

    #[test]
    fn test_normalize_resolves_dot_relative_links() {
        let page = r#"<main>
          <article><a href="./articles/CBMiAbc?hl=en-US">ACME rallies on upgrade</a></article>
          <article><a href="https://example.com/direct">Direct link</a></article>
        </main>"#;
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let items = GoogleNews.normalize(page, "ACME", now);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.url, "https://news.google.com/articles/CBMiAbc?hl=en-US");
        assert_eq!(first.published_at, now);
        assert_eq!(items[1].as_ref().unwrap().url, "https://example.com/direct");
    }
}
