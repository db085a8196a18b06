//! CNBC site-search scraper. Result cards carry no usable timestamp.

use super::{listing_to_stub, scrape_listing, ItemResult, ListingProfile, SourceAdapter, SourceRequest};
use crate::models::SourceId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use url::Url;

const BASE_URL: &str = "https://www.cnbc.com";

static PROFILE: Lazy<ListingProfile> =
    Lazy::new(|| ListingProfile::new("div.SearchResultCard", "a[href]", None));
static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).expect("static base url"));

#[derive(Debug, Default)]
pub struct Cnbc;

impl SourceAdapter for Cnbc {
    fn id(&self) -> SourceId {
        SourceId::Cnbc
    }

    fn request(&self, topic: &str, _now: DateTime<Utc>) -> Option<SourceRequest> {
        let t = urlencoding::encode(topic);
        Some(SourceRequest::get(format!(
            "{BASE_URL}/search/?query={t}&qsearchterm={t}"
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
    use crate::models::SkipReason;
    use chrono::TimeZone;

    #[test]
    fn test_normalize_stamps_discovery_time() {
        let page = r#"<div id="searchcontainer">
          <div class="SearchResultCard"><a class="resultlink" href="/2025/05/06/acme-buyback.html">ACME unveils buyback</a></div>
          <div class="SearchResultCard"><a class="resultlink" href="http://[bad">Broken link</a></div>
        </div>"#;
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let items = Cnbc.normalize(page, "ACME", now);
        let first = items[0].as_ref().unwrap();
        assert_eq!(first.url, "https://www.cnbc.com/2025/05/06/acme-buyback.html");
        assert_eq!(first.published_at, now);
        assert!(matches!(items[1], Err(SkipReason::Malformed(_))));
    }
}
