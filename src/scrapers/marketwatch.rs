//! MarketWatch site-search scraper.

use super::{listing_to_stub, scrape_listing, ItemResult, ListingProfile, SourceAdapter, SourceRequest};
use crate::models::SourceId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use url::Url;

const BASE_URL: &str = "https://www.marketwatch.com";

static PROFILE: Lazy<ListingProfile> =
    Lazy::new(|| ListingProfile::new("div.article__content", "a[href]", Some("time[datetime]")));
static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).expect("static base url"));

#[derive(Debug, Default)]
pub struct MarketWatch;

impl SourceAdapter for MarketWatch {
    fn id(&self) -> SourceId {
        SourceId::MarketWatch
    }

    fn request(&self, topic: &str, _now: DateTime<Utc>) -> Option<SourceRequest> {
        Some(SourceRequest::get(format!(
            "{BASE_URL}/search?q={}",
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
