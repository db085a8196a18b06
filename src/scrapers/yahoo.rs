//! Yahoo Finance quote-news scraper.
//!
//! Scrapes `finance.yahoo.com/quote/<T>/news`. Each story is an
//! `li.js-stream-content` card; links are site-relative and a `<time>`
//! element carries the publish instant when present.

use super::{listing_to_stub, scrape_listing, ItemResult, ListingProfile, SourceAdapter, SourceRequest};
use crate::models::SourceId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use url::Url;

const BASE_URL: &str = "https://finance.yahoo.com";

static PROFILE: Lazy<ListingProfile> =
    Lazy::new(|| ListingProfile::new("li.js-stream-content", "a[href]", Some("time[datetime]")));
static BASE: Lazy<Url> = Lazy::new(|| Url::parse(BASE_URL).expect("static base url"));

#[derive(Debug, Default)]
pub struct YahooFinance;

impl SourceAdapter for YahooFinance {
    fn id(&self) -> SourceId {
        SourceId::YahooFinance
    }

    fn request(&self, topic: &str, _now: DateTime<Utc>) -> Option<SourceRequest> {
        let t = urlencoding::encode(topic);
        Some(SourceRequest::get(format!("{BASE_URL}/quote/{t}/news?p={t}")))
    }

    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult> {
        scrape_listing(body, &PROFILE)
            .iter()
            .map(|item| listing_to_stub(item, &BASE, self.id(), topic, now))
            .collect()
    }
}
