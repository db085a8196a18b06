//! Google News RSS search feed.
//!
//! Items carry an RFC 2822 `pubDate` and an HTML `description`, which is
//! flattened to plain text and kept as the stub summary.

use super::{build_stub, ItemResult, SourceAdapter, SourceRequest};
use crate::models::{SkipReason, SourceId};
use crate::utils::coerce_datetime;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

const FEED_URL: &str = "https://news.google.com/rss/search";

/// Input schema: one `<item>` of the feed.
#[derive(Debug, Deserialize)]
struct FeedItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default)]
pub struct GoogleNewsRss;

impl GoogleNewsRss {
    fn to_stub(&self, item: FeedItem, topic: &str, now: DateTime<Utc>) -> ItemResult {
        build_stub(
            self.id(),
            topic,
            item.title.as_deref(),
            item.link.as_deref(),
            coerce_datetime(item.pub_date.as_deref(), now),
            item.description.as_deref(),
        )
    }
}

impl SourceAdapter for GoogleNewsRss {
    fn id(&self) -> SourceId {
        SourceId::GoogleNewsRss
    }

    fn request(&self, topic: &str, _now: DateTime<Utc>) -> Option<SourceRequest> {
        Some(SourceRequest::get(format!(
            "{FEED_URL}?q={}+stock&hl=en-US&gl=US&ceid=US:en",
            urlencoding::encode(topic)
        )))
    }

    fn normalize(&self, body: &str, topic: &str, now: DateTime<Utc>) -> Vec<ItemResult> {
        split_feed_items(body)
            .into_iter()
            .map(|raw| {
                let raw = raw?;
                match quick_xml::de::from_str::<FeedItem>(raw) {
                    Ok(item) => self.to_stub(item, topic, now),
                    Err(e) => Err(SkipReason::Malformed(format!("feed item: {e}"))),
                }
            })
            .collect()
    }
}

/// Raw `<item>...</item>` slices of an RSS document, in feed order.
///
/// Each item is deserialized on its own so one bad entry costs only
/// itself. A document whose root is not `<rss>` yields a single
/// `Malformed` entry; a reader error keeps the items found so far and
/// appends one `Malformed` entry for the rest.
fn split_feed_items(body: &str) -> Vec<Result<&str, SkipReason>> {
    let mut reader = Reader::from_str(body);
    let mut items = Vec::new();
    let mut seen_root = false;

    loop {
        let start = reader.buffer_position() as usize;
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !seen_root {
                    if e.local_name().as_ref() != b"rss" {
                        return vec![Err(SkipReason::Malformed("feed: root element is not <rss>".into()))];
                    }
                    seen_root = true;
                } else if e.local_name().as_ref() == b"item" {
                    let end = e.to_end().into_owned();
                    if let Err(e) = reader.read_to_end(end.name()) {
                        items.push(Err(SkipReason::Malformed(format!("feed: {e}"))));
                        break;
                    }
                    let stop = reader.buffer_position() as usize;
                    items.push(Ok(&body[start..stop]));
                }
            }
            Ok(Event::Empty(e)) => {
                if !seen_root {
                    return vec![Err(SkipReason::Malformed("feed: root element is not <rss>".into()))];
                }
                if e.local_name().as_ref() == b"item" {
                    let stop = reader.buffer_position() as usize;
                    items.push(Ok(&body[start..stop]));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                items.push(Err(SkipReason::Malformed(format!("feed: {e}"))));
                break;
            }
            Ok(_) => {}
        }
    }

    if !seen_root {
        return vec![Err(SkipReason::Malformed("feed: no root element".into()))];
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FEED: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>"ACME stock" - Google News</title>
    <link>https://news.google.com/search?q=ACME</link>
    <item>
      <title>ACME shares surge after record quarter - Reuters</title>
      <link>https://news.google.com/rss/articles/CBMiA1?oc=5</link>
      <guid isPermaLink="false">CBMiA1</guid>
      <pubDate>Tue, 06 May 2025 10:30:00 GMT</pubDate>
      <description>&lt;a href="https://news.google.com/rss/articles/CBMiA1"&gt;ACME shares surge&lt;/a&gt;&amp;nbsp;&amp;nbsp;&lt;font color="#6f6f6f"&gt;Reuters&lt;/font&gt;</description>
      <source url="https://www.reuters.com">Reuters</source>
    </item>
    <item>
      <title></title>
      <link>https://news.google.com/rss/articles/CBMiA2</link>
    </item>
    <item>
      <title>No date on this one</title>
      <link>https://news.google.com/rss/articles/CBMiA3</link>
    </item>
  </channel>
</rss>"##;

    #[test]
    fn test_normalize_feed() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap();
        let items = GoogleNewsRss.normalize(FEED, "ACME", now);
        assert_eq!(items.len(), 3);

        let first = items[0].as_ref().unwrap();
        assert_eq!(first.title, "ACME shares surge after record quarter - Reuters");
        assert_eq!(first.published_at, Utc.with_ymd_and_hms(2025, 5, 6, 10, 30, 0).unwrap());
        assert_eq!(first.summary.as_deref(), Some("ACME shares surge Reuters"));

        assert_eq!(items[1], Err(SkipReason::MissingTitle));
        assert_eq!(items[2].as_ref().unwrap().published_at, now);
    }

    #[test]
    fn test_unparseable_feed_is_one_malformed_entry() {
        let items = GoogleNewsRss.normalize("<html><body>blocked</body></html>", "ACME", Utc::now());
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(SkipReason::Malformed(_))));
    }

    #[test]
    fn test_bad_item_does_not_drop_neighbours() {
        let feed = r##"<rss version="2.0"><channel>
    <item><title>ACME beats estimates</title><link>https://example.com/a</link></item>
    <item><title>Nested</title><link>https://example.com/b</link><description>Shares <b>up</b> today</description></item>
    <item><title>One</title><title>Two</title><link>https://example.com/c</link></item>
    <item><title>ACME raises guidance</title><link>https://example.com/d</link></item>
</channel></rss>"##;
        let items = GoogleNewsRss.normalize(feed, "ACME", Utc::now());
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_ref().unwrap().title, "ACME beats estimates");
        assert!(matches!(items[1], Err(SkipReason::Malformed(_))));
        assert!(matches!(items[2], Err(SkipReason::Malformed(_))));
        assert_eq!(items[3].as_ref().unwrap().title, "ACME raises guidance");
    }

    #[test]
    fn test_truncated_feed_keeps_earlier_items() {
        let feed = "<rss><channel><item><title>ACME up</title><link>https://example.com/a</link></item><item><title>cut";
        let items = GoogleNewsRss.normalize(feed, "ACME", Utc::now());
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(matches!(items[1], Err(SkipReason::Malformed(_))));
    }

    #[test]
    fn test_request_url() {
        assert_eq!(
            GoogleNewsRss.request("ACME", Utc::now()).unwrap().url,
            "https://news.google.com/rss/search?q=ACME+stock&hl=en-US&gl=US&ceid=US:en"
        );
    }
}
