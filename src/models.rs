//! Data models shared by the collector and the sentiment stage.
//!
//! - [`ArticleStub`]: a discovered article before any full-text fetch
//! - [`ScoredStub`]: a stub paired with its priority score and batch index
//! - [`ArticleRecord`]: the unit persisted to `<source>/<topic>/NNN_date.json`
//! - [`BatchOutcome`]: what a source adapter hands back (kept stubs plus
//!   typed skip reasons)
//! - [`ScoreRecord`]: one LLM sentiment result, written under `llm_scores/`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Identifier of one of the nine source adapters.
///
/// The lowercase string form is used in config files and as the first
/// directory level of the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    YahooFinance,
    GoogleNews,
    MarketWatch,
    Reuters,
    Cnbc,
    GoogleNewsRss,
    NewsApi,
    BingNews,
    Finnhub,
}

impl SourceId {
    pub const ALL: [SourceId; 9] = [
        SourceId::YahooFinance,
        SourceId::GoogleNews,
        SourceId::MarketWatch,
        SourceId::Reuters,
        SourceId::Cnbc,
        SourceId::GoogleNewsRss,
        SourceId::NewsApi,
        SourceId::BingNews,
        SourceId::Finnhub,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::YahooFinance => "yahoofinance",
            SourceId::GoogleNews => "googlenews",
            SourceId::MarketWatch => "marketwatch",
            SourceId::Reuters => "reuters",
            SourceId::Cnbc => "cnbc",
            SourceId::GoogleNewsRss => "googlenewsrss",
            SourceId::NewsApi => "newsapi",
            SourceId::BingNews => "bingnews",
            SourceId::Finnhub => "finnhub",
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| format!("unknown source: {s}"))
    }
}

/// A discovered article, normalized from whatever shape the upstream used.
///
/// `published_at` falls back to the discovery instant when the upstream has
/// no usable timestamp, so freshness is only trustworthy for sources that
/// publish real dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleStub {
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub summary: Option<String>,
    pub source: SourceId,
    pub topic: String,
}

impl ArticleStub {
    /// Lower-cased `title + " " + summary`, the haystack for keyword and
    /// mention matching.
    pub fn haystack(&self) -> String {
        let mut text = self.title.to_lowercase();
        if let Some(summary) = self.summary.as_deref() {
            text.push(' ');
            text.push_str(&summary.to_lowercase());
        }
        text
    }
}

/// A stub with its priority score and its position in the input batch.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredStub {
    pub index: usize,
    pub score: f64,
    pub stub: ArticleStub,
}

/// Why an upstream item did not become a stub.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("item has no title")]
    MissingTitle,
    #[error("item has no url")]
    MissingUrl,
    #[error("published {age_days} days ago")]
    NotRecent { age_days: i64 },
    #[error("duplicate url within batch")]
    Duplicate,
    #[error("malformed item: {0}")]
    Malformed(String),
}

impl SkipReason {
    /// Short label for grouping skips in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::MissingTitle => "missing_title",
            SkipReason::MissingUrl => "missing_url",
            SkipReason::NotRecent { .. } => "not_recent",
            SkipReason::Duplicate => "duplicate",
            SkipReason::Malformed(_) => "malformed",
        }
    }
}

/// An upstream item that was dropped during normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    /// Position of the item in the upstream listing.
    pub index: usize,
    pub reason: SkipReason,
}

/// Result of one adapter run for one topic.
///
/// Transport failures produce an empty outcome; they are logged by the
/// adapter, never returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchOutcome {
    pub stubs: Vec<ArticleStub>,
    pub skipped: Vec<Skipped>,
}

impl BatchOutcome {
    pub fn is_empty(&self) -> bool {
        self.stubs.is_empty()
    }
}

/// The persisted form of one article.
///
/// `content` is either extracted page text or the stub summary, already cut
/// to the configured character budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub source: String,
    pub topic: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub content: String,
    pub score: Option<f64>,
}

/// One sentiment score produced by the `analyze` stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub article_file: String,
    pub topic: String,
    pub source: String,
    pub title: String,
    pub url: String,
    pub published_at: DateTime<Utc>,
    pub llm_score: f64,
    pub llm_explanation: String,
    pub model: String,
    pub scored_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stub(summary: Option<&str>) -> ArticleStub {
        ArticleStub {
            title: "ACME Beats Estimates".to_string(),
            url: "https://reuters.com/x".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap(),
            summary: summary.map(str::to_string),
            source: SourceId::Reuters,
            topic: "ACME".to_string(),
        }
    }

    #[test]
    fn test_source_id_round_trips_through_str() {
        for id in SourceId::ALL {
            assert_eq!(id.as_str().parse::<SourceId>().unwrap(), id);
        }
        assert_eq!(" YahooFinance ".parse::<SourceId>().unwrap(), SourceId::YahooFinance);
        assert!("bloomberg".parse::<SourceId>().is_err());
    }

    #[test]
    fn test_source_id_serializes_lowercase() {
        let json = serde_json::to_string(&SourceId::GoogleNewsRss).unwrap();
        assert_eq!(json, "\"googlenewsrss\"");
    }

    #[test]
    fn test_haystack_joins_title_and_summary() {
        assert_eq!(stub(None).haystack(), "acme beats estimates");
        assert_eq!(
            stub(Some("Shares SURGE")).haystack(),
            "acme beats estimates shares surge"
        );
    }

    #[test]
    fn test_article_record_json_shape() {
        let record = ArticleRecord {
            source: "reuters".to_string(),
            topic: "ACME".to_string(),
            title: "t".to_string(),
            url: "https://reuters.com/x".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap(),
            content: "body".to_string(),
            score: None,
        };
        let value: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["published_at"], "2025-05-06T14:30:00Z");
        assert!(value["score"].is_null());
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 7);
    }

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(
            SkipReason::NotRecent { age_days: 9 }.to_string(),
            "published 9 days ago"
        );
        assert_eq!(
            SkipReason::Malformed("bad date".into()).to_string(),
            "malformed item: bad date"
        );
    }
}
