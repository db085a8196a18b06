//! Heuristic priority scoring and Top-N selection for full-text fetches.
//!
//! A stub's priority is the sum of four independent terms:
//!
//! | Term | Range | Signal |
//! |------|-------|--------|
//! | recency | 0.4 - 2.0 | hours since publication, stepped |
//! | keywords | unbounded, signed | eventful phrases in title + summary |
//! | mention | 0.0 or 0.4 | topic appears in title + summary |
//! | domain | 0.0 - 0.5 | trust bonus for known finance hosts |
//!
//! Every term degrades to its neutral value on bad input, so [`score`]
//! never fails. The selector freezes one evaluation instant per batch and
//! ranks with a stable sort, which keeps selection deterministic and
//! monotonic in the budget.

use crate::models::{ArticleStub, ScoredStub};
use crate::utils::normalized_host;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Flat bonus when the topic is mentioned in the title or summary.
pub const MENTION_BONUS: f64 = 0.4;

/// Phrase weights scanned as substrings of the lower-cased title + summary.
///
/// Overlapping phrasings ("guidance cut" / "cut guidance") are separate
/// entries and both count when both occur. Short stems that hide inside
/// common words ("sued" in "issued", "halt" in "asphalt") are spelled out
/// as longer phrases.
pub const KEYWORD_WEIGHTS: &[(&str, f64)] = &[
    // eventful, positive
    ("beat", 0.6),
    ("surge", 0.5),
    ("soar", 0.5),
    ("jump", 0.3),
    ("rally", 0.4),
    ("record", 0.4),
    ("all-time high", 0.5),
    ("upgrade", 0.6),
    ("outperform", 0.5),
    ("raises guidance", 0.7),
    ("raised guidance", 0.7),
    ("buyback", 0.5),
    ("repurchase", 0.4),
    ("dividend", 0.3),
    ("acquisition", 0.4),
    ("acquire", 0.3),
    ("merger", 0.4),
    ("partnership", 0.3),
    ("approval", 0.5),
    ("breakthrough", 0.5),
    ("strong demand", 0.4),
    // eventful, negative
    ("misses", -0.6),
    ("missed", -0.6),
    ("downgrade", -0.7),
    ("underperform", -0.5),
    ("guidance cut", -0.8),
    ("cut guidance", -0.8),
    ("lowers guidance", -0.7),
    ("profit warning", -0.8),
    ("lawsuit", -0.6),
    ("sued by", -0.5),
    ("recall", -0.6),
    ("investigation", -0.5),
    ("probe", -0.5),
    ("fraud", -0.9),
    ("bankruptcy", -1.0),
    ("defaults on", -0.8),
    ("debt default", -0.8),
    ("plunge", -0.6),
    ("tumble", -0.5),
    ("slump", -0.5),
    ("layoff", -0.4),
    ("halts trading", -0.5),
    ("trading halt", -0.5),
    ("delist", -0.9),
];

/// Trust bonus per host (lower-cased, `www.` stripped). Unknown hosts get 0.
pub const DOMAIN_TRUST: &[(&str, f64)] = &[
    ("bloomberg.com", 0.50),
    ("wsj.com", 0.50),
    ("ft.com", 0.50),
    ("reuters.com", 0.40),
    ("apnews.com", 0.40),
    ("economist.com", 0.40),
    ("barrons.com", 0.35),
    ("cnbc.com", 0.35),
    ("marketwatch.com", 0.35),
    ("nytimes.com", 0.35),
    ("finance.yahoo.com", 0.30),
    ("nasdaq.com", 0.30),
    ("investors.com", 0.30),
    ("businessinsider.com", 0.25),
    ("forbes.com", 0.25),
    ("seekingalpha.com", 0.25),
    ("fool.com", 0.20),
    ("thestreet.com", 0.20),
    ("benzinga.com", 0.20),
    ("investopedia.com", 0.20),
];

/// Stepped recency term from hours elapsed since publication.
///
/// ≤1h 2.0, ≤6h 1.6, ≤24h 1.2, ≤72h 0.8, otherwise 0.4. Future timestamps
/// count as fresh.
pub fn recency_score(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let hours = (now - published_at).num_seconds() as f64 / 3600.0;
    if hours <= 1.0 {
        2.0
    } else if hours <= 6.0 {
        1.6
    } else if hours <= 24.0 {
        1.2
    } else if hours <= 72.0 {
        0.8
    } else {
        0.4
    }
}

/// Sum of weights for every table phrase found in `haystack`.
///
/// `haystack` is expected to be lower-cased already.
pub fn keyword_score(haystack: &str) -> f64 {
    KEYWORD_WEIGHTS
        .iter()
        .filter(|(phrase, _)| haystack.contains(phrase))
        .map(|(_, weight)| weight)
        .sum()
}

/// [`MENTION_BONUS`] when `topic` occurs in `haystack`, case-insensitively.
pub fn mention_score(haystack: &str, topic: &str) -> f64 {
    let topic = topic.trim().to_lowercase();
    if !topic.is_empty() && haystack.contains(&topic) {
        MENTION_BONUS
    } else {
        0.0
    }
}

/// Trust bonus for the article's host, 0.0 for unknown or unparseable URLs.
pub fn domain_score(url: &str) -> f64 {
    let Some(host) = normalized_host(url) else {
        return 0.0;
    };
    DOMAIN_TRUST
        .iter()
        .find(|(domain, _)| *domain == host)
        .map(|(_, bonus)| *bonus)
        .unwrap_or(0.0)
}

/// Priority score of `stub` for `topic`, evaluated at `now`.
///
/// Pure: the same stub, topic, and instant always give the same value.
pub fn score(stub: &ArticleStub, topic: &str, now: DateTime<Utc>) -> f64 {
    let haystack = stub.haystack();
    recency_score(stub.published_at, now)
        + keyword_score(&haystack)
        + mention_score(&haystack, topic)
        + domain_score(&stub.url)
}

/// How many stubs of a batch get a full-text fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBudget {
    /// Every stub is fetched.
    All,
    /// The `n` highest-scoring stubs are fetched.
    Top(usize),
}

impl FetchBudget {
    /// Map the raw config integer onto a budget.
    ///
    /// **Any value `<= 0` means [`FetchBudget::All`]**, not "fetch nothing".
    /// To disable full-text fetching entirely there is no raw value; callers
    /// that want summaries only should use `Top(0)` directly.
    pub fn from_raw(raw: i64) -> Self {
        if raw <= 0 {
            FetchBudget::All
        } else {
            FetchBudget::Top(raw as usize)
        }
    }
}

/// Outcome of ranking one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Batch indices chosen for full-text fetch.
    pub full_fetch: BTreeSet<usize>,
    /// Score of each stub, indexed like the input batch.
    pub scores: Vec<f64>,
}

impl Selection {
    /// Whether the stub at batch position `index` gets a full-text fetch.
    pub fn wants_full_text(&self, index: usize) -> bool {
        self.full_fetch.contains(&index)
    }

    /// Stubs paired with their score and index, highest score first.
    pub fn ranked(&self, stubs: &[ArticleStub]) -> Vec<ScoredStub> {
        rank_order(&self.scores)
            .into_iter()
            .map(|index| ScoredStub {
                index,
                score: self.scores[index],
                stub: stubs[index].clone(),
            })
            .collect()
    }
}

fn rank_order(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    // stable: equal scores keep batch order
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
    order
}

/// Score every stub at the shared instant `now` and pick the top `budget`.
pub fn select_top_n(
    stubs: &[ArticleStub],
    topic: &str,
    budget: FetchBudget,
    now: DateTime<Utc>,
) -> Selection {
    let scores: Vec<f64> = stubs.iter().map(|stub| score(stub, topic, now)).collect();
    let full_fetch = match budget {
        FetchBudget::All => (0..stubs.len()).collect(),
        FetchBudget::Top(n) => rank_order(&scores).into_iter().take(n).collect(),
    };
    Selection { full_fetch, scores }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceId;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 6, 12, 0, 0).unwrap()
    }

    fn stub(title: &str, url: &str, age: Duration) -> ArticleStub {
        ArticleStub {
            title: title.to_string(),
            url: url.to_string(),
            published_at: now() - age,
            summary: None,
            source: SourceId::Reuters,
            topic: "ACME".to_string(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_recency_steps() {
        let n = now();
        assert_eq!(recency_score(n, n), 2.0);
        assert_eq!(recency_score(n - Duration::minutes(60), n), 2.0);
        assert_eq!(recency_score(n - Duration::minutes(61), n), 1.6);
        assert_eq!(recency_score(n - Duration::hours(6), n), 1.6);
        assert_eq!(recency_score(n - Duration::hours(24), n), 1.2);
        assert_eq!(recency_score(n - Duration::hours(72), n), 0.8);
        assert_eq!(recency_score(n - Duration::hours(73), n), 0.4);
        assert_eq!(recency_score(n - Duration::days(400), n), 0.4);
        assert_eq!(recency_score(n + Duration::hours(3), n), 2.0);
    }

    #[test]
    fn test_recency_is_non_increasing_with_age() {
        let n = now();
        let mut last = f64::INFINITY;
        for minutes in (0..=60 * 24 * 5).step_by(17) {
            let s = recency_score(n - Duration::minutes(minutes), n);
            assert!(s <= last, "recency rose at {minutes} minutes");
            last = s;
        }
    }

    #[test]
    fn test_keyword_terms_move_score_in_their_direction() {
        let base = keyword_score("acme reports quarterly results");
        assert!(keyword_score("acme reports quarterly results, shares surge") > base);
        assert!(keyword_score("acme reports quarterly results amid lawsuit") < base);
        assert!(close(
            keyword_score("acme beat estimates despite downgrade"),
            0.6 - 0.7
        ));
    }

    #[test]
    fn test_common_words_do_not_trigger_event_phrases() {
        for neutral in [
            "acme issued new shares",
            "sec commission to dismiss complaint",
            "settings kept by default",
            "asphalt maker acme",
        ] {
            assert!(close(keyword_score(neutral), 0.0), "{neutral} scored");
        }
        assert!(close(keyword_score("acme misses estimates"), -0.6));
        assert!(close(keyword_score("acme sued by regulator"), -0.5));
        assert!(close(keyword_score("nasdaq halts trading in acme"), -0.5));
        assert!(close(keyword_score("acme defaults on bond"), -0.8));
    }

    #[test]
    fn test_overlapping_phrasings_both_count() {
        assert!(close(
            keyword_score("guidance cut, then cut guidance again"),
            -1.6
        ));
    }

    #[test]
    fn test_mention_is_case_insensitive() {
        assert_eq!(mention_score("acme beats estimates", "ACME"), MENTION_BONUS);
        assert_eq!(mention_score("company beats estimates", "ACME"), 0.0);
        assert_eq!(mention_score("anything", "  "), 0.0);
    }

    #[test]
    fn test_domain_trust_lookup() {
        assert_eq!(domain_score("https://www.reuters.com/markets/x"), 0.40);
        assert_eq!(domain_score("https://BLOOMBERG.com/news"), 0.50);
        assert_eq!(domain_score("https://finance.yahoo.com/news/a"), 0.30);
        assert_eq!(domain_score("https://example.org/a"), 0.0);
        assert_eq!(domain_score("::not a url::"), 0.0);
    }

    #[test]
    fn test_company_beats_earnings_scores_three() {
        let s = stub(
            "Company beats earnings expectations",
            "https://reuters.com/x",
            Duration::minutes(30),
        );
        assert!(close(score(&s, "ACME", now()), 3.0));
    }

    #[test]
    fn test_topic_in_title_adds_mention_bonus() {
        let s = stub(
            "ACME beats earnings expectations",
            "https://reuters.com/x",
            Duration::minutes(30),
        );
        assert!(close(score(&s, "ACME", now()), 3.4));
    }

    #[test]
    fn test_unparseable_url_still_scores() {
        let s = stub("Quiet day", "", Duration::days(10));
        assert!(close(score(&s, "ACME", now()), 0.4));
    }

    #[test]
    fn test_fetch_budget_from_raw() {
        assert_eq!(FetchBudget::from_raw(0), FetchBudget::All);
        assert_eq!(FetchBudget::from_raw(-3), FetchBudget::All);
        assert_eq!(FetchBudget::from_raw(4), FetchBudget::Top(4));
    }

    /// Five stubs whose scores come out as [0.8, 3.0, 0.4, 3.4, 1.2].
    fn mixed_batch() -> Vec<ArticleStub> {
        vec![
            stub("Quiet day", "https://example.org/a", Duration::hours(48)),
            stub("Company beats earnings expectations", "https://reuters.com/b", Duration::minutes(30)),
            stub("Quiet week", "https://example.org/c", Duration::days(6)),
            stub("ACME beats earnings expectations", "https://reuters.com/d", Duration::minutes(30)),
            stub("Quiet morning", "https://example.org/e", Duration::hours(12)),
        ]
    }

    #[test]
    fn test_select_picks_highest_regardless_of_position() {
        let selection = select_top_n(&mixed_batch(), "ACME", FetchBudget::Top(2), now());
        assert!(close(selection.scores[3], 3.4));
        assert!(close(selection.scores[1], 3.0));
        assert_eq!(selection.full_fetch, BTreeSet::from([1, 3]));
        assert!(selection.wants_full_text(3));
        assert!(!selection.wants_full_text(0));
    }

    #[test]
    fn test_select_all_budget() {
        let batch = mixed_batch();
        let selection = select_top_n(&batch, "ACME", FetchBudget::from_raw(0), now());
        assert_eq!(selection.full_fetch.len(), batch.len());
        let oversized = select_top_n(&batch, "ACME", FetchBudget::Top(50), now());
        assert_eq!(oversized.full_fetch.len(), batch.len());
    }

    #[test]
    fn test_select_is_monotonic_in_budget() {
        let batch = mixed_batch();
        let mut previous = BTreeSet::new();
        for n in 1..=batch.len() {
            let current = select_top_n(&batch, "ACME", FetchBudget::Top(n), now()).full_fetch;
            assert!(previous.is_subset(&current));
            assert_eq!(current.len(), previous.len() + 1);
            previous = current;
        }
    }

    #[test]
    fn test_select_ties_keep_batch_order_and_repeat() {
        let batch: Vec<_> = (0..6)
            .map(|i| stub("Quiet day", &format!("https://example.org/{i}"), Duration::hours(2)))
            .collect();
        let first = select_top_n(&batch, "ACME", FetchBudget::Top(3), now());
        let second = select_top_n(&batch, "ACME", FetchBudget::Top(3), now());
        assert_eq!(first.full_fetch, BTreeSet::from([0, 1, 2]));
        assert_eq!(first, second);
    }

    #[test]
    fn test_ranked_orders_by_score() {
        let batch = mixed_batch();
        let selection = select_top_n(&batch, "ACME", FetchBudget::All, now());
        let order: Vec<usize> = selection.ranked(&batch).iter().map(|s| s.index).collect();
        assert_eq!(order, vec![3, 1, 4, 0, 2]);
    }

    #[test]
    fn test_empty_batch() {
        let selection = select_top_n(&[], "ACME", FetchBudget::Top(3), now());
        assert!(selection.full_fetch.is_empty());
        assert!(selection.scores.is_empty());
    }
}
