//! Utility functions for dates, string shortening, hosts, and the filesystem.
//!
//! - Tolerant timestamp parsing (ISO-8601 with or without `Z`, RFC 2822)
//! - The day-granular recency check every adapter applies
//! - Content truncation with a fixed marker, and log-friendly shortening
//! - Host normalization for the domain-trust lookup
//! - Output directory validation

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

/// Appended to stored content that was cut to the character budget.
pub const TRUNCATION_MARKER: &str = "...";

/// Parse a timestamp the way upstream feeds actually send them.
///
/// Accepted forms, in order:
/// - RFC 3339 / ISO-8601 with offset or `Z` (`2025-05-06T14:30:00Z`)
/// - ISO-8601 without offset, read as UTC (`2025-05-06T14:30:00.123`)
/// - `YYYY-MM-DD HH:MM:SS`, read as UTC
/// - bare `YYYY-MM-DD`, midnight UTC
/// - RFC 2822 e-mail dates (`Tue, 06 May 2025 14:30:00 GMT`)
///
/// Returns `None` for anything else.
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse `raw`, falling back to `now` when absent or unparseable.
pub fn coerce_datetime(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.and_then(parse_datetime).unwrap_or(now)
}

/// Whole days elapsed between `published_at` and `now`.
pub fn age_days(published_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - published_at).num_days()
}

/// True when the article is at most `max_age_days` whole days old.
///
/// Timestamps in the future count as recent.
pub fn is_recent(published_at: DateTime<Utc>, now: DateTime<Utc>, max_age_days: i64) -> bool {
    age_days(published_at, now) <= max_age_days
}

/// Cut `text` to `budget` characters and append [`TRUNCATION_MARKER`].
///
/// Text already within budget is returned untouched, so the marker appears
/// only when something was actually removed.
pub fn truncate_content(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and a count of
/// the dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        None => s.to_string(),
        Some((cut, _)) => format!("{}…(+{} bytes)", &s[..cut], s.len() - cut),
    }
}

/// Lower-cased host of `url` with a leading `www.` removed.
///
/// `None` when the URL does not parse or has no host.
pub fn normalized_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
