//! Collector configuration.
//!
//! Loaded from a YAML file; since YAML is a superset of JSON, the JSON
//! config files of earlier collector versions load unchanged:
//!
//! ```yaml
//! topics: [TSLA, MSFT]
//! sources: [yahoofinance, reuters, googlenewsrss, newsapi]
//! max_age_days: 3
//! full_fetch_top_n: 10      # <= 0 fetches full text for every stub
//! max_content_chars: 4000
//! fetch_concurrency: 6
//! per_host_connections: 4
//! request_timeout_secs: 15
//! ```

use crate::models::SourceId;
use crate::scoring::FetchBudget;
use serde::Deserialize;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument, warn};

fn default_max_age_days() -> i64 {
    3
}

fn default_full_fetch_top_n() -> i64 {
    10
}

fn default_max_content_chars() -> usize {
    4000
}

fn default_fetch_concurrency() -> usize {
    6
}

fn default_per_host_connections() -> usize {
    4
}

fn default_request_timeout_secs() -> u64 {
    15
}

/// The file as written by the user.
#[derive(Debug, Clone, Deserialize)]
struct RawConfig {
    topics: Vec<String>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default = "default_max_age_days")]
    max_age_days: i64,
    #[serde(default = "default_full_fetch_top_n")]
    full_fetch_top_n: i64,
    #[serde(default = "default_max_content_chars")]
    max_content_chars: usize,
    #[serde(default = "default_fetch_concurrency")]
    fetch_concurrency: usize,
    #[serde(default = "default_per_host_connections")]
    per_host_connections: usize,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

/// Validated collector settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub topics: Vec<String>,
    pub sources: Vec<SourceId>,
    pub max_age_days: i64,
    pub budget: FetchBudget,
    pub max_content_chars: usize,
    pub fetch_concurrency: usize,
    pub per_host_connections: usize,
    pub request_timeout: Duration,
}

impl CollectorConfig {
    /// Parse config text. Unknown source ids are logged and dropped;
    /// repeated ids and blank topics are ignored.
    ///
    /// # Errors
    ///
    /// Malformed YAML/JSON, no usable topic, or a negative `max_age_days`.
    pub fn from_text(text: &str) -> Result<Self, Box<dyn Error>> {
        let raw: RawConfig = serde_yaml::from_str(text)?;

        let mut sources = Vec::new();
        for name in &raw.sources {
            match name.parse::<SourceId>() {
                Ok(id) if !sources.contains(&id) => sources.push(id),
                Ok(_) => {}
                Err(e) => warn!(source = %name, error = %e, "Ignoring unknown source in config"),
            }
        }

        let mut topics: Vec<String> = Vec::new();
        for topic in raw.topics.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if !topics.iter().any(|t| t == topic) {
                topics.push(topic.to_string());
            }
        }
        if topics.is_empty() {
            return Err("config lists no topics".into());
        }
        if raw.max_age_days < 0 {
            return Err(format!("max_age_days must be >= 0, got {}", raw.max_age_days).into());
        }

        Ok(Self {
            topics,
            sources,
            max_age_days: raw.max_age_days,
            budget: FetchBudget::from_raw(raw.full_fetch_top_n),
            max_content_chars: raw.max_content_chars,
            fetch_concurrency: raw.fetch_concurrency.max(1),
            per_host_connections: raw.per_host_connections.max(1),
            request_timeout: Duration::from_secs(raw.request_timeout_secs.max(1)),
        })
    }

    /// Read and parse the config file at `path`.
    #[instrument(level = "info")]
    pub async fn load(path: &str) -> Result<Self, Box<dyn Error>> {
        let text = tokio::fs::read_to_string(path).await?;
        let config = Self::from_text(&text)?;
        info!(
            topics = config.topics.len(),
            sources = config.sources.len(),
            budget = ?config.budget,
            "Loaded collector config"
        );
        Ok(config)
    }
}
