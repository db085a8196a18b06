//! Price/volume context for sentiment prompts.
//!
//! Snapshots are produced by a separate market-data fetcher and cached as
//! `<market_dir>/<SYMBOL>_market_data.json`; this module only reads them and
//! renders the plain-text block prepended to prompts.

use serde::Deserialize;
use std::fmt::Write;
use std::path::Path;
use tracing::{debug, warn};

/// Closes listed at the end of the context block.
const RECENT_CLOSES: usize = 7;

/// One closing price, `date` as `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DailyPrice {
    pub date: String,
    pub close: f64,
}

/// Cached market snapshot for one symbol.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    pub period_days: u32,
    pub latest_price: f64,
    pub price_change_percent: f64,
    pub period_high: f64,
    pub period_low: f64,
    pub avg_volume: u64,
    #[serde(default)]
    pub daily_prices: Vec<DailyPrice>,
}

/// `1234567` -> `1,234,567`.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn trend(change_pct: f64) -> String {
    if change_pct > 0.0 {
        format!("up {change_pct:.2}%")
    } else if change_pct < 0.0 {
        format!("down {:.2}%", change_pct.abs())
    } else {
        "flat".to_string()
    }
}

/// Render the context block for `snapshot`.
pub fn format_market_context(snapshot: &MarketSnapshot) -> String {
    let company = snapshot.company_name.as_deref().unwrap_or(&snapshot.symbol);
    let mut out = String::new();
    // write! into a String cannot fail
    let _ = writeln!(out, "MARKET CONTEXT FOR {} ({company}):", snapshot.symbol);
    let _ = writeln!(out);
    let _ = writeln!(out, "Recent Performance ({} days):", snapshot.period_days);
    let _ = writeln!(out, "- Current Price: ${:.2}", snapshot.latest_price);
    let _ = writeln!(out, "- Price Change: {}", trend(snapshot.price_change_percent));
    let _ = writeln!(out, "- Period High: ${:.2}", snapshot.period_high);
    let _ = writeln!(out, "- Period Low: ${:.2}", snapshot.period_low);
    let _ = writeln!(out, "- Average Daily Volume: {}", group_thousands(snapshot.avg_volume));
    let _ = writeln!(out);
    let _ = writeln!(out, "Company Information:");
    let _ = writeln!(out, "- Sector: {}", snapshot.sector.as_deref().unwrap_or("Unknown"));
    if let Some(cap) = snapshot.market_cap.filter(|c| *c > 0.0) {
        let _ = writeln!(out, "- Market Cap: ${:.2}B", cap / 1e9);
    }
    if snapshot.daily_prices.len() >= RECENT_CLOSES {
        let _ = writeln!(out);
        let _ = writeln!(out, "Recent Daily Closes:");
        let recent = &snapshot.daily_prices[snapshot.daily_prices.len() - RECENT_CLOSES..];
        for day in recent {
            let _ = writeln!(out, "  {}: ${:.2}", day.date, day.close);
        }
    }
    out.trim().to_string()
}

/// Context block for `topic` from `market_dir`, or `None` when there is no
/// usable snapshot.
pub async fn load_market_context(topic: &str, market_dir: &Path) -> Option<String> {
    let path = market_dir.join(format!("{topic}_market_data.json"));
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "No market snapshot");
            return None;
        }
    };
    match serde_json::from_str::<MarketSnapshot>(&text) {
        Ok(snapshot) => Some(format_market_context(&snapshot)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Could not load market context");
            None
        }
    }
}
