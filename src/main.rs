//! # Fin News Pulse
//!
//! Collects financial news per ticker from nine sources, ranks each batch
//! with a cheap heuristic score, fetches full page text only for the top
//! of the ranking, and persists one JSON record per article. A second
//! stage scores collected articles with an LLM.
//!
//! ## Usage
//!
//! ```sh
//! fin_news_pulse collect --config config.yaml --output-dir ./data
//! fin_news_pulse analyze --data-dir ./data --prompt-file prompt.txt
//! ```
//!
//! ## Architecture
//!
//! 1. **Discovery**: each source adapter turns a search page, feed, or API
//!    response into article stubs
//! 2. **Ranking**: stubs are scored on recency, event keywords, ticker
//!    mentions, and source trust; the top N are marked for full fetch
//! 3. **Persistence**: full text (or the summary) is extracted, truncated,
//!    and written, several articles at a time
//! 4. **Analysis**: unscored articles are sent to the LLM and the parsed
//!    score is saved next to the collection

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod analyze;
mod api;
mod cli;
mod config;
mod extract;
mod http;
mod market;
mod models;
mod outputs;
mod pipeline;
mod scoring;
mod scrapers;
mod utils;

use analyze::{run_analysis, AnalyzeOptions};
use api::{OpenAiChat, RetryAsk};
use cli::{AnalyzeArgs, Cli, CollectArgs, Command};
use config::CollectorConfig;
use extract::Extractor;
use http::HttpTransport;
use pipeline::Collector;
use scrapers::Credentials;
use utils::ensure_writable_dir;

const LLM_TIMEOUT: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    let result = match args.command {
        Command::Collect(args) => collect(args).await,
        Command::Analyze(args) => analyze(args).await,
    };

    let elapsed = start_time.elapsed();
    match &result {
        Ok(()) => info!(?elapsed, "Execution complete"),
        Err(e) => error!(?elapsed, error = %e, "Execution failed"),
    }
    result
}

#[instrument(level = "info", skip_all, fields(config = %args.config))]
async fn collect(args: CollectArgs) -> Result<(), Box<dyn Error>> {
    let config = CollectorConfig::load(&args.config).await?;

    let output_dir = args.output_dir.unwrap_or_else(|| ".".to_string());
    if let Err(e) = ensure_writable_dir(&output_dir).await {
        error!(
            path = %output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let transport = HttpTransport::new(config.request_timeout, config.per_host_connections)?;
    let credentials = Credentials {
        newsapi: args.newsapi_key,
        bing_news: args.bing_news_key,
        finnhub: args.finnhub_api_key,
    };
    let extractor = Extractor::new(!args.no_readability);
    info!(
        readability = extractor.readability_enabled(),
        topics = ?config.topics,
        sources = ?config.sources,
        "Starting collection"
    );

    let collector = Collector::new(
        config,
        Arc::new(transport),
        extractor,
        credentials,
        PathBuf::from(output_dir),
    );
    let reports = collector.run().await;
    for report in &reports {
        info!(
            source = %report.source,
            topic = %report.topic,
            stubs = report.stubs,
            skipped = report.skipped,
            full_text = report.full_text,
            written = report.written,
            failed = report.failed,
            "Batch summary"
        );
    }
    Ok(())
}

#[instrument(level = "info", skip_all, fields(data_dir = %args.data_dir))]
async fn analyze(args: AnalyzeArgs) -> Result<(), Box<dyn Error>> {
    let template = tokio::fs::read_to_string(&args.prompt_file).await?;
    info!(prompt_file = %args.prompt_file, "Loaded prompt template");

    let chat = OpenAiChat::new(
        args.openai_api_key,
        args.openai_base_url,
        args.model,
        LLM_TIMEOUT,
    )?;
    let options = AnalyzeOptions {
        data_dir: PathBuf::from(&args.data_dir),
        max_age_days: args.max_age_days,
        max_articles: args.max_articles,
        model: chat.model().to_string(),
        market_dir: args.market_data_dir.map(PathBuf::from),
    };
    let llm = RetryAsk::new(chat, 5, Duration::from_secs(1));

    let report = run_analysis(&options, &template, &llm).await;
    if report.candidates > 0 && report.scored == 0 && report.failed > 0 {
        return Err(format!("all {} scoring attempts failed", report.failed).into());
    }
    Ok(())
}
