//! Command-line interface definitions.
//!
//! Credentials may be passed as flags or picked up from the environment.

use clap::{Args, Parser, Subcommand};

/// Financial news collector and sentiment scorer.
///
/// # Examples
///
/// ```sh
/// # Collect articles for the topics in config.yaml into ./data
/// fin_news_pulse collect --config config.yaml --output-dir ./data
///
/// # Score what was collected in the last day
/// fin_news_pulse analyze --data-dir ./data --prompt-file prompt.txt --max-age-days 1
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch, rank, and persist articles for every configured topic and source
    Collect(CollectArgs),
    /// Score collected articles with an LLM
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Path to the collector config (YAML or JSON)
    #[arg(short, long)]
    pub config: String,

    /// Output directory; defaults to the current directory
    #[arg(short, long)]
    pub output_dir: Option<String>,

    /// Skip main-content detection and keep every paragraph
    #[arg(long)]
    pub no_readability: bool,

    /// NewsAPI.org key
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true)]
    pub newsapi_key: Option<String>,

    /// Bing News Search key
    #[arg(long, env = "BING_NEWS_KEY", hide_env_values = true)]
    pub bing_news_key: Option<String>,

    /// Finnhub API token
    #[arg(long, env = "FINNHUB_API_KEY", hide_env_values = true)]
    pub finnhub_api_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Directory the collector wrote to
    #[arg(short, long)]
    pub data_dir: String,

    /// Prompt template with {title}, {published_at}, {source}, {topic}, {content}
    #[arg(short, long)]
    pub prompt_file: String,

    /// Only score articles published within this many days
    #[arg(long, default_value_t = 1)]
    pub max_age_days: i64,

    /// Stop after this many new scores
    #[arg(long, default_value_t = 10)]
    pub max_articles: usize,

    /// Chat model name
    #[arg(long, default_value = crate::api::DEFAULT_MODEL)]
    pub model: String,

    /// Directory with cached `<SYMBOL>_market_data.json` snapshots
    #[arg(long)]
    pub market_data_dir: Option<String>,

    /// API key for the chat-completions endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: String,

    /// Base URL of an OpenAI-compatible endpoint
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,
}
