//! The `analyze` stage: LLM sentiment scores for collected articles.
//!
//! Reads the records the collector wrote, skips anything already scored,
//! asks the model for a `SCORE:`/`EXPLANATION:` reply, and writes one score
//! record per article under `llm_scores/<topic>/`.

use crate::api::AskAsync;
use crate::market::load_market_context;
use crate::models::{ArticleRecord, ScoreRecord};
use crate::outputs::json::{score_path, write_score_record, SCORES_DIR};
use crate::utils::truncate_for_log;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// Scores outside this range are rejected.
pub const SCORE_LIMIT: f64 = 10.0;

const NO_EXPLANATION: &str = "No explanation provided";

/// Settings for one analysis run.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    /// Root the collector wrote to; scores go under `llm_scores/` here.
    pub data_dir: PathBuf,
    pub max_age_days: i64,
    /// Cap on new scores; already-scored articles do not count.
    pub max_articles: usize,
    /// Recorded in every score file.
    pub model: String,
    /// Directory of `<SYMBOL>_market_data.json` snapshots.
    pub market_dir: Option<PathBuf>,
}

/// A collected article file, loaded.
#[derive(Debug, Clone)]
pub struct ArticleFile {
    pub path: PathBuf,
    pub record: ArticleRecord,
}

impl ArticleFile {
    /// File name without `.json`, e.g. `001_2025-05-06`.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Counters for one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzeReport {
    pub candidates: usize,
    pub already_scored: usize,
    pub scored: usize,
    pub failed: usize,
}

/// Every article record under `data_dir` with non-empty content published
/// within `max_age_days` of `now`, sorted by path. `llm_scores` is never
/// descended into; unreadable files are logged and skipped.
#[instrument(level = "info", skip(now))]
pub async fn find_article_files(
    data_dir: &Path,
    max_age_days: i64,
    now: DateTime<Utc>,
) -> Vec<ArticleFile> {
    let cutoff = now - Duration::days(max_age_days);
    let mut found = Vec::new();
    let mut pending = vec![data_dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Could not list directory");
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if entry.file_name() != SCORES_DIR {
                    pending.push(path);
                }
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record = match read_record(&path).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Could not read article");
                    continue;
                }
            };
            if record.content.trim().is_empty() || record.published_at < cutoff {
                continue;
            }
            found.push(ArticleFile { path, record });
        }
    }

    found.sort_by(|a, b| a.path.cmp(&b.path));
    info!(count = found.len(), "Found article files");
    found
}

async fn read_record(path: &Path) -> Result<ArticleRecord, Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&text)?)
}

/// Fill the prompt template and prepend the market context, if any.
pub fn format_prompt(template: &str, record: &ArticleRecord, market_context: Option<&str>) -> String {
    let prompt = template
        .replace("{title}", &record.title)
        .replace(
            "{published_at}",
            &record.published_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
        .replace("{source}", &record.source)
        .replace("{topic}", &record.topic)
        .replace("{content}", &record.content);
    match market_context.filter(|c| !c.is_empty()) {
        Some(context) => format!("{context}\n\n{prompt}"),
        None => prompt,
    }
}

fn parse_score(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let raw = raw.strip_prefix('+').unwrap_or(raw).trim();
    let score: f64 = raw.parse().ok()?;
    if !score.is_finite() || !(-SCORE_LIMIT..=SCORE_LIMIT).contains(&score) {
        return None;
    }
    Some((score * 100.0).round() / 100.0)
}

/// Extract `(score, explanation)` from a model reply.
///
/// The first `SCORE:` line decides the score, which must lie in
/// `[-10, 10]` and is rounded to two decimals. The explanation is the text
/// after `EXPLANATION:` plus every following non-blank line that is not a
/// `SCORE:` line, joined with spaces.
pub fn parse_llm_response(text: &str) -> Option<(f64, String)> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();

    let score_line = lines.iter().find_map(|l| l.strip_prefix("SCORE:"))?;
    let Some(score) = parse_score(score_line) else {
        warn!(raw = %score_line.trim(), "Score missing or out of range");
        return None;
    };

    let explanation = lines
        .iter()
        .position(|l| l.starts_with("EXPLANATION:"))
        .map(|start| {
            let first = lines[start].trim_start_matches("EXPLANATION:").trim();
            std::iter::once(first)
                .chain(
                    lines[start + 1..]
                        .iter()
                        .copied()
                        .filter(|l| !l.is_empty() && !l.starts_with("SCORE:")),
                )
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| NO_EXPLANATION.to_string());

    Some((score, explanation))
}

/// Score up to `max_articles` new articles. Per-article failures are logged
/// and counted, never returned.
#[instrument(level = "info", skip_all, fields(data_dir = %options.data_dir.display(), model = %options.model))]
pub async fn run_analysis<A: AskAsync>(
    options: &AnalyzeOptions,
    template: &str,
    llm: &A,
) -> AnalyzeReport {
    let files = find_article_files(&options.data_dir, options.max_age_days, Utc::now()).await;
    let mut report = AnalyzeReport {
        candidates: files.len(),
        ..AnalyzeReport::default()
    };

    for file in &files {
        if report.scored >= options.max_articles {
            info!(max_articles = options.max_articles, "Reached article limit");
            break;
        }
        let stem = file.stem();
        let topic = &file.record.topic;
        if tokio::fs::try_exists(score_path(&options.data_dir, topic, &stem))
            .await
            .unwrap_or(false)
        {
            debug!(path = %file.path.display(), "Already scored");
            report.already_scored += 1;
            continue;
        }

        let market_context = match &options.market_dir {
            Some(dir) => load_market_context(topic, dir).await,
            None => None,
        };
        let prompt = format_prompt(template, &file.record, market_context.as_deref());
        info!(
            path = %file.path.display(),
            title = %truncate_for_log(&file.record.title, 80),
            market_context = market_context.is_some(),
            "Scoring article"
        );

        let reply = match llm.ask(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(path = %file.path.display(), error = %e, "LLM call failed; skipping article");
                report.failed += 1;
                continue;
            }
        };
        let Some((score, explanation)) = parse_llm_response(&reply) else {
            warn!(
                path = %file.path.display(),
                reply = %truncate_for_log(&reply, 100),
                "Could not extract score; skipping article"
            );
            report.failed += 1;
            continue;
        };

        let record = ScoreRecord {
            article_file: file.path.display().to_string(),
            topic: topic.clone(),
            source: file.record.source.clone(),
            title: file.record.title.clone(),
            url: file.record.url.clone(),
            published_at: file.record.published_at,
            llm_score: score,
            llm_explanation: explanation,
            model: options.model.clone(),
            scored_at: Utc::now(),
        };
        match write_score_record(&options.data_dir, &stem, &record).await {
            Ok(_) => report.scored += 1,
            Err(e) => {
                error!(path = %file.path.display(), error = %e, "Failed to save score");
                report.failed += 1;
            }
        }
    }

    info!(
        candidates = report.candidates,
        already_scored = report.already_scored,
        scored = report.scored,
        failed = report.failed,
        "Analysis finished"
    );
    report
}
