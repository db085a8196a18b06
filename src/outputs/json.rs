//! JSON record writers.
//!
//! # Output Structure
//!
//! ```text
//! output_base/
//! ├── reuters/
//! │   └── ACME/
//! │       ├── 001_2025-05-06.json
//! │       └── 002_2025-05-05.json
//! └── llm_scores/
//!     └── ACME/
//!         └── 001_2025-05-06_score.json
//! ```
//!
//! Article files are keyed by batch position and published date, so
//! concurrent writers in one batch never share a path. An existing file at
//! the same path is overwritten.

use crate::models::{ArticleRecord, ScoreRecord};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Directory under the data root that holds sentiment scores.
pub const SCORES_DIR: &str = "llm_scores";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

/// Keep a topic or source usable as a single path component. Separators
/// become `_`, and `.`, `..` or an empty name become `_` so a config value
/// can never leave its parent directory.
fn path_segment(raw: &str) -> String {
    let segment: String = raw
        .trim()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    match segment.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => segment,
    }
}

/// `<base>/<source>/<topic>/<NNN>_<YYYY-MM-DD>.json`, `NNN` being the
/// 1-based batch position.
pub fn article_path(base: &Path, record: &ArticleRecord, index: usize) -> PathBuf {
    base.join(path_segment(&record.source))
        .join(path_segment(&record.topic))
        .join(format!(
            "{:03}_{}.json",
            index + 1,
            record.published_at.format("%Y-%m-%d")
        ))
}

/// `<data_dir>/llm_scores/<topic>/<stem>_score.json` for the article file
/// with the given stem.
pub fn score_path(data_dir: &Path, topic: &str, stem: &str) -> PathBuf {
    data_dir
        .join(SCORES_DIR)
        .join(path_segment(topic))
        .join(format!("{stem}_score.json"))
}

async fn write_pretty<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).await.map_err(|source| {
            error!(dir = %dir.display(), error = %source, "Failed to create output dir");
            PersistError::Io {
                path: dir.to_path_buf(),
                source,
            }
        })?;
    }
    fs::write(path, json).await.map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write one article record, returning the path written.
#[instrument(level = "debug", skip_all, fields(source = %record.source, topic = %record.topic, index))]
pub async fn write_article_record(
    base: &Path,
    record: &ArticleRecord,
    index: usize,
) -> Result<PathBuf, PersistError> {
    let path = article_path(base, record, index);
    write_pretty(&path, record).await?;
    info!(path = %path.display(), "Wrote article record");
    Ok(path)
}

#[instrument(level = "debug", skip_all, fields(topic = %record.topic, stem))]
pub async fn write_score_record(
    data_dir: &Path,
    stem: &str,
    record: &ScoreRecord,
) -> Result<PathBuf, PersistError> {
    let path = score_path(data_dir, &record.topic, stem);
    write_pretty(&path, record).await?;
    info!(path = %path.display(), score = record.llm_score, "Wrote score record");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(topic: &str) -> ArticleRecord {
        ArticleRecord {
            source: "reuters".to_string(),
            topic: topic.to_string(),
            title: "ACME beats".to_string(),
            url: "https://www.reuters.com/a".to_string(),
            published_at: Utc.with_ymd_and_hms(2025, 5, 6, 14, 30, 0).unwrap(),
            content: "body".to_string(),
            score: Some(2.4),
        }
    }

    #[test]
    fn test_article_path_layout() {
        let path = article_path(Path::new("/data"), &record("ACME"), 0);
        assert_eq!(path, PathBuf::from("/data/reuters/ACME/001_2025-05-06.json"));
        let path = article_path(Path::new("/data"), &record("BRK/B"), 41);
        assert_eq!(path, PathBuf::from("/data/reuters/BRK_B/042_2025-05-06.json"));
    }

    #[test]
    fn test_dot_topics_stay_inside_source_dir() {
        for topic in ["..", ".", "  ", " .. "] {
            let path = article_path(Path::new("/data"), &record(topic), 0);
            assert_eq!(path, PathBuf::from("/data/reuters/_/001_2025-05-06.json"), "topic {topic:?}");
        }
        assert_eq!(
            score_path(Path::new("/data"), "..", "001_2025-05-06"),
            PathBuf::from("/data/llm_scores/_/001_2025-05-06_score.json")
        );
        assert_eq!(path_segment("..a"), "..a");
    }

    #[test]
    fn test_score_path_layout() {
        assert_eq!(
            score_path(Path::new("/data"), "ACME", "001_2025-05-06"),
            PathBuf::from("/data/llm_scores/ACME/001_2025-05-06_score.json")
        );
    }

    #[tokio::test]
    async fn test_write_article_record_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_article_record(dir.path(), &record("ACME"), 2).await.unwrap();
        let mut second = record("ACME");
        second.content = "newer".to_string();
        let again = write_article_record(dir.path(), &second, 2).await.unwrap();
        assert_eq!(first, again);

        let stored: ArticleRecord =
            serde_json::from_str(&std::fs::read_to_string(&again).unwrap()).unwrap();
        assert_eq!(stored.content, "newer");
        assert_eq!(stored.score, Some(2.4));
    }

    #[tokio::test]
    async fn test_write_fails_when_base_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let err = write_article_record(&blocker, &record("ACME"), 0).await.unwrap_err();
        assert!(matches!(err, PersistError::Io { .. }));
    }
}
