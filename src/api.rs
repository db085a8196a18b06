//! LLM access for the sentiment stage, with exponential backoff.
//!
//! - [`AskAsync`]: prompt in, text out
//! - [`OpenAiChat`]: OpenAI-compatible `chat/completions` client
//! - [`RetryAsk`]: decorator that retries any [`AskAsync`] with backoff and
//!   jitter
//!
//! # Retry Strategy
//!
//! ```text
//! delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
//! ```

use rand::{rng, Rng};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Something that answers a prompt with free text.
pub trait AskAsync {
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>>;
}

/// Retry wrapper around any [`AskAsync`].
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Wrap `inner`, retrying up to `max_retries` times after the first
    /// attempt. Delays start at `base_delay` and double, capped at 30s.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    fn backoff(&self, attempt: usize) -> StdDuration {
        let shift = (attempt.saturating_sub(1)).min(16) as u32;
        let delay = self.base_delay.saturating_mul(1 << shift).min(self.max_delay);
        let jitter_ms: u64 = rng().random_range(0..=250);
        delay + StdDuration::from_millis(jitter_ms)
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync,
{
    #[instrument(level = "debug", skip_all)]
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(prompt).await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }
                    let delay = self.backoff(attempt);
                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_t0.elapsed().as_millis(),
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// First choice's text from a `chat/completions` response body.
fn parse_chat_response(body: &str) -> Result<String, Box<dyn Error>> {
    let response: ChatResponse = serde_json::from_str(body)?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| "model returned no content".into())
}

/// OpenAI-compatible chat client. Low temperature and a short reply cap
/// keep scores consistent and cheap.
#[derive(Debug, Clone)]
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    const TEMPERATURE: f32 = 0.3;
    const MAX_TOKENS: u32 = 200;

    /// Build a client for `{base_url}/chat/completions`.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Sent as a bearer token
    /// * `base_url` - Defaults to [`DEFAULT_BASE_URL`] when absent or blank
    /// * `model` - Model name passed through unchanged
    /// * `timeout` - Whole-request timeout
    ///
    /// # Errors
    ///
    /// Fails when the HTTP client cannot be built.
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        timeout: StdDuration,
    ) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl AskAsync for OpenAiChat {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
        let t0 = Instant::now();
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: Self::TEMPERATURE,
            max_tokens: Self::MAX_TOKENS,
        };
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(elapsed_ms = t0.elapsed().as_millis(), %status, "API call failed");
            return Err(format!("chat completion returned HTTP {status}").into());
        }
        parse_chat_response(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Flaky {
        failures: usize,
        calls: AtomicUsize,
    }

    impl AskAsync for Flaky {
        async fn ask(&self, prompt: &str) -> Result<String, Box<dyn Error>> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err("temporary".into())
            } else {
                Ok(format!("echo: {prompt}"))
            }
        }
    }

    fn flaky(failures: usize) -> Flaky {
        Flaky {
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_retry_recovers_after_failures() {
        let api = RetryAsk::new(flaky(2), 3, StdDuration::from_millis(1));
        assert_eq!(api.ask("hi").await.unwrap(), "echo: hi");
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let api = RetryAsk::new(flaky(10), 1, StdDuration::from_millis(1));
        assert!(api.ask("hi").await.is_err());
        assert_eq!(api.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_backoff_is_capped() {
        let api = RetryAsk::new(flaky(0), 5, StdDuration::from_secs(1));
        let d1 = api.backoff(1);
        assert!(d1 >= StdDuration::from_secs(1) && d1 <= StdDuration::from_millis(1250));
        let d10 = api.backoff(10);
        assert!(d10 >= StdDuration::from_secs(30) && d10 <= StdDuration::from_millis(30_250));
    }

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"  SCORE: +4.5\nEXPLANATION: good  "}}]}"#;
        assert_eq!(
            parse_chat_response(body).unwrap(),
            "SCORE: +4.5\nEXPLANATION: good"
        );
        assert!(parse_chat_response(r#"{"choices":[]}"#).is_err());
        assert!(parse_chat_response(r#"{"choices":[{"message":{"content":null}}]}"#).is_err());
        assert!(parse_chat_response("not json").is_err());
    }

    #[test]
    fn test_base_url_defaults_and_trims() {
        let chat = OpenAiChat::new("k".into(), None, DEFAULT_MODEL.into(), StdDuration::from_secs(5)).unwrap();
        assert_eq!(chat.base_url, DEFAULT_BASE_URL);
        let chat = OpenAiChat::new(
            "k".into(),
            Some("http://localhost:8080/v1/".into()),
            "local".into(),
            StdDuration::from_secs(5),
        )
        .unwrap();
        assert_eq!(chat.base_url, "http://localhost:8080/v1");
        assert_eq!(chat.model(), "local");
    }
}
