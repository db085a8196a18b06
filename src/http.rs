//! HTTP transport shared by every adapter and by full-text fetches.
//!
//! [`Transport`] is the seam tests replace with an in-memory stub. The
//! production [`HttpTransport`] wraps one `reqwest::Client` with a fixed
//! timeout and caps in-flight requests per host with a semaphore, so many
//! concurrent (topic, source) batches cannot pile onto a single site.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument};
use url::Url;

pub const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    /// Unparseable URL, or one without a host.
    #[error("invalid url {0}")]
    InvalidUrl(String),
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("connection limiter for {0} is closed")]
    LimiterClosed(String),
}

/// Something that can GET a URL and hand back the body as text.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` with extra request `headers`. Non-2xx is an error.
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError>;
}

/// Lazily created semaphore per host.
#[derive(Debug)]
struct HostLimiter {
    per_host: usize,
    hosts: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl HostLimiter {
    fn new(per_host: usize) -> Self {
        Self {
            per_host: per_host.max(1),
            hosts: Mutex::new(HashMap::new()),
        }
    }

    fn semaphore(&self, host: &str) -> Arc<Semaphore> {
        let mut hosts = self.hosts.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        hosts
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(self.per_host)))
            .clone()
    }

    /// Wait for a request slot on `host`. The slot is released when the
    /// permit is dropped.
    async fn acquire(&self, host: &str) -> Result<OwnedSemaphorePermit, FetchError> {
        self.semaphore(host)
            .acquire_owned()
            .await
            .map_err(|_| FetchError::LimiterClosed(host.to_string()))
    }
}

/// `reqwest`-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    limiter: Arc<HostLimiter>,
}

impl HttpTransport {
    /// Build a transport with a per-request `timeout` and at most
    /// `per_host` simultaneous requests to any one host.
    ///
    /// # Errors
    ///
    /// Fails when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, per_host: usize) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(per_host.max(1))
            .build()?;
        Ok(Self {
            client,
            limiter: Arc::new(HostLimiter::new(per_host)),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(level = "debug", skip(self, headers))]
    async fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<String, FetchError> {
        let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl(url.to_string()))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(url.to_string()))?
            .to_ascii_lowercase();

        // held until the body has been read
        let _permit = self.limiter.acquire(&host).await?;

        let mut request = self.client.get(parsed);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.text().await?;
        debug!(%host, bytes = body.len(), "fetched");
        Ok(body)
    }
}
