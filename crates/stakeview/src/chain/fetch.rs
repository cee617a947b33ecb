//! Read-only REST client for a chain node's API.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct FetchConfig {
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request: {0}")]
    Request(#[from] reqwest::Error),
    #[error("api error: status {0} body {1}")]
    Api(u16, String),
    #[error("decode body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// True when the node answered but refused the request (4xx/5xx).
    pub fn is_status(&self) -> bool {
        matches!(self, FetchError::Api(..))
    }
}

/// Source of upstream JSON responses. One GET per call, no retries.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError>;
}

/// [`Upstream`] backed by HTTP.
pub struct HttpUpstream {
    base_url: String,
    client: reqwest::Client,
    request_count: AtomicU64,
}

impl HttpUpstream {
    pub fn new(base_url: &str, config: &FetchConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            request_count: AtomicU64::new(0),
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, path: &str) -> Result<Value, FetchError> {
        let url = self.url_for(path);
        debug!(%url, "upstream get");
        let res = self.client.get(&url).send().await?;
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(FetchError::Api(status.as_u16(), body));
        }
        Ok(serde_json::from_str(&body)?)
    }
}
