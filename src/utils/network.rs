//! Network utilities: image downloads with bounded retry

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::RetryIf;

use crate::config::AppConfig;

/// Longest single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Failure to fetch an image
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("no image stored for {0}")]
    Missing(String),
}

impl FetchError {
    /// Connection failures, timeouts and gateway-style 5xx are worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport { .. } => true,
            FetchError::Status { status, .. } => matches!(
                *status,
                StatusCode::INTERNAL_SERVER_ERROR
                    | StatusCode::BAD_GATEWAY
                    | StatusCode::SERVICE_UNAVAILABLE
                    | StatusCode::GATEWAY_TIMEOUT
            ),
            FetchError::Missing(_) => false,
        }
    }
}

/// Retry and timeout settings shared by interactive and batch fetches
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub retries: usize,
    /// Delay before the first retry, doubled on each further retry
    pub backoff: Duration,
    /// Per-attempt request timeout
    pub timeout: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retries: config.fetch_retries,
            backoff: Duration::from_millis(config.fetch_backoff_millis),
            timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// Delays between attempts: backoff, 2x backoff, 4x backoff, ...
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let half = (self.backoff.as_millis() / 2) as u64;
        ExponentialBackoff::from_millis(2)
            .factor(half)
            .max_delay(MAX_BACKOFF)
            .take(self.retries)
    }
}

/// Run `attempt` until it succeeds, fails permanently or the policy runs out
pub async fn fetch_with_retry<F, Fut>(policy: &RetryPolicy, attempt: F) -> Result<Bytes, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Bytes, FetchError>>,
{
    RetryIf::spawn(policy.delays(), attempt, FetchError::is_transient).await
}

/// Anything that can produce image bytes for a URL
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError>;
}

/// HTTP(S) image source
pub struct HttpImageSource {
    client: Client,
    policy: RetryPolicy,
}

impl HttpImageSource {
    pub fn new(policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(policy.timeout)
            .user_agent(concat!("stylepalette/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, policy })
    }

    async fn fetch_once(&self, url: &str) -> Result<Bytes, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!("GET {} -> {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.bytes().await.map_err(transport)
    }
}

#[async_trait]
impl ImageSource for HttpImageSource {
    async fn fetch(&self, url: &str) -> Result<Bytes, FetchError> {
        fetch_with_retry(&self.policy, || self.fetch_once(url)).await
    }
}
