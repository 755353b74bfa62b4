use std::error::Error as _;
use std::future::Future;
use std::io;
use std::time::Duration;

use backon::{ConstantBuilder, Retryable};
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "http://data.sensor.community/airrohr/v1/sensor/";
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_ATTEMPTS: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Server not found")]
    NotFound,
    #[error("Connection timed out")]
    TimedOut,
    #[error("Connection lost")]
    ConnectionLost,
    #[error("No or invalid response")]
    InvalidResponse,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Invalid request")]
    InvalidRequest,
    #[error("Client timeout")]
    ClientTimeout,
    #[error("Connection reset")]
    ConnectionReset,
    #[error("Unknown error")]
    Unknown,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(kind) = io_error_kind(&err) {
            match kind {
                io::ErrorKind::ConnectionRefused => return TransportError::ConnectionRefused,
                io::ErrorKind::ConnectionReset => return TransportError::ConnectionReset,
                io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::UnexpectedEof => return TransportError::ConnectionLost,
                io::ErrorKind::TimedOut => return TransportError::TimedOut,
                _ => {}
            }
        }

        if err.is_timeout() {
            if err.is_connect() {
                TransportError::TimedOut
            } else {
                TransportError::ClientTimeout
            }
        } else if err.is_connect() {
            if mentions_dns(&err) {
                TransportError::NotFound
            } else {
                TransportError::ConnectionFailed
            }
        } else if err.is_builder() {
            TransportError::InvalidRequest
        } else if err.is_decode() || err.is_redirect() {
            TransportError::InvalidResponse
        } else if err.is_body() || err.is_request() {
            TransportError::ConnectionLost
        } else {
            TransportError::Unknown
        }
    }
}

fn io_error_kind(err: &reqwest::Error) -> Option<io::ErrorKind> {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return Some(io_err.kind());
        }
        source = e.source();
    }
    None
}

fn mentions_dns(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if e.to_string().contains("dns error") {
            return true;
        }
        source = e.source();
    }
    false
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch sensor {sensor_id} after {attempts} attempts: {source}")]
pub struct FetchError {
    pub sensor_id: String,
    pub attempts: u32,
    #[source]
    pub source: TransportError,
}

/// Issues one GET and returns the body, whatever the HTTP status.
pub trait Transport {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, TransportError>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        log::debug!("-> GET {url}");
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;
        log::debug!("<- {}", response.status());

        let body = response.bytes().await?;
        Ok(body.to_vec())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Pause before each retry. There is none before the first attempt.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            delay: RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    pub fn backoff(&self) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.delay)
            .with_max_times(self.retries() as usize)
    }
}

#[derive(Debug, Clone)]
pub struct Fetcher<T> {
    transport: T,
    base_url: String,
    policy: RetryPolicy,
}

impl<T: Transport> Fetcher<T> {
    pub fn new(transport: T, base_url: &str, policy: RetryPolicy) -> Self {
        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Self {
            transport,
            base_url,
            policy,
        }
    }

    pub fn url(&self, sensor_id: &str) -> String {
        format!("{}{sensor_id}/", self.base_url)
    }

    pub async fn fetch(&self, sensor_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url(sensor_id);
        let retries = self.policy.retries();
        let mut retry = 0;

        let result = (|| self.transport.get(&url))
            .retry(self.policy.backoff())
            .sleep(tokio::time::sleep)
            .notify(|e, dur| {
                retry += 1;
                log::error!("Error: {e}");
                log::info!("Retry #{retry} of {retries} in {dur:?}...");
            })
            .await;

        result.map_err(|source| FetchError {
            sensor_id: sensor_id.to_string(),
            attempts: retry + 1,
            source,
        })
    }
}
