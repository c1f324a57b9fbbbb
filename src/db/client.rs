

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, info};


const INITIAL_RETRY_DELAY_MS: u64 = 100;

const MAX_RETRY_DELAY_MS: u64 = 10000;


#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    Connection(String),
    #[error("Request timed out: {0}")]
    Timeout(String),
    #[error("{store} returned HTTP {status}: {body}")]
    Status {
        store: String,
        status: u16,
        body: String,
    },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Retry exhausted after {0} attempts: {1}")]
    RetryExhausted(u32, String),
}

impl StoreError {
    /// Connection problems, pool exhaustion, timeouts, 429 and 5xx may succeed on retry.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout(_) | Self::RetryExhausted(..) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Query(err.to_string())
        }
    }
}


#[derive(Debug, Clone)]
pub enum Credentials {
    None,
    Header { name: &'static str, value: String },
    Basic { user: String, password: Option<String> },
}


#[derive(Debug, Clone)]
pub struct StoreClientOptions {
    pub timeout: Duration,
    pub max_retries: u32,
    pub pool_max_idle_per_host: usize,
}

impl Default for StoreClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 3,
            pool_max_idle_per_host: 8,
        }
    }
}


/// Pooled JSON-over-HTTP client shared by the vector index and graph store adapters.
pub struct StoreClient {
    store: String,
    base_url: String,
    credentials: Credentials,
    max_retries: u32,
    inner: Client,
}

impl StoreClient {

    pub fn new(
        store: impl Into<String>,
        base_url: &str,
        credentials: Credentials,
        options: StoreClientOptions,
    ) -> Result<Self, StoreError> {
        let store = store.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let inner = Client::builder()
            .timeout(options.timeout)
            .pool_max_idle_per_host(options.pool_max_idle_per_host)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        info!("StoreClient created for {} at {}", store, base_url);

        Ok(Self {
            store,
            base_url,
            credentials,
            max_retries: options.max_retries.max(1),
            inner,
        })
    }


    pub async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let mut last_error = None;
        let mut delay = Duration::from_millis(INITIAL_RETRY_DELAY_MS);

        for attempt in 1..=self.max_retries {
            debug!("POST {}{} on {} (attempt {})", self.base_url, path, self.store, attempt);

            match self.post_once(path, body).await {
                Ok(result) => return Ok(result),
                Err(e) if !e.is_retriable() => return Err(e),
                Err(e) => {
                    debug!("{} request failed (attempt {}): {}", self.store, attempt, e);
                    last_error = Some(e.to_string());

                    if attempt < self.max_retries {
                        tokio::time::sleep(delay).await;
                        delay = (delay * 2).min(Duration::from_millis(MAX_RETRY_DELAY_MS));
                    }
                }
            }
        }

        Err(StoreError::RetryExhausted(
            self.max_retries,
            last_error.unwrap_or_else(|| "Unknown error".to_string()),
        ))
    }

    async fn post_once<T, B>(&self, path: &str, body: &B) -> Result<T, StoreError>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let request = self.inner.post(format!("{}{}", self.base_url, path)).json(body);
        let request = match &self.credentials {
            Credentials::None => request,
            Credentials::Header { name, value } => request.header(*name, value),
            Credentials::Basic { user, password } => request.basic_auth(user, password.as_ref()),
        };

        let response = request.send().await.map_err(StoreError::from_reqwest)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.status_error(status, body));
        }

        let bytes = response.bytes().await.map_err(StoreError::from_reqwest)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn status_error(&self, status: StatusCode, body: String) -> StoreError {
        StoreError::Status {
            store: self.store.clone(),
            status: status.as_u16(),
            body: crate::safe_truncate_ellipsis(&body, 200),
        }
    }


    pub fn base_url(&self) -> &str {
        &self.base_url
    }


    pub fn store(&self) -> &str {
        &self.store
    }
}
