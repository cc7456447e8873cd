use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::domain::ports::{HttpClient, HttpClientError};

use super::circuit_breaker::{CircuitBreaker, CircuitBreakerError};

impl From<reqwest::Error> for HttpClientError {
    fn from(e: reqwest::Error) -> Self {
        HttpClientError::Transport(e.to_string())
    }
}

/// Plain JSON `POST` client rooted at a base URL.
///
/// Anything other than a 2xx answer is an error; timeouts surface as
/// transport errors.
pub struct ReqwestClient {
    base_url: String,
    http: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, HttpClientError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpClientError> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("POST {}", url);

        let resp = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(HttpClientError::UnexpectedStatus(status.as_u16()));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

/// Routes every call of the inner client through a shared circuit breaker.
pub struct ResilientClient<C> {
    inner: C,
    breaker: Arc<CircuitBreaker>,
}

impl<C: HttpClient> ResilientClient<C> {
    pub fn new(inner: C, breaker: Arc<CircuitBreaker>) -> Self {
        Self { inner, breaker }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ResilientClient<C> {
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpClientError> {
        self.breaker
            .call(|| self.inner.post(path, body))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open => HttpClientError::CircuitOpen,
                CircuitBreakerError::TooManyRequests => HttpClientError::TooManyRequests,
                CircuitBreakerError::OperationFailed(e) => e,
            })
    }
}
