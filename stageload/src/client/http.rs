//! HTTP GET executor backed by reqwest

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Url};

use super::service::RequestExecutor;
use super::types::TransportError;
use crate::check::RequestOutcome;
use crate::config::{ConfigError, RequestConfig};

/// Idle connections kept per host; one per virtual user is plenty
const POOL_MAX_IDLE_PER_HOST: usize = 256;

/// Issues one GET against a fixed target per iteration
///
/// The underlying client is shared by every virtual user, so connections are
/// pooled across the whole run.
pub struct HttpExecutor {
    client: Client,
    url: Url,
    timeout: Duration,
}

impl HttpExecutor {
    /// Build the executor; fails on an invalid URL, header or client setup
    pub fn new(config: &RequestConfig) -> Result<Self, ConfigError> {
        let url = config.parse_url()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name =
                HeaderName::from_bytes(name.as_bytes()).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            let header_value =
                HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            headers.insert(header_name, header_value);
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url,
            timeout: config.timeout,
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else if err.is_connect() {
            TransportError::Connect(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self) -> Result<RequestOutcome, TransportError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let mut outcome = RequestOutcome::new(response.status().as_u16());
        for (name, value) in response.headers() {
            // Non-UTF-8 bytes become U+FFFD so checks still see the header
            outcome.insert_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        // Drain the body so the connection can go back to the pool
        response.bytes().await.map_err(|e| self.classify(e))?;

        Ok(outcome)
    }
}
