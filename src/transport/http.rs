//! `reqwest` transport

use async_trait::async_trait;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

use super::{Transport, TrackingRequest, TransportResponse, DEFAULT_TIMEOUT_MS};
use crate::error::{Error, Result};

/// Transport sending requests over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport enforcing `timeout` on every request
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, timeout })
    }

    /// The per-request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self {
            client: Client::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &TrackingRequest) -> Result<TransportResponse> {
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::internal(format!("Invalid method {}: {}", request.method, e)))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(self.timeout)
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;

        debug!(url = %request.url, status, "Tracking request completed");

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
