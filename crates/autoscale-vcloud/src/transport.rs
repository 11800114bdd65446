//! HTTP transport boundary.
//!
//! The driver treats HTTP as a black-box RPC primitive:
//! `request(method, url, headers, body) -> (status, headers, body)`.
//! Everything above this seam (discovery, task polling, lifecycle) is
//! exercised in tests against a scripted implementation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::VcloudConfig;
use crate::error::{VcloudError, VcloudResult};

/// Raw response from the provider.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TransportResponse {
    /// Header lookup by (lowercase) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Blocking-free RPC primitive the driver is built on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<String>,
    ) -> VcloudResult<TransportResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &VcloudConfig) -> VcloudResult<Self> {
        let client = Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| VcloudError::connection(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        method: &str,
        url: &str,
        headers: &[(String, String)],
        body: Option<String>,
    ) -> VcloudResult<TransportResponse> {
        let mut req = match method {
            "GET" => self.client.get(url),
            "POST" => self.client.post(url),
            "DELETE" => self.client.delete(url),
            other => {
                return Err(VcloudError::connection(format!(
                    "Unsupported HTTP method: {other}"
                )));
            }
        };
        for (k, v) in headers {
            req = req.header(k.as_str(), v.as_str());
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_ascii_lowercase(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = resp.text().await?;

        Ok(TransportResponse { status, headers, body })
    }
}
