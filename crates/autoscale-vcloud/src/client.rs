//! Authenticated vCloud Director API client.
//!
//! Owns the session token and the versioned Accept header, and exposes the
//! two calls the rest of the driver needs: fetch-and-parse a document by
//! href, and POST a mutation body.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::sync::Arc;

use crate::config::{VcloudConfig, AUTH_HEADER, XML_VERSION};
use crate::error::{VcloudError, VcloudResult};
use crate::transport::{Transport, TransportResponse};
use crate::xml::{self, Element};

/// vCloud REST/XML client.
pub struct VcloudClient {
    transport: Arc<dyn Transport>,
    api_url: String,
    username: String,
    password: String,
    token: Option<String>,
}

impl VcloudClient {
    /// Build a client from config (does NOT create a session yet).
    pub fn new(config: &VcloudConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            api_url: config.normalized_api_url(),
            username: config.username.clone(),
            password: config.password.clone(),
            token: None,
        }
    }

    /// Base API URL (trailing slash guaranteed).
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Whether we hold a session token.
    pub fn is_connected(&self) -> bool {
        self.token.is_some()
    }

    // ── Session management ──────────────────────────────────────────

    /// Create a session (POST {api}sessions with basic auth) and return the
    /// session document — the root of the naming hierarchy.
    pub async fn login(&mut self) -> VcloudResult<Element> {
        let url = format!("{}sessions", self.api_url);
        let credentials = BASE64.encode(format!("{}:{}", self.username, self.password));
        let headers = vec![
            ("Accept".to_string(), XML_VERSION.to_string()),
            ("Authorization".to_string(), format!("Basic {credentials}")),
        ];

        let resp = self.transport.request("POST", &url, &headers, None).await?;
        if resp.status != 200 {
            return Err(VcloudError::auth(format!(
                "Authentication failed: HTTP {}",
                resp.status
            )));
        }

        let token = resp
            .header(AUTH_HEADER)
            .ok_or_else(|| VcloudError::auth("Login response carried no session token"))?
            .to_string();
        self.token = Some(token);

        xml::parse_document(&resp.body)
    }

    /// Drop the session token. The provider side expires on its own.
    pub fn logout(&mut self) {
        self.token = None;
    }

    // ── HTTP helpers ────────────────────────────────────────────────

    fn session_headers(&self, content_type: Option<&str>) -> VcloudResult<Vec<(String, String)>> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| VcloudError::configuration("Not logged in — call connect first"))?;
        let mut headers = vec![
            ("Accept".to_string(), XML_VERSION.to_string()),
            (AUTH_HEADER.to_string(), token.to_string()),
        ];
        if let Some(ct) = content_type {
            headers.push(("Content-Type".to_string(), ct.to_string()));
        }
        Ok(headers)
    }

    /// GET an href and parse the XML body. Non-200 is an API error.
    pub async fn get_doc(&self, href: &str) -> VcloudResult<Element> {
        let headers = self.session_headers(None)?;
        let resp = self.transport.request("GET", href, &headers, None).await?;
        if resp.status != 200 {
            return Err(VcloudError::api(
                resp.status,
                format!("GET {href} failed: HTTP {} — {}", resp.status, resp.body),
            ));
        }
        xml::parse_document(&resp.body)
    }

    /// POST a mutation body. Status interpretation is the caller's
    /// (task submission expects 202 Accepted).
    pub async fn post(
        &self,
        href: &str,
        content_type: Option<&str>,
        body: Option<String>,
    ) -> VcloudResult<TransportResponse> {
        let headers = self.session_headers(content_type)?;
        self.transport.request("POST", href, &headers, body).await
    }
}
