//! Driver configuration and vCloud protocol constants.

use serde::{Deserialize, Serialize};

/// vCloud 1.5 document namespace.
pub const VCLOUD_NS: &str = "http://www.vmware.com/vcloud/v1.5";

/// OVF envelope namespace (template sections reference it).
pub const OVF_NS: &str = "http://schemas.dmtf.org/ovf/envelope/1";

/// Versioned Accept header sent on every request.
pub const XML_VERSION: &str = "application/*+xml;version=5.1";

/// Header the provider returns the session token in.
pub const AUTH_HEADER: &str = "x-vcloud-authorization";

/// Top-level configuration for one driver instance.
///
/// One config + one [`crate::service::VcloudService`] per automation run:
/// the discovery cache and any in-flight task are per-instance state, so
/// concurrent mutation of the same vApp must serialise externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcloudConfig {
    /// Base API URL (e.g. "https://vcd.example.com/api/"). A missing
    /// trailing slash is tolerated and normalised.
    pub api_url: String,
    /// Username, usually "user@org"
    pub username: String,
    /// Password
    pub password: String,
    /// Default organisation; operations that omit an org fall back to this
    #[serde(default)]
    pub org: Option<String>,
    /// Default virtual datacenter
    #[serde(default)]
    pub vdc: Option<String>,
    /// Skip TLS certificate verification (self-signed labs)
    #[serde(default)]
    pub insecure: bool,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Deadline for a single provider task before the driver reports
    /// TimedOut (the task keeps running on the provider)
    #[serde(default = "default_task_timeout")]
    pub task_timeout_secs: u64,
    /// Fixed sleep between task polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Undeploy with a hard powerOff rather than a guest shutdown
    #[serde(default = "default_true")]
    pub power_off_on_undeploy: bool,
}

fn default_request_timeout() -> u64 { 30 }
fn default_task_timeout() -> u64 { 60 }
fn default_poll_interval() -> u64 { 5 }
fn default_true() -> bool { true }

impl VcloudConfig {
    /// Base API URL with a guaranteed trailing slash.
    pub fn normalized_api_url(&self) -> String {
        if self.api_url.ends_with('/') {
            self.api_url.clone()
        } else {
            format!("{}/", self.api_url)
        }
    }
}

impl Default for VcloudConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            username: String::new(),
            password: String::new(),
            org: None,
            vdc: None,
            insecure: false,
            request_timeout_secs: default_request_timeout(),
            task_timeout_secs: default_task_timeout(),
            poll_interval_secs: default_poll_interval(),
            power_off_on_undeploy: true,
        }
    }
}

/// Config without the password, safe to hand to presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcloudConfigSafe {
    pub api_url: String,
    pub username: String,
    pub org: Option<String>,
    pub vdc: Option<String>,
    pub insecure: bool,
}

impl From<&VcloudConfig> for VcloudConfigSafe {
    fn from(c: &VcloudConfig) -> Self {
        Self {
            api_url: c.api_url.clone(),
            username: c.username.clone(),
            org: c.org.clone(),
            vdc: c.vdc.clone(),
            insecure: c.insecure,
        }
    }
}
