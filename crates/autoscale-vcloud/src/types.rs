//! Shared types for the vCloud driver.

use serde::{Deserialize, Serialize};

use crate::xml::Element;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Resource handles
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Levels of the vCloud naming hierarchy. vApps and templates are
/// siblings under a vdc; VMs live under a vApp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Org,
    Vdc,
    VApp,
    Template,
    Network,
    Vm,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Org => "org",
            ResourceKind::Vdc => "vdc",
            ResourceKind::VApp => "vApp",
            ResourceKind::Template => "template",
            ResourceKind::Network => "network",
            ResourceKind::Vm => "vm",
        }
    }
}

/// Opaque handle for a remote object. Immutable once resolved —
/// re-resolution replaces it, nothing mutates it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handle {
    pub name: String,
    pub href: String,
    pub kind: ResourceKind,
}

impl Handle {
    pub fn new(name: impl Into<String>, href: impl Into<String>, kind: ResourceKind) -> Self {
        Self { name: name.into(), href: href.into(), kind }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VM status projection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// IP binding of one VM network connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkIp {
    pub network: String,
    pub ip: Option<String>,
}

/// Read-only projection of a raw VM document. Computed per call, never
/// stored — the numeric→human status mapping is the presentation layer's
/// concern, so the raw provider status string is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmStatus {
    pub name: String,
    /// Raw provider status code (e.g. "4" = powered on, "8" = powered off)
    pub status: String,
    pub deployed: bool,
    pub needs_customization: bool,
    pub ips: Vec<NetworkIp>,
}

impl VmStatus {
    /// Project status fields out of a raw VM document.
    pub fn from_doc(name: &str, doc: &Element) -> Self {
        let ips = doc
            .find_all("NetworkConnection")
            .into_iter()
            .map(|nc| NetworkIp {
                network: nc.attr("network").unwrap_or_default().to_string(),
                ip: nc.find("IpAddress").map(|el| el.text.clone()).filter(|s| !s.is_empty()),
            })
            .collect();

        Self {
            name: name.to_string(),
            status: doc.attr("status").unwrap_or_default().to_string(),
            deployed: doc.attr("deployed") == Some("true"),
            needs_customization: doc.attr("needsCustomization") == Some("true"),
            ips,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Vdc summary
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Names visible under one virtual datacenter (backs `get-vdc-info`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VdcInfo {
    pub name: String,
    pub vapps: Vec<String>,
    pub templates: Vec<String>,
    pub networks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    #[test]
    fn vm_status_projection() {
        let doc = parse_document(
            r#"<Vm xmlns="http://www.vmware.com/vcloud/v1.5" name="vm7"
                   status="4" deployed="true" needsCustomization="false">
                 <NetworkConnectionSection>
                   <NetworkConnection network="net0">
                     <IpAddress>10.0.0.7</IpAddress>
                   </NetworkConnection>
                   <NetworkConnection network="net1"/>
                 </NetworkConnectionSection>
               </Vm>"#,
        )
        .unwrap();

        let status = VmStatus::from_doc("vm7", &doc);
        assert_eq!(status.status, "4");
        assert!(status.deployed);
        assert!(!status.needs_customization);
        assert_eq!(status.ips.len(), 2);
        assert_eq!(status.ips[0].network, "net0");
        assert_eq!(status.ips[0].ip.as_deref(), Some("10.0.0.7"));
        assert_eq!(status.ips[1].ip, None);
    }

    #[test]
    fn vm_status_serialises_camel_case() {
        let status = VmStatus {
            name: "vm7".into(),
            status: "8".into(),
            deployed: false,
            needs_customization: true,
            ips: vec![],
        };
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("needsCustomization"));
    }
}
