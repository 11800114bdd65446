//! Lazily-populated discovery cache over the vCloud naming hierarchy
//! (org → vdc → vApp → {template, network} → vm).
//!
//! One generic `resolve(kind, parent, name)` entry point: the first resolve
//! at a level scans the parent's document once and populates *all* siblings;
//! later resolves at that level are pure lookups. The cache is a memo, never
//! authoritative after a mutation — callers invalidate the affected level
//! explicitly, nothing expires on its own.

use std::collections::HashMap;

use crate::client::VcloudClient;
use crate::error::{VcloudError, VcloudResult};
use crate::types::{Handle, ResourceKind};
use crate::xml::Element;

const ORG_MEDIA: &str = "application/vnd.vmware.vcloud.org+xml";
const VDC_MEDIA: &str = "application/vnd.vmware.vcloud.vdc+xml";
const VAPP_MEDIA: &str = "application/vnd.vmware.vcloud.vApp+xml";
const TEMPLATE_MEDIA: &str = "application/vnd.vmware.vcloud.vAppTemplate+xml";
const NETWORK_MEDIA: &str = "application/vnd.vmware.vcloud.network+xml";

/// Name→handle cache, one sibling map per (level, parent href), plus raw
/// fetched documents keyed by href for attribute lookups.
pub struct Inventory {
    default_org: Option<String>,
    default_vdc: Option<String>,
    session_doc: Option<Element>,
    siblings: HashMap<(ResourceKind, String), HashMap<String, Handle>>,
    docs: HashMap<String, Element>,
}

impl Inventory {
    pub fn new(default_org: Option<String>, default_vdc: Option<String>) -> Self {
        Self {
            default_org,
            default_vdc,
            session_doc: None,
            siblings: HashMap::new(),
            docs: HashMap::new(),
        }
    }

    /// Install the session document — the root the org level is scanned
    /// from. Resets all cached state from any previous session.
    pub fn set_session_doc(&mut self, doc: Element) {
        self.session_doc = Some(doc);
        self.siblings.clear();
        self.docs.clear();
    }

    /// Drop everything, session included.
    pub fn clear(&mut self) {
        self.session_doc = None;
        self.siblings.clear();
        self.docs.clear();
    }

    // ── Resolution ──────────────────────────────────────────────────

    /// Resolve `name` at `kind` under `parent`, discovering the level on
    /// first use. `name` may be omitted for org/vdc when a default was
    /// configured.
    pub async fn resolve(
        &mut self,
        client: &VcloudClient,
        kind: ResourceKind,
        parent: Option<&Handle>,
        name: Option<&str>,
    ) -> VcloudResult<Handle> {
        let wanted = self.effective_name(kind, name)?.to_string();
        self.ensure_level(client, kind, parent).await?;

        let key = (kind, parent_key(parent));
        self.siblings
            .get(&key)
            .and_then(|map| map.get(&wanted))
            .cloned()
            .ok_or_else(|| {
                VcloudError::not_found(format!("Unknown {}: {}", kind.as_str(), wanted))
            })
    }

    /// All handles at `kind` under `parent`, discovering on first use.
    pub async fn list(
        &mut self,
        client: &VcloudClient,
        kind: ResourceKind,
        parent: Option<&Handle>,
    ) -> VcloudResult<Vec<Handle>> {
        self.ensure_level(client, kind, parent).await?;
        let key = (kind, parent_key(parent));
        let mut handles: Vec<Handle> = self
            .siblings
            .get(&key)
            .map(|map| map.values().cloned().collect())
            .unwrap_or_default();
        handles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(handles)
    }

    /// Drop one level's sibling map, the cached documents of its members,
    /// and the parent document the level was scanned from. The next
    /// resolve re-discovers from a fresh fetch.
    pub fn invalidate(&mut self, kind: ResourceKind, parent: Option<&Handle>) {
        let pkey = parent_key(parent);
        if let Some(map) = self.siblings.remove(&(kind, pkey.clone())) {
            for handle in map.values() {
                self.docs.remove(&handle.href);
            }
        }
        // vApps and templates are scanned out of the same vdc document
        if matches!(kind, ResourceKind::VApp | ResourceKind::Template) {
            let twin = if kind == ResourceKind::VApp {
                ResourceKind::Template
            } else {
                ResourceKind::VApp
            };
            self.siblings.remove(&(twin, pkey.clone()));
        }
        if !pkey.is_empty() {
            self.docs.remove(&pkey);
        }
        log::debug!("invalidated {} level under {:?}", kind.as_str(), pkey);
    }

    /// Fetch (and memoise) the raw document behind a resolved handle.
    pub async fn fetch_doc(
        &mut self,
        client: &VcloudClient,
        handle: &Handle,
    ) -> VcloudResult<Element> {
        self.ensure_doc(client, &handle.href).await
    }

    /// Cached document lookup, no fetch.
    pub fn cached_doc(&self, href: &str) -> Option<&Element> {
        self.docs.get(href)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn effective_name<'a>(
        &'a self,
        kind: ResourceKind,
        name: Option<&'a str>,
    ) -> VcloudResult<&'a str> {
        if let Some(name) = name {
            return Ok(name);
        }
        match kind {
            ResourceKind::Org => self.default_org.as_deref().ok_or_else(|| {
                VcloudError::configuration("No default org configured and none was provided")
            }),
            ResourceKind::Vdc => self.default_vdc.as_deref().ok_or_else(|| {
                VcloudError::configuration("No default vdc configured and none was provided")
            }),
            other => Err(VcloudError::configuration(format!(
                "A {} name is required",
                other.as_str()
            ))),
        }
    }

    async fn ensure_doc(&mut self, client: &VcloudClient, href: &str) -> VcloudResult<Element> {
        if let Some(doc) = self.docs.get(href) {
            return Ok(doc.clone());
        }
        let doc = client.get_doc(href).await?;
        self.docs.insert(href.to_string(), doc.clone());
        Ok(doc)
    }

    async fn ensure_level(
        &mut self,
        client: &VcloudClient,
        kind: ResourceKind,
        parent: Option<&Handle>,
    ) -> VcloudResult<()> {
        let pkey = parent_key(parent);
        if self.siblings.contains_key(&(kind, pkey.clone())) {
            return Ok(());
        }
        log::debug!("discovering {} level under {:?}", kind.as_str(), pkey);

        match kind {
            ResourceKind::Org => {
                let session = self.session_doc.as_ref().ok_or_else(|| {
                    VcloudError::configuration("Not logged in — call connect first")
                })?;
                let orgs = scan_links(session, ORG_MEDIA, ResourceKind::Org);
                self.siblings.insert((kind, pkey), orgs);
            }
            ResourceKind::Vdc => {
                let parent = require_parent(kind, parent)?;
                let doc = self.ensure_doc(client, &parent.href).await?;
                let vdcs = scan_links(&doc, VDC_MEDIA, ResourceKind::Vdc);
                self.siblings.insert((kind, pkey), vdcs);
            }
            ResourceKind::VApp | ResourceKind::Template => {
                let parent = require_parent(kind, parent)?;
                let doc = self.ensure_doc(client, &parent.href).await?;
                let (vapps, templates) = scan_resource_entities(&doc);
                self.siblings.insert((ResourceKind::VApp, pkey.clone()), vapps);
                self.siblings.insert((ResourceKind::Template, pkey), templates);
            }
            ResourceKind::Network => {
                let parent = require_parent(kind, parent)?;
                let doc = self.ensure_doc(client, &parent.href).await?;
                let networks = scan_networks(&doc);
                self.siblings.insert((kind, pkey), networks);
            }
            ResourceKind::Vm => {
                let parent = require_parent(kind, parent)?;
                let doc = self.ensure_doc(client, &parent.href).await?;
                let vms = scan_vms(&doc);
                self.siblings.insert((kind, pkey), vms);
            }
        }
        Ok(())
    }
}

fn parent_key(parent: Option<&Handle>) -> String {
    parent.map(|h| h.href.clone()).unwrap_or_default()
}

fn require_parent<'a>(kind: ResourceKind, parent: Option<&'a Handle>) -> VcloudResult<&'a Handle> {
    parent.ok_or_else(|| {
        VcloudError::configuration(format!(
            "Resolving a {} requires a resolved parent handle",
            kind.as_str()
        ))
    })
}

// ── Discovery scans ─────────────────────────────────────────────────

fn scan_links(doc: &Element, media_type: &str, kind: ResourceKind) -> HashMap<String, Handle> {
    let mut map = HashMap::new();
    for link in doc.find_all("Link") {
        if link.attr("type") != Some(media_type) {
            continue;
        }
        if let (Some(name), Some(href)) = (link.attr("name"), link.attr("href")) {
            map.insert(name.to_string(), Handle::new(name, href, kind));
        }
    }
    map
}

fn scan_resource_entities(
    doc: &Element,
) -> (HashMap<String, Handle>, HashMap<String, Handle>) {
    let mut vapps = HashMap::new();
    let mut templates = HashMap::new();
    for entity in doc.find_all("ResourceEntity") {
        let (name, href) = match (entity.attr("name"), entity.attr("href")) {
            (Some(n), Some(h)) => (n, h),
            _ => continue,
        };
        match entity.attr("type") {
            Some(VAPP_MEDIA) => {
                vapps.insert(name.to_string(), Handle::new(name, href, ResourceKind::VApp));
            }
            Some(TEMPLATE_MEDIA) => {
                templates.insert(
                    name.to_string(),
                    Handle::new(name, href, ResourceKind::Template),
                );
            }
            _ => {}
        }
    }
    (vapps, templates)
}

fn scan_networks(doc: &Element) -> HashMap<String, Handle> {
    let mut map = HashMap::new();
    for net in doc.find_all("Network") {
        if net.attr("type") != Some(NETWORK_MEDIA) {
            continue;
        }
        if let (Some(name), Some(href)) = (net.attr("name"), net.attr("href")) {
            map.insert(name.to_string(), Handle::new(name, href, ResourceKind::Network));
        }
    }
    map
}

fn scan_vms(doc: &Element) -> HashMap<String, Handle> {
    let mut map = HashMap::new();
    for vm in doc.find_all("Vm") {
        if let (Some(name), Some(href)) = (vm.attr("name"), vm.attr("href")) {
            map.insert(name.to_string(), Handle::new(name, href, ResourceKind::Vm));
        }
    }
    map
}
