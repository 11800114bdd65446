//! Builders for the provider's declarative mutation documents.
//!
//! Pure transforms over already-resolved handles and already-fetched
//! documents — no I/O here, and never an in-place edit of a cached tree:
//! the template's NetworkConnectionSection is cloned before its network
//! binding is rewritten, so the same cached template can back later calls.

use crate::config::{OVF_NS, VCLOUD_NS};
use crate::error::{VcloudError, VcloudResult};
use crate::xml::Element;

/// Content type for recomposeVApp submissions.
pub const RECOMPOSE_CONTENT_TYPE: &str =
    "application/vnd.vmware.vcloud.recomposeVAppParams+xml";

/// Content type for undeploy submissions.
pub const UNDEPLOY_CONTENT_TYPE: &str =
    "application/vnd.vmware.vcloud.undeployVAppParams+xml";

/// Power action carried in an UndeployVAppParams body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndeployAction {
    /// Hard power off before undeploy
    PowerOff,
    /// Ask the guest to shut down
    Shutdown,
}

impl UndeployAction {
    fn as_str(&self) -> &'static str {
        match self {
            UndeployAction::PowerOff => "powerOff",
            UndeployAction::Shutdown => "shutdown",
        }
    }
}

/// Assembles RecomposeVAppParams documents. The lifecycle controller feeds
/// it the prerequisite documents before asking for a build; building
/// without them is a `MissingDependency` error, never a silent re-fetch.
#[derive(Default)]
pub struct RecomposeBuilder {
    description: String,
    template_doc: Option<Element>,
    network: Option<String>,
}

impl RecomposeBuilder {
    pub fn new() -> Self {
        Self {
            description: "Recompose VApp".to_string(),
            template_doc: None,
            network: None,
        }
    }

    /// Supply the fetched template document the new VM is sourced from.
    pub fn with_template(mut self, doc: Element) -> Self {
        self.template_doc = Some(doc);
        self
    }

    /// Supply the target network. The network document itself contributes
    /// nothing to the payload but proves the caller resolved and fetched
    /// the network before building.
    pub fn with_network(mut self, name: impl Into<String>, _doc: Element) -> Self {
        self.network = Some(name.into());
        self
    }

    /// Build an add-VM-from-template document. The template's embedded
    /// network binding is discarded and replaced with the supplied network.
    pub fn build_add(&self, vm_name: &str) -> VcloudResult<String> {
        let template = self.template_doc.as_ref().ok_or_else(|| {
            VcloudError::missing_dependency("Template has not been fetched before build")
        })?;
        let network = self.network.as_deref().ok_or_else(|| {
            VcloudError::missing_dependency("Network has not been fetched before build")
        })?;

        let source_href = template
            .find("Vm")
            .and_then(|vm| vm.attr("href"))
            .ok_or_else(|| {
                VcloudError::missing_dependency("Template document carries no Vm source")
            })?
            .to_string();

        let mut net_section = template
            .find("NetworkConnectionSection")
            .cloned()
            .ok_or_else(|| {
                VcloudError::missing_dependency(
                    "Template document carries no NetworkConnectionSection",
                )
            })?;
        net_section
            .find_mut("NetworkConnection")
            .ok_or_else(|| {
                VcloudError::missing_dependency("Template document carries no NetworkConnection")
            })?
            .set_attr("network", network);

        let mut source = Element::new("Source");
        source.set_attr("href", source_href);
        source.set_attr("name", vm_name);

        let mut inst_params = Element::new("InstantiationParams");
        inst_params.children.push(net_section);

        let mut sourced_item = Element::new("SourcedItem");
        sourced_item.children.push(source);
        sourced_item.children.push(inst_params);

        let mut root = self.params_root();
        root.children.push(sourced_item);
        root.to_xml()
    }

    /// Build a remove-VM document: a DeleteItem referencing the target VM
    /// locator and nothing else.
    pub fn build_remove(&self, vm_href: &str) -> VcloudResult<String> {
        let mut delete = Element::new("DeleteItem");
        delete.set_attr("href", vm_href);

        let mut root = self.params_root();
        root.children.push(delete);
        root.to_xml()
    }

    fn params_root(&self) -> Element {
        let mut root = Element::new("RecomposeVAppParams");
        root.set_attr("xmlns", VCLOUD_NS);
        root.set_attr("xmlns:ovf", OVF_NS);
        let mut desc = Element::new("Description");
        desc.text = self.description.clone();
        root.children.push(desc);
        root
    }
}

/// Build the UndeployVAppParams action body.
pub fn build_undeploy(action: UndeployAction) -> VcloudResult<String> {
    let mut power_action = Element::new("UndeployPowerAction");
    power_action.text = action.as_str().to_string();

    let mut root = Element::new("UndeployVAppParams");
    root.set_attr("xmlns", VCLOUD_NS);
    root.children.push(power_action);
    root.to_xml()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use crate::xml::parse_document;

    fn template() -> Element {
        parse_document(fixtures::TEMPLATE_DOC).unwrap()
    }

    fn network() -> Element {
        parse_document(fixtures::NETWORK_DOC).unwrap()
    }

    #[test]
    fn build_add_without_template_is_missing_dependency() {
        let builder = RecomposeBuilder::new().with_network("net0", network());
        let err = builder.build_add("vm7").unwrap_err();
        assert_eq!(err.kind, crate::error::VcloudErrorKind::MissingDependency);
    }

    #[test]
    fn build_add_without_network_is_missing_dependency() {
        let builder = RecomposeBuilder::new().with_template(template());
        let err = builder.build_add("vm7").unwrap_err();
        assert_eq!(err.kind, crate::error::VcloudErrorKind::MissingDependency);
    }

    #[test]
    fn build_add_rewrites_network_binding() {
        let builder = RecomposeBuilder::new()
            .with_template(template())
            .with_network("net0", network());
        let xml = builder.build_add("vm7").unwrap();

        let doc = parse_document(&xml).unwrap();
        assert_eq!(doc.local_name(), "RecomposeVAppParams");

        let source = doc.find("Source").unwrap();
        assert_eq!(source.attr("name"), Some("vm7"));
        assert_eq!(source.attr("href"), Some(fixtures::TEMPLATE_VM_HREF));

        // the template's original binding ("tmpl-net") must be gone
        let nc = doc.find("NetworkConnection").unwrap();
        assert_eq!(nc.attr("network"), Some("net0"));
        assert!(!xml.contains("tmpl-net"));
    }

    #[test]
    fn build_add_leaves_cached_template_untouched() {
        let template_doc = template();
        let original = template_doc.clone();
        let builder = RecomposeBuilder::new()
            .with_template(template_doc.clone())
            .with_network("net0", network());
        builder.build_add("vm7").unwrap();
        assert_eq!(template_doc, original);
        assert_eq!(
            template_doc.find("NetworkConnection").unwrap().attr("network"),
            Some("tmpl-net")
        );
    }

    #[test]
    fn build_remove_carries_only_delete_item() {
        let xml = RecomposeBuilder::new().build_remove(fixtures::VM_HREF).unwrap();
        let doc = parse_document(&xml).unwrap();
        let delete = doc.find("DeleteItem").unwrap();
        assert_eq!(delete.attr("href"), Some(fixtures::VM_HREF));
        assert!(doc.find("SourcedItem").is_none());
        assert!(doc.find("Source").is_none());
    }

    #[test]
    fn undeploy_body_power_actions() {
        let hard = build_undeploy(UndeployAction::PowerOff).unwrap();
        assert!(hard.contains("powerOff"));
        let soft = build_undeploy(UndeployAction::Shutdown).unwrap();
        assert!(soft.contains("shutdown"));
        let doc = parse_document(&hard).unwrap();
        assert_eq!(doc.local_name(), "UndeployVAppParams");
        assert_eq!(doc.find("UndeployPowerAction").unwrap().text, "powerOff");
    }
}
