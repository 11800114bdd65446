//! Driver façade: one connected session plus its discovery cache, exposing
//! the lifecycle and inspection operations as a single surface.
//!
//! One instance per automation run. Operations take `&mut self` — the cache
//! is per-instance state and mutations of the same vApp must serialise here.

use std::sync::Arc;

use crate::client::VcloudClient;
use crate::config::{VcloudConfig, VcloudConfigSafe};
use crate::error::{VcloudError, VcloudResult};
use crate::inventory::Inventory;
use crate::lifecycle::{LifecycleController, LifecycleOutcome};
use crate::transport::{HttpTransport, Transport};
use crate::types::{Handle, ResourceKind, VdcInfo, VmStatus};

/// Connected vCloud driver instance.
pub struct VcloudService {
    config: VcloudConfig,
    client: Option<VcloudClient>,
    inventory: Inventory,
}

fn require_client(client: &Option<VcloudClient>) -> VcloudResult<&VcloudClient> {
    client
        .as_ref()
        .ok_or_else(|| VcloudError::configuration("Not connected — call connect first"))
}

impl VcloudService {
    pub fn new(config: VcloudConfig) -> Self {
        let inventory = Inventory::new(config.org.clone(), config.vdc.clone());
        Self { config, client: None, inventory }
    }

    // ── Session ─────────────────────────────────────────────────────

    /// Log in over a real HTTP transport and seed the discovery cache with
    /// the session document.
    pub async fn connect(&mut self) -> VcloudResult<()> {
        let transport = Arc::new(HttpTransport::new(&self.config)?);
        self.connect_with_transport(transport).await
    }

    /// Log in over a caller-supplied transport.
    pub async fn connect_with_transport(
        &mut self,
        transport: Arc<dyn Transport>,
    ) -> VcloudResult<()> {
        let mut client = VcloudClient::new(&self.config, transport);
        let session = client.login().await?;
        log::info!("connected to {} as {}", client.api_url(), self.config.username);
        self.inventory.set_session_doc(session);
        self.client = Some(client);
        Ok(())
    }

    /// Drop the session and every cached handle.
    pub fn disconnect(&mut self) {
        if let Some(client) = self.client.as_mut() {
            client.logout();
        }
        self.client = None;
        self.inventory.clear();
        log::info!("disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.client.as_ref().map(|c| c.is_connected()).unwrap_or(false)
    }

    /// Config with the password stripped.
    pub fn safe_config(&self) -> VcloudConfigSafe {
        VcloudConfigSafe::from(&self.config)
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    pub async fn add_vm(
        &mut self,
        vapp_name: &str,
        template_name: &str,
        network_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let client = require_client(&self.client)?;
        LifecycleController::new(client, &mut self.inventory, &self.config)
            .add_vm(vapp_name, template_name, network_name, vm_name)
            .await
    }

    pub async fn remove_vm(
        &mut self,
        vapp_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let client = require_client(&self.client)?;
        LifecycleController::new(client, &mut self.inventory, &self.config)
            .remove_vm(vapp_name, vm_name)
            .await
    }

    pub async fn power_on(
        &mut self,
        vapp_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let client = require_client(&self.client)?;
        LifecycleController::new(client, &mut self.inventory, &self.config)
            .power_on(vapp_name, vm_name)
            .await
    }

    pub async fn shutdown(
        &mut self,
        vapp_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let client = require_client(&self.client)?;
        LifecycleController::new(client, &mut self.inventory, &self.config)
            .shutdown(vapp_name, vm_name)
            .await
    }

    // ── Status ──────────────────────────────────────────────────────

    pub async fn vm_status(&mut self, vapp_name: &str, vm_name: &str) -> VcloudResult<VmStatus> {
        let client = require_client(&self.client)?;
        LifecycleController::new(client, &mut self.inventory, &self.config)
            .vm_status(vapp_name, vm_name)
            .await
    }

    pub async fn vapp_status(&mut self, vapp_name: &str) -> VcloudResult<Vec<VmStatus>> {
        let client = require_client(&self.client)?;
        LifecycleController::new(client, &mut self.inventory, &self.config)
            .vapp_status(vapp_name)
            .await
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub async fn list_orgs(&mut self) -> VcloudResult<Vec<Handle>> {
        let client = require_client(&self.client)?;
        self.inventory.list(client, ResourceKind::Org, None).await
    }

    pub async fn list_vdcs(&mut self) -> VcloudResult<Vec<Handle>> {
        let client = require_client(&self.client)?;
        let org = self.inventory.resolve(client, ResourceKind::Org, None, None).await?;
        self.inventory.list(client, ResourceKind::Vdc, Some(&org)).await
    }

    pub async fn list_vapps(&mut self) -> VcloudResult<Vec<Handle>> {
        let vdc = self.resolve_vdc().await?;
        let client = require_client(&self.client)?;
        self.inventory.list(client, ResourceKind::VApp, Some(&vdc)).await
    }

    pub async fn list_templates(&mut self) -> VcloudResult<Vec<Handle>> {
        let vdc = self.resolve_vdc().await?;
        let client = require_client(&self.client)?;
        self.inventory.list(client, ResourceKind::Template, Some(&vdc)).await
    }

    pub async fn list_networks(&mut self) -> VcloudResult<Vec<Handle>> {
        let vdc = self.resolve_vdc().await?;
        let client = require_client(&self.client)?;
        self.inventory.list(client, ResourceKind::Network, Some(&vdc)).await
    }

    pub async fn list_vms(&mut self, vapp_name: &str) -> VcloudResult<Vec<Handle>> {
        let vdc = self.resolve_vdc().await?;
        let client = require_client(&self.client)?;
        let vapp = self
            .inventory
            .resolve(client, ResourceKind::VApp, Some(&vdc), Some(vapp_name))
            .await?;
        self.inventory.list(client, ResourceKind::Vm, Some(&vapp)).await
    }

    /// Everything visible under the default vdc, by name.
    pub async fn vdc_info(&mut self) -> VcloudResult<VdcInfo> {
        let vdc = self.resolve_vdc().await?;
        let client = require_client(&self.client)?;
        let vapps = self.inventory.list(client, ResourceKind::VApp, Some(&vdc)).await?;
        let templates = self.inventory.list(client, ResourceKind::Template, Some(&vdc)).await?;
        let networks = self.inventory.list(client, ResourceKind::Network, Some(&vdc)).await?;

        Ok(VdcInfo {
            name: vdc.name,
            vapps: vapps.into_iter().map(|h| h.name).collect(),
            templates: templates.into_iter().map(|h| h.name).collect(),
            networks: networks.into_iter().map(|h| h.name).collect(),
        })
    }

    async fn resolve_vdc(&mut self) -> VcloudResult<Handle> {
        let client = require_client(&self.client)?;
        let org = self.inventory.resolve(client, ResourceKind::Org, None, None).await?;
        self.inventory.resolve(client, ResourceKind::Vdc, Some(&org), None).await
    }
}
