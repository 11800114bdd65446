//! VM lifecycle orchestration: resolve → build → submit → poll → verify.
//!
//! Each call runs start-to-finish on one controller; the design assumes at
//! most one in-flight mutation per vApp, serialised by the caller. No
//! partial-state rollback is attempted — if the recompose lands but the
//! dependent power-on fails, the VM is present-but-off and observable via
//! `get_status`.

use tokio::time::Duration;

use crate::client::VcloudClient;
use crate::config::VcloudConfig;
use crate::error::VcloudResult;
use crate::inventory::Inventory;
use crate::recompose::{
    build_undeploy, RecomposeBuilder, UndeployAction, RECOMPOSE_CONTENT_TYPE,
    UNDEPLOY_CONTENT_TYPE,
};
use crate::task::{TaskController, TaskOutcome};
use crate::types::{Handle, ResourceKind, VmStatus};

/// Three-way result of one lifecycle call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Succeeded,
    /// A task reached terminal error; the provider's raw status string and
    /// message are attached for diagnostics.
    Failed { status: String, message: String },
    /// A task outlived the deadline while still running. Not a failure:
    /// the mutation may yet land, and the caller observes it later.
    TimedOut,
}

impl From<TaskOutcome> for LifecycleOutcome {
    fn from(outcome: TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Success => LifecycleOutcome::Succeeded,
            TaskOutcome::Error { status, message } => LifecycleOutcome::Failed { status, message },
            TaskOutcome::TimedOut => LifecycleOutcome::TimedOut,
        }
    }
}

/// Orchestrates cache resolution, request building and task polling for
/// one lifecycle call at a time.
pub struct LifecycleController<'a> {
    client: &'a VcloudClient,
    inventory: &'a mut Inventory,
    poll_interval: Duration,
    task_timeout: Duration,
    undeploy_action: UndeployAction,
}

impl<'a> LifecycleController<'a> {
    pub fn new(
        client: &'a VcloudClient,
        inventory: &'a mut Inventory,
        config: &VcloudConfig,
    ) -> Self {
        Self {
            client,
            inventory,
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
            undeploy_action: if config.power_off_on_undeploy {
                UndeployAction::PowerOff
            } else {
                UndeployAction::Shutdown
            },
        }
    }

    // ── Resolution helpers ──────────────────────────────────────────

    async fn resolve_vdc(&mut self) -> VcloudResult<Handle> {
        let org = self
            .inventory
            .resolve(self.client, ResourceKind::Org, None, None)
            .await?;
        self.inventory
            .resolve(self.client, ResourceKind::Vdc, Some(&org), None)
            .await
    }

    async fn resolve_vapp(&mut self, vapp_name: &str) -> VcloudResult<(Handle, Handle)> {
        let vdc = self.resolve_vdc().await?;
        let vapp = self
            .inventory
            .resolve(self.client, ResourceKind::VApp, Some(&vdc), Some(vapp_name))
            .await?;
        Ok((vdc, vapp))
    }

    async fn resolve_vm(&mut self, vapp_name: &str, vm_name: &str) -> VcloudResult<(Handle, Handle)> {
        let (_vdc, vapp) = self.resolve_vapp(vapp_name).await?;
        let vm = self
            .inventory
            .resolve(self.client, ResourceKind::Vm, Some(&vapp), Some(vm_name))
            .await?;
        Ok((vapp, vm))
    }

    // ── Lifecycle operations ────────────────────────────────────────

    /// Add a VM to a vApp from a template, rebinding it to `network_name`,
    /// then power it on as a dependent task.
    ///
    /// A recompose timeout short-circuits: the power-on is not attempted
    /// and the caller gets `TimedOut` for the whole call.
    pub async fn add_vm(
        &mut self,
        vapp_name: &str,
        template_name: &str,
        network_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let (vdc, vapp) = self.resolve_vapp(vapp_name).await?;
        let template = self
            .inventory
            .resolve(self.client, ResourceKind::Template, Some(&vdc), Some(template_name))
            .await?;
        let network = self
            .inventory
            .resolve(self.client, ResourceKind::Network, Some(&vdc), Some(network_name))
            .await?;

        let template_doc = self.inventory.fetch_doc(self.client, &template).await?;
        let network_doc = self.inventory.fetch_doc(self.client, &network).await?;

        let body = RecomposeBuilder::new()
            .with_template(template_doc)
            .with_network(&network.name, network_doc)
            .build_add(vm_name)?;

        let tasks = TaskController::new(self.client, self.poll_interval);
        let task = tasks
            .submit(
                &format!("{}/action/recomposeVApp", vapp.href),
                Some(RECOMPOSE_CONTENT_TYPE),
                Some(body),
                "recompose vApp",
            )
            .await?;

        match tasks.await_completion(task, self.task_timeout).await? {
            TaskOutcome::Success => {}
            other => return Ok(other.into()),
        }

        // the vApp topology changed under the cache: re-discover the VM
        // level before the dependent power-on
        self.inventory.invalidate(ResourceKind::Vm, Some(&vapp));
        let vm = self
            .inventory
            .resolve(self.client, ResourceKind::Vm, Some(&vapp), Some(vm_name))
            .await?;

        let power_on = tasks
            .submit(
                &format!("{}/power/action/powerOn", vm.href),
                None,
                None,
                "power on",
            )
            .await?;
        let outcome = tasks.await_completion(power_on, self.task_timeout).await?;
        Ok(outcome.into())
    }

    /// Remove a VM from a vApp. The VM is undeployed first — removing a
    /// deployed VM from the topology is rejected by the provider — and the
    /// recompose is only submitted once the undeploy ends in success.
    pub async fn remove_vm(
        &mut self,
        vapp_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let (vapp, vm) = self.resolve_vm(vapp_name, vm_name).await?;

        let tasks = TaskController::new(self.client, self.poll_interval);
        let undeploy = tasks
            .submit(
                &format!("{}/action/undeploy", vm.href),
                Some(UNDEPLOY_CONTENT_TYPE),
                Some(build_undeploy(self.undeploy_action)?),
                "undeploy",
            )
            .await?;
        match tasks.await_completion(undeploy, self.task_timeout).await? {
            TaskOutcome::Success => {}
            other => return Ok(other.into()),
        }

        let body = RecomposeBuilder::new().build_remove(&vm.href)?;
        let task = tasks
            .submit(
                &format!("{}/action/recomposeVApp", vapp.href),
                Some(RECOMPOSE_CONTENT_TYPE),
                Some(body),
                "recompose vApp",
            )
            .await?;
        let outcome = tasks.await_completion(task, self.task_timeout).await?;

        if outcome == TaskOutcome::Success {
            self.inventory.invalidate(ResourceKind::Vm, Some(&vapp));
        }
        Ok(outcome.into())
    }

    /// Power a VM on as a single task.
    pub async fn power_on(
        &mut self,
        vapp_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let (_vapp, vm) = self.resolve_vm(vapp_name, vm_name).await?;
        let tasks = TaskController::new(self.client, self.poll_interval);
        let task = tasks
            .submit(
                &format!("{}/power/action/powerOn", vm.href),
                None,
                None,
                "power on",
            )
            .await?;
        let outcome = tasks.await_completion(task, self.task_timeout).await?;
        Ok(outcome.into())
    }

    /// Undeploy (power off) a VM as a single task.
    pub async fn shutdown(
        &mut self,
        vapp_name: &str,
        vm_name: &str,
    ) -> VcloudResult<LifecycleOutcome> {
        let (_vapp, vm) = self.resolve_vm(vapp_name, vm_name).await?;
        let tasks = TaskController::new(self.client, self.poll_interval);
        let task = tasks
            .submit(
                &format!("{}/action/undeploy", vm.href),
                Some(UNDEPLOY_CONTENT_TYPE),
                Some(build_undeploy(self.undeploy_action)?),
                "undeploy",
            )
            .await?;
        let outcome = tasks.await_completion(task, self.task_timeout).await?;
        Ok(outcome.into())
    }

    // ── Status ──────────────────────────────────────────────────────

    /// Project the live status of one VM. Handle resolution goes through
    /// the cache; the VM document itself is always re-fetched, since the
    /// memo is never authoritative after a mutation.
    pub async fn vm_status(&mut self, vapp_name: &str, vm_name: &str) -> VcloudResult<VmStatus> {
        let (_vapp, vm) = self.resolve_vm(vapp_name, vm_name).await?;
        let doc = self.client.get_doc(&vm.href).await?;
        Ok(VmStatus::from_doc(&vm.name, &doc))
    }

    /// Project the live status of every VM in a vApp.
    pub async fn vapp_status(&mut self, vapp_name: &str) -> VcloudResult<Vec<VmStatus>> {
        let (_vdc, vapp) = self.resolve_vapp(vapp_name).await?;
        let vms = self
            .inventory
            .list(self.client, ResourceKind::Vm, Some(&vapp))
            .await?;

        let mut statuses = Vec::with_capacity(vms.len());
        for vm in vms {
            let doc = self.client.get_doc(&vm.href).await?;
            statuses.push(VmStatus::from_doc(&vm.name, &doc));
        }
        Ok(statuses)
    }
}
