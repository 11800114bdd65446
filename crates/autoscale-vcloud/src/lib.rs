//! Elastic-scaling driver for VMware vCloud Director.
//!
//! Adds VMs to and removes VMs from a vApp by recomposition, tracking the
//! provider's asynchronous tasks to completion. All mutation flows share
//! one shape: resolve names against the discovery cache, build a
//! declarative XML document, submit it, poll the returned task.
//!
//! ```text
//!  VcloudService (façade)
//!      │
//!      ├── VcloudClient ──── Transport (reqwest / scripted mock)
//!      │       session token, versioned Accept header
//!      │
//!      ├── Inventory
//!      │       lazy name→handle cache, org → vdc → vApp/template/network → vm
//!      │
//!      └── LifecycleController
//!              ├── RecomposeBuilder   (pure XML document assembly)
//!              └── TaskController     (202-submit, fixed-interval polling)
//! ```
//!
//! The cache is a memo, never authoritative after a mutation: lifecycle
//! flows invalidate the affected level explicitly and re-resolve. A task
//! outliving its deadline is reported as a value (`TimedOut`), not an
//! error — the task keeps running on the provider.

pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod recompose;
pub mod service;
pub mod task;
pub mod transport;
pub mod types;
pub mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use client::VcloudClient;
pub use config::{VcloudConfig, VcloudConfigSafe};
pub use error::{VcloudError, VcloudErrorKind, VcloudResult};
pub use inventory::Inventory;
pub use lifecycle::{LifecycleController, LifecycleOutcome};
pub use recompose::{RecomposeBuilder, UndeployAction};
pub use service::VcloudService;
pub use task::{Task, TaskController, TaskOutcome, TaskStatus};
pub use transport::{HttpTransport, Transport, TransportResponse};
pub use types::{Handle, NetworkIp, ResourceKind, VdcInfo, VmStatus};
