//! Scripted transport and canned provider documents for tests.
//!
//! `MockTransport` answers requests from per-(method, url) response queues;
//! a queue's last response repeats, so a "steady state" needs scripting only
//! once. Unscripted requests answer 404 so a test that drifts off its script
//! fails loudly instead of hanging.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::client::VcloudClient;
use crate::config::VcloudConfig;
use crate::error::VcloudResult;
use crate::transport::{Transport, TransportResponse};

struct Scripted {
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
}

#[derive(Default)]
struct MockState {
    responses: HashMap<(String, String), VecDeque<Scripted>>,
    requests: Vec<(String, String, Option<String>)>,
}

/// Scripted stand-in for the HTTP transport.
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self { state: Mutex::new(MockState::default()) }
    }

    /// Script one response for (method, url).
    pub fn on(&self, method: &str, url: &str, status: u16, body: &str) {
        self.on_with_headers(method, url, status, body, &[]);
    }

    /// Script one response carrying extra response headers.
    pub fn on_with_headers(
        &self,
        method: &str,
        url: &str,
        status: u16,
        body: &str,
        headers: &[(&str, &str)],
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .responses
            .entry((method.to_string(), url.to_string()))
            .or_default()
            .push_back(Scripted {
                status,
                body: body.to_string(),
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
    }

    /// How many requests hit (method, url).
    pub fn count(&self, method: &str, url: &str) -> usize {
        let state = self.state.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(m, u, _)| m == method && u == url)
            .count()
    }

    /// Body of the most recent request to (method, url).
    pub fn last_body(&self, method: &str, url: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        state
            .requests
            .iter()
            .rev()
            .find(|(m, u, _)| m == method && u == url)
            .and_then(|(_, _, body)| body.clone())
    }

    /// Every POST url, in request order.
    pub fn posts(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .requests
            .iter()
            .filter(|(m, _, _)| m == "POST")
            .map(|(_, u, _)| u.clone())
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn request(
        &self,
        method: &str,
        url: &str,
        _headers: &[(String, String)],
        body: Option<String>,
    ) -> VcloudResult<TransportResponse> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((method.to_string(), url.to_string(), body));

        let queue = state
            .responses
            .get_mut(&(method.to_string(), url.to_string()));
        let response = match queue {
            Some(queue) if queue.len() > 1 => {
                let scripted = queue.pop_front().unwrap();
                TransportResponse {
                    status: scripted.status,
                    headers: scripted.headers,
                    body: scripted.body,
                }
            }
            Some(queue) if queue.len() == 1 => {
                let scripted = queue.front().unwrap();
                TransportResponse {
                    status: scripted.status,
                    headers: scripted.headers.clone(),
                    body: scripted.body.clone(),
                }
            }
            _ => TransportResponse {
                status: 404,
                headers: vec![],
                body: format!("unscripted: {method} {url}"),
            },
        };
        Ok(response)
    }
}

/// Config pointing at the fixture hierarchy.
pub fn test_config() -> VcloudConfig {
    VcloudConfig {
        api_url: "https://vcd.example/api".into(),
        username: "auto@acme".into(),
        password: "pw".into(),
        org: Some("acme".into()),
        vdc: Some("dc1".into()),
        ..Default::default()
    }
}

/// Client wired to a mock transport and the fixture config.
pub fn test_client(mock: Arc<MockTransport>) -> VcloudClient {
    VcloudClient::new(&test_config(), mock)
}

/// Canned documents forming one small but complete hierarchy:
/// org "acme" → vdc "dc1" → vApp "app1" {vm7, vm8}, template "tmplX",
/// networks {net0, net1}.
pub mod fixtures {
    use super::MockTransport;

    pub const ORG_HREF: &str = "https://vcd.example/api/org/1";
    pub const VDC_HREF: &str = "https://vcd.example/api/vdc/1";
    pub const VAPP_HREF: &str = "https://vcd.example/api/vApp/vapp-1";
    pub const TEMPLATE_HREF: &str = "https://vcd.example/api/vAppTemplate/tmpl-1";
    pub const TEMPLATE_VM_HREF: &str = "https://vcd.example/api/vAppTemplate/vm-t1";
    pub const NETWORK_HREF: &str = "https://vcd.example/api/network/net-0";
    pub const VM_HREF: &str = "https://vcd.example/api/vApp/vm-7";
    pub const VM8_HREF: &str = "https://vcd.example/api/vApp/vm-8";

    pub const SESSION_DOC: &str = r#"<Session xmlns="http://www.vmware.com/vcloud/v1.5" user="auto@acme">
  <Link rel="down" type="application/vnd.vmware.vcloud.org+xml" name="acme" href="https://vcd.example/api/org/1"/>
  <Link rel="down" type="application/vnd.vmware.vcloud.query.queryList+xml" href="https://vcd.example/api/query"/>
</Session>"#;

    pub const ORG_DOC: &str = r#"<Org xmlns="http://www.vmware.com/vcloud/v1.5" name="acme" href="https://vcd.example/api/org/1">
  <Link rel="down" type="application/vnd.vmware.vcloud.vdc+xml" name="dc1" href="https://vcd.example/api/vdc/1"/>
  <Link rel="down" type="application/vnd.vmware.vcloud.tasksList+xml" href="https://vcd.example/api/tasksList/1"/>
</Org>"#;

    pub const VDC_DOC: &str = r#"<Vdc xmlns="http://www.vmware.com/vcloud/v1.5" name="dc1" href="https://vcd.example/api/vdc/1">
  <ResourceEntities>
    <ResourceEntity type="application/vnd.vmware.vcloud.vApp+xml" name="app1" href="https://vcd.example/api/vApp/vapp-1"/>
    <ResourceEntity type="application/vnd.vmware.vcloud.vAppTemplate+xml" name="tmplX" href="https://vcd.example/api/vAppTemplate/tmpl-1"/>
  </ResourceEntities>
  <AvailableNetworks>
    <Network type="application/vnd.vmware.vcloud.network+xml" name="net1" href="https://vcd.example/api/network/net-1"/>
    <Network type="application/vnd.vmware.vcloud.network+xml" name="net0" href="https://vcd.example/api/network/net-0"/>
  </AvailableNetworks>
</Vdc>"#;

    pub const VAPP_DOC: &str = r#"<VApp xmlns="http://www.vmware.com/vcloud/v1.5" name="app1" status="4" deployed="true" href="https://vcd.example/api/vApp/vapp-1">
  <Children>
    <Vm name="vm7" href="https://vcd.example/api/vApp/vm-7" status="8" deployed="false"/>
    <Vm name="vm8" href="https://vcd.example/api/vApp/vm-8" status="4" deployed="true"/>
  </Children>
</VApp>"#;

    pub const TEMPLATE_DOC: &str = r#"<VAppTemplate xmlns="http://www.vmware.com/vcloud/v1.5" xmlns:ovf="http://schemas.dmtf.org/ovf/envelope/1" name="tmplX" href="https://vcd.example/api/vAppTemplate/tmpl-1">
  <Children>
    <Vm name="tmplX-vm" href="https://vcd.example/api/vAppTemplate/vm-t1">
      <NetworkConnectionSection>
        <ovf:Info>Network connections</ovf:Info>
        <NetworkConnection network="tmpl-net">
          <NetworkConnectionIndex>0</NetworkConnectionIndex>
          <IsConnected>true</IsConnected>
          <IpAddressAllocationMode>POOL</IpAddressAllocationMode>
        </NetworkConnection>
      </NetworkConnectionSection>
    </Vm>
  </Children>
</VAppTemplate>"#;

    pub const NETWORK_DOC: &str = r#"<OrgVdcNetwork xmlns="http://www.vmware.com/vcloud/v1.5" name="net0" href="https://vcd.example/api/network/net-0">
  <Configuration>
    <IpScopes>
      <IpScope>
        <Gateway>10.0.0.1</Gateway>
        <Netmask>255.255.255.0</Netmask>
      </IpScope>
    </IpScopes>
  </Configuration>
</OrgVdcNetwork>"#;

    pub const VM7_DOC: &str = r#"<Vm xmlns="http://www.vmware.com/vcloud/v1.5" name="vm7" status="8" deployed="false" needsCustomization="true" href="https://vcd.example/api/vApp/vm-7">
  <NetworkConnectionSection>
    <NetworkConnection network="net0"/>
  </NetworkConnectionSection>
</Vm>"#;

    pub const VM8_DOC: &str = r#"<Vm xmlns="http://www.vmware.com/vcloud/v1.5" name="vm8" status="4" deployed="true" needsCustomization="false" href="https://vcd.example/api/vApp/vm-8">
  <NetworkConnectionSection>
    <NetworkConnection network="net0">
      <IpAddress>10.0.0.8</IpAddress>
    </NetworkConnection>
  </NetworkConnectionSection>
</Vm>"#;

    /// Task document in the given status.
    pub fn task_doc(href: &str, status: &str) -> String {
        format!(
            r#"<Task xmlns="http://www.vmware.com/vcloud/v1.5" status="{status}" operation="test" href="{href}"/>"#
        )
    }

    /// Terminal-error task document carrying a provider message.
    pub fn task_error_doc(href: &str, message: &str) -> String {
        format!(
            r#"<Task xmlns="http://www.vmware.com/vcloud/v1.5" status="error" operation="test" href="{href}">
  <Error majorErrorCode="400" message="{message}"/>
</Task>"#
        )
    }

    /// Script a successful login.
    pub fn script_login(mock: &MockTransport) {
        mock.on_with_headers(
            "POST",
            "https://vcd.example/api/sessions",
            200,
            SESSION_DOC,
            &[("x-vcloud-authorization", "tok-abc")],
        );
    }

    /// Script login plus every GET in the fixture hierarchy.
    pub fn script_inventory(mock: &MockTransport) {
        script_login(mock);
        mock.on("GET", ORG_HREF, 200, ORG_DOC);
        mock.on("GET", VDC_HREF, 200, VDC_DOC);
        mock.on("GET", VAPP_HREF, 200, VAPP_DOC);
        mock.on("GET", TEMPLATE_HREF, 200, TEMPLATE_DOC);
        mock.on("GET", NETWORK_HREF, 200, NETWORK_DOC);
        mock.on("GET", VM_HREF, 200, VM7_DOC);
        mock.on("GET", VM8_HREF, 200, VM8_DOC);
    }
}
