//! Container lifecycle dispatch
//!
//! Every call here is a stateless imperative request: the upstream cluster is
//! authoritative for a container's actual state, and the only state this side
//! keeps is the session credential.
//!
//! ```text
//! absent --create--> stopped <--start/stop--> running
//! running --shutdown/stop--> stopped --delete--> absent
//! running --suspend--> suspended --resume--> running
//! ```

pub mod provision;

use std::fmt;
use std::str::FromStr;

use reqwest::Method;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::client::PveClient;
use crate::config::CreateDefaults;
use crate::error::{PveError, Result};
use crate::template::ParsedTemplate;

pub use provision::{provision, ProvisionRequest, Provisioned};

// ============================================================================
// Request types (pure, no I/O)
// ============================================================================

/// Power-state actions accepted by `/status/{action}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusAction {
    Start,
    Stop,
    Shutdown,
    Resume,
    Suspend,
}

impl StatusAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusAction::Start => "start",
            StatusAction::Stop => "stop",
            StatusAction::Shutdown => "shutdown",
            StatusAction::Resume => "resume",
            StatusAction::Suspend => "suspend",
        }
    }
}

impl fmt::Display for StatusAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusAction {
    type Err = PveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "start" => Ok(StatusAction::Start),
            "stop" => Ok(StatusAction::Stop),
            "shutdown" => Ok(StatusAction::Shutdown),
            "resume" => Ok(StatusAction::Resume),
            "suspend" => Ok(StatusAction::Suspend),
            other => Err(PveError::Validation(format!("unknown status action: {}", other))),
        }
    }
}

/// Change the power state of a container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerStatusRequest {
    pub node: String,
    pub vmid: u32,
    pub action: StatusAction,
}

impl ContainerStatusRequest {
    pub fn new(node: impl Into<String>, vmid: u32, action: StatusAction) -> Self {
        Self {
            node: node.into(),
            vmid,
            action,
        }
    }

    pub fn path(&self) -> String {
        format!("/nodes/{}/lxc/{}/status/{}", self.node, self.vmid, self.action)
    }
}

/// Remove a container
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDeleteRequest {
    pub node: String,
    pub vmid: u32,
}

impl ContainerDeleteRequest {
    pub fn new(node: impl Into<String>, vmid: u32) -> Self {
        Self {
            node: node.into(),
            vmid,
        }
    }

    pub fn path(&self) -> String {
        format!("/nodes/{}/lxc/{}", self.node, self.vmid)
    }
}

/// Create a container from a template
///
/// The serialized form (password excluded) is stored as the container's
/// description.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerCreateRequest {
    pub node: String,
    pub vmid: u32,
    pub template: ParsedTemplate,
    /// Hardware address of the container NIC (`aa:bb:cc:dd:ee:ff`)
    pub mac: String,
    pub cpu_cores: u32,
    /// Memory in MiB
    pub memory: u32,
    /// Root filesystem size in GiB
    pub storage_capacity: u32,
    pub storage_id: String,
    pub hostname: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

fn is_mac_address(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

impl ContainerCreateRequest {
    /// Check the fields the API cannot default
    pub fn validate(&self) -> Result<()> {
        if self.node.is_empty() {
            return Err(PveError::Validation("node must not be empty".to_string()));
        }
        if self.vmid == 0 {
            return Err(PveError::Validation("vmid must be greater than zero".to_string()));
        }
        if self.hostname.is_empty() {
            return Err(PveError::Validation("hostname must not be empty".to_string()));
        }
        if self.storage_id.is_empty() {
            return Err(PveError::Validation("storage id must not be empty".to_string()));
        }
        if self.cpu_cores == 0 {
            return Err(PveError::Validation("cpu cores must be greater than zero".to_string()));
        }
        if self.memory == 0 {
            return Err(PveError::Validation("memory must be greater than zero".to_string()));
        }
        if !is_mac_address(&self.mac) {
            return Err(PveError::Validation(format!("invalid MAC address: {}", self.mac)));
        }
        Ok(())
    }
}

/// Build the query of a container create call
pub fn create_container_query(
    request: &ContainerCreateRequest,
    template_storage: &str,
    defaults: &CreateDefaults,
) -> Result<Vec<(&'static str, String)>> {
    let description = serde_json::to_string(request)
        .map_err(|e| PveError::Validation(format!("could not serialize description: {}", e)))?;

    Ok(vec![
        (
            "ostemplate",
            format!("{}:vztmpl/{}", template_storage, request.template),
        ),
        ("vmid", request.vmid.to_string()),
        ("storage", request.storage_id.clone()),
        ("swap", defaults.swap_mb.to_string()),
        ("cores", request.cpu_cores.to_string()),
        ("rootfs", request.storage_capacity.to_string()),
        ("cpulimit", request.cpu_cores.to_string()),
        ("memory", request.memory.to_string()),
        ("hostname", request.hostname.clone()),
        ("password", request.password.clone()),
        ("description", description),
        (
            "net0",
            format!(
                "name={},bridge={},hwaddr={},ip=dhcp,tag={},type=veth",
                defaults.interface, defaults.bridge, request.mac, defaults.vlan_tag
            ),
        ),
    ])
}

// ============================================================================
// Container configuration (read side)
// ============================================================================

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Loose>::deserialize(deserializer)?.map(|v| match v {
        Loose::Text(s) => s,
        Loose::Number(n) => n.to_string(),
    }))
}

/// Configuration of a container, from `/nodes/{node}/lxc/{vmid}/config`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContainerConfig {
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub cpulimit: Option<String>,
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub cores: Option<u32>,
    #[serde(default)]
    pub ostype: Option<String>,
    #[serde(default)]
    pub rootfs: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub swap: Option<u64>,
    #[serde(default)]
    pub net0: Option<String>,
}

impl ContainerConfig {
    /// Hardware address of the first NIC
    pub fn hwaddr(&self) -> Option<&str> {
        self.net0
            .as_deref()?
            .split(',')
            .find_map(|part| part.strip_prefix("hwaddr="))
    }
}

// ============================================================================
// Dispatch (I/O)
// ============================================================================

impl PveClient {
    /// POST a status action for a container
    pub async fn set_status(&self, request: &ContainerStatusRequest) -> Result<()> {
        info!(
            node = %request.node,
            vmid = request.vmid,
            action = %request.action,
            "Changing container status"
        );
        self.mutate(
            Method::POST,
            &request.path(),
            &[],
            &format!("{} container", request.action),
        )
        .await
    }

    pub async fn start_container(&self, node: &str, vmid: u32) -> Result<()> {
        self.set_status(&ContainerStatusRequest::new(node, vmid, StatusAction::Start))
            .await
    }

    pub async fn stop_container(&self, node: &str, vmid: u32) -> Result<()> {
        self.set_status(&ContainerStatusRequest::new(node, vmid, StatusAction::Stop))
            .await
    }

    pub async fn shutdown_container(&self, node: &str, vmid: u32) -> Result<()> {
        self.set_status(&ContainerStatusRequest::new(
            node,
            vmid,
            StatusAction::Shutdown,
        ))
        .await
    }

    pub async fn resume_container(&self, node: &str, vmid: u32) -> Result<()> {
        self.set_status(&ContainerStatusRequest::new(node, vmid, StatusAction::Resume))
            .await
    }

    pub async fn suspend_container(&self, node: &str, vmid: u32) -> Result<()> {
        self.set_status(&ContainerStatusRequest::new(
            node,
            vmid,
            StatusAction::Suspend,
        ))
        .await
    }

    /// Create a container on `request.node`
    ///
    /// Input is validated before any request is sent.
    pub async fn create_container(&self, request: &ContainerCreateRequest) -> Result<()> {
        request.validate()?;
        let query = create_container_query(
            request,
            &self.config().template_storage,
            &self.config().create,
        )?;

        info!(
            node = %request.node,
            vmid = request.vmid,
            template = %request.template,
            hostname = %request.hostname,
            cores = request.cpu_cores,
            memory = request.memory,
            "Creating container"
        );
        self.mutate(
            Method::POST,
            &format!("/nodes/{}/lxc", request.node),
            &query,
            "create container",
        )
        .await
    }

    /// Delete a container
    pub async fn delete_container(&self, request: &ContainerDeleteRequest) -> Result<()> {
        info!(node = %request.node, vmid = request.vmid, "Deleting container");
        self.mutate(Method::DELETE, &request.path(), &[], "delete container")
            .await
    }

    /// Read a container's configuration
    pub async fn container_config(&self, node: &str, vmid: u32) -> Result<ContainerConfig> {
        self.get_data(
            &format!("/nodes/{}/lxc/{}/config", node, vmid),
            "container config",
        )
        .await
    }
}
