//! End-to-end container provisioning
//!
//! Chains the pieces a caller would otherwise wire by hand: pick a node from
//! a fresh inventory, allocate the next id, create the container there.

use serde::Serialize;
use tracing::info;

use super::ContainerCreateRequest;
use crate::client::ClusterService;
use crate::error::Result;
use crate::template::ParsedTemplate;

/// Everything needed to create a container except its placement
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub template: ParsedTemplate,
    pub mac: String,
    pub cpu_cores: u32,
    pub memory: u32,
    pub storage_capacity: u32,
    pub storage_id: String,
    pub hostname: String,
    pub password: String,
    pub ssh_public_key: Option<String>,
    pub ip_address: Option<String>,
}

impl ProvisionRequest {
    /// Bind the request to a node and vmid
    pub fn into_create(self, node: String, vmid: u32) -> ContainerCreateRequest {
        ContainerCreateRequest {
            node,
            vmid,
            template: self.template,
            mac: self.mac,
            cpu_cores: self.cpu_cores,
            memory: self.memory,
            storage_capacity: self.storage_capacity,
            storage_id: self.storage_id,
            hostname: self.hostname,
            password: self.password,
            ssh_public_key: self.ssh_public_key,
            ip_address: self.ip_address,
        }
    }
}

/// Where a provisioned container landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provisioned {
    pub node: String,
    pub vmid: u32,
}

/// Place and create a container
pub async fn provision(
    service: &dyn ClusterService,
    request: ProvisionRequest,
) -> Result<Provisioned> {
    let node = service.pick_node().await?;
    let vmid = service.next_id().await?;

    let create = request.into_create(node.clone(), vmid);
    service.create_container(&create).await?;

    info!(node = %node, vmid, "Provisioned container");
    Ok(Provisioned { node, vmid })
}

// ============================================================================
// SBIO: Mock implementation for testing (no I/O)
// ============================================================================
