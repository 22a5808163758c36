//! PVE API client
//!
//! [`PveClient`] owns one [`SessionManager`] and routes every privileged
//! request through [`PveClient::send`], which applies the reauthentication
//! policy before the request is built and attaches the CSRF token to
//! state-mutating methods.

pub mod nodes;
pub mod storage;

use async_trait::async_trait;
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{PveError, Result};
use crate::inventory::{Inventory, RawResource};
use crate::lifecycle::{
    ContainerConfig, ContainerCreateRequest, ContainerDeleteRequest, ContainerStatusRequest,
};
use crate::placement;
use crate::session::{SessionManager, CSRF_HEADER};
use crate::template::StorageContent;

pub use nodes::{NodeStatus, UsageInfo};

/// The `{ "data": ... }` wrapper around every API response
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

/// Operations a cluster orchestrator needs from the PVE API
#[async_trait]
pub trait ClusterService: Send + Sync {
    async fn fetch_inventory(&self) -> Result<Inventory>;

    async fn pick_node(&self) -> Result<String>;

    async fn next_id(&self) -> Result<u32>;

    async fn create_container(&self, request: &ContainerCreateRequest) -> Result<()>;

    async fn set_status(&self, request: &ContainerStatusRequest) -> Result<()>;

    async fn delete_container(&self, request: &ContainerDeleteRequest) -> Result<()>;

    async fn container_config(&self, node: &str, vmid: u32) -> Result<ContainerConfig>;

    async fn template_list(&self, node: &str) -> Result<Vec<StorageContent>>;

    async fn iso_list(&self, node: &str) -> Result<Vec<String>>;
}

// ============================================================================
// SBIO: I/O implementation (real HTTP client)
// ============================================================================

/// Client for one PVE cluster, holding a single logical session
pub struct PveClient {
    session: SessionManager,
    config: ClientConfig,
}

impl PveClient {
    /// Build a client without contacting the API
    pub fn new(config: ClientConfig) -> Result<Self> {
        let session = SessionManager::new(&config)?;
        Ok(Self { session, config })
    }

    /// Build a client and sign in immediately
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.session.sign_in().await?;
        Ok(client)
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send an authenticated request
    ///
    /// The session is verified (and refreshed) before anything is built.
    /// Methods other than GET carry the CSRF token of the credential that
    /// verification returned.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response> {
        let credential = self.session.ensure_session().await?;

        let mut request = self
            .session
            .http()
            .request(method.clone(), self.session.endpoint(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        if method != Method::GET {
            request = request.header(CSRF_HEADER, credential.csrf_token.as_str());
        }

        debug!(%method, path, "Sending PVE request");
        request.send().await.map_err(PveError::from_transport)
    }

    /// Authenticated GET, decoding the envelope's `data`
    pub(crate) async fn get_data<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let response = self.send(Method::GET, path, &[]).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PveError::Transport(format!(
                "could not get {}: {}",
                what, status
            )));
        }

        let envelope: Envelope<T> = response.json().await.map_err(PveError::from_transport)?;
        Ok(envelope.data)
    }

    /// Authenticated mutation that only needs a 2xx answer
    ///
    /// The body of a rejected call holds the upstream's error detail, so it
    /// is logged and carried in the error.
    pub(crate) async fn mutate(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<()> {
        let response = self.send(method, path, query).await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let detail = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(action, %status, error = %e, "Could not read rejection body");
                String::new()
            }
        };
        debug!(action, %status, body = %detail, "PVE rejected request");
        Err(PveError::Status {
            action: action.to_string(),
            status: status.as_u16(),
            detail: if detail.is_empty() {
                status.to_string()
            } else {
                detail
            },
        })
    }

    /// Fetch a fresh snapshot of `/cluster/resources`
    pub async fn fetch_inventory(&self) -> Result<Inventory> {
        debug!("Getting resources from cluster");
        let raw: Vec<RawResource> = self.get_data("/cluster/resources", "resource list").await?;
        Inventory::from_raw(raw)
    }

    /// Fetch the inventory and pick the node with the most uncommitted memory
    pub async fn pick_node(&self) -> Result<String> {
        let inventory = self.fetch_inventory().await?;
        for headroom in placement::node_headroom(&inventory) {
            debug!(
                node = %headroom.node,
                capacity = headroom.capacity,
                provisioned = %headroom.provisioned,
                available = %headroom.available,
                "Node headroom"
            );
        }
        let node = placement::pick_node(&inventory)?;
        debug!(node = %node, "Picked node");
        Ok(node)
    }

    /// Owning node of a workload, from a fresh inventory
    pub async fn node_for_workload(&self, vmid: u32) -> Result<String> {
        let inventory = self.fetch_inventory().await?;
        inventory.node_for_workload(vmid).map(str::to_string)
    }
}

#[async_trait]
impl ClusterService for PveClient {
    async fn fetch_inventory(&self) -> Result<Inventory> {
        PveClient::fetch_inventory(self).await
    }

    async fn pick_node(&self) -> Result<String> {
        PveClient::pick_node(self).await
    }

    async fn next_id(&self) -> Result<u32> {
        PveClient::next_id(self).await
    }

    async fn create_container(&self, request: &ContainerCreateRequest) -> Result<()> {
        PveClient::create_container(self, request).await
    }

    async fn set_status(&self, request: &ContainerStatusRequest) -> Result<()> {
        PveClient::set_status(self, request).await
    }

    async fn delete_container(&self, request: &ContainerDeleteRequest) -> Result<()> {
        PveClient::delete_container(self, request).await
    }

    async fn container_config(&self, node: &str, vmid: u32) -> Result<ContainerConfig> {
        PveClient::container_config(self, node, vmid).await
    }

    async fn template_list(&self, node: &str) -> Result<Vec<StorageContent>> {
        PveClient::template_list(self, node).await
    }

    async fn iso_list(&self, node: &str) -> Result<Vec<String>> {
        PveClient::iso_list(self, node).await
    }
}
