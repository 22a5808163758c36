//! Node status and id allocation reads

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::PveClient;
use crate::error::{PveError, Result};

/// Detailed status of a node, from `/nodes/{node}/status`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NodeStatus {
    /// CPU usage (0.0 to 1.0)
    #[serde(default)]
    pub cpu: f64,
    #[serde(default)]
    pub wait: f64,
    pub memory: UsageInfo,
    #[serde(default)]
    pub swap: Option<UsageInfo>,
    #[serde(default)]
    pub rootfs: Option<UsageInfo>,
    #[serde(default)]
    pub uptime: u64,
    #[serde(default)]
    pub kversion: Option<String>,
    #[serde(default)]
    pub pveversion: Option<String>,
    /// 1, 5 and 15 minute load averages, as the API formats them
    #[serde(default)]
    pub loadavg: Vec<String>,
    #[serde(default)]
    pub cpuinfo: Option<CpuInfo>,
}

/// Total/used/free figures in bytes
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UsageInfo {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    #[serde(default)]
    pub avail: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CpuInfo {
    #[serde(default)]
    pub cpus: u32,
    #[serde(default)]
    pub sockets: u32,
    #[serde(default)]
    pub model: String,
}

/// `/cluster/nextid` answers with a string on most versions, a number on some
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NextId {
    Text(String),
    Number(u32),
}

impl PveClient {
    /// Next free VMID in the cluster
    pub async fn next_id(&self) -> Result<u32> {
        debug!("Getting next available ID");
        let next: NextId = self.get_data("/cluster/nextid", "next ID").await?;
        match next {
            NextId::Number(id) => Ok(id),
            NextId::Text(text) => text
                .parse()
                .map_err(|_| PveError::Transport(format!("invalid next ID: {}", text))),
        }
    }

    /// RAM, CPU and storage status of a node
    pub async fn node_status(&self, node: &str) -> Result<NodeStatus> {
        debug!(node, "Getting node status");
        self.get_data(&format!("/nodes/{}/status", node), "node status")
            .await
    }
}
