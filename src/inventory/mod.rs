//! Cluster resource inventory
//!
//! `/cluster/resources` returns one flat list where every entry carries a
//! `type` tag and a loose bag of optional fields. This module decodes that
//! listing at the boundary into a closed [`Resource`] union and offers the
//! kind partitions the rest of the crate works with.
//!
//! An [`Inventory`] is a point-in-time snapshot: it is never mutated after
//! decoding, and a fresh fetch produces a fresh inventory.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PveError, Result};

/// Discriminant of a [`Resource`], spelled as the upstream `type` tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Node,
    Lxc,
    Qemu,
    Storage,
    Template,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Node => "node",
            ResourceKind::Lxc => "lxc",
            ResourceKind::Qemu => "qemu",
            ResourceKind::Storage => "storage",
            ResourceKind::Template => "template",
        }
    }

    /// Map an upstream tag, `None` for kinds this crate does not model
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "node" => Some(ResourceKind::Node),
            "lxc" => Some(ResourceKind::Lxc),
            "qemu" => Some(ResourceKind::Qemu),
            "storage" => Some(ResourceKind::Storage),
            "template" => Some(ResourceKind::Template),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Wire representation
// ============================================================================

/// One entry of `/cluster/resources` exactly as the API sends it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub vmid: Option<u32>,
    #[serde(default)]
    pub mem: Option<u64>,
    #[serde(default)]
    pub maxmem: Option<u64>,
    #[serde(default)]
    pub maxcpu: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
}

// ============================================================================
// Typed model
// ============================================================================

/// A cluster node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeResource {
    pub id: String,
    pub node: String,
    /// Memory capacity in bytes, from `mem`
    pub memory: u64,
    /// `maxmem` as reported by the listing
    pub max_memory: Option<u64>,
    pub max_cpu: Option<u32>,
    pub status: Option<String>,
}

/// A container or VM
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workload {
    pub id: String,
    /// Owning node
    pub node: String,
    pub vmid: u32,
    /// Provisioned memory in bytes, from `mem`
    pub memory: u64,
    pub max_memory: Option<u64>,
    pub name: Option<String>,
    pub status: Option<String>,
}

/// A storage attached to a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageResource {
    pub id: String,
    pub node: String,
    pub storage: Option<String>,
    pub status: Option<String>,
}

/// A template entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateResource {
    pub id: String,
    pub node: Option<String>,
}

/// A typed cluster resource
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Resource {
    Node(NodeResource),
    #[serde(rename = "lxc")]
    Container(Workload),
    #[serde(rename = "qemu")]
    Vm(Workload),
    Storage(StorageResource),
    Template(TemplateResource),
}

fn required(value: Option<String>, field: &str, kind: ResourceKind) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PveError::Transport(format!(
            "{} resource is missing `{}`",
            kind, field
        ))),
    }
}

impl Resource {
    /// Decode a wire record; `Ok(None)` for kinds outside the model
    ///
    /// `memory` is read from `mem` for every kind; `maxmem` is kept
    /// alongside as `max_memory` and plays no part in placement.
    pub fn from_raw(raw: RawResource) -> Result<Option<Resource>> {
        let kind = match ResourceKind::from_tag(&raw.kind) {
            Some(kind) => kind,
            None => {
                debug!("Skipping resource of unmodelled kind '{}'", raw.kind);
                return Ok(None);
            }
        };
        let memory = raw.mem.unwrap_or(0);

        let resource = match kind {
            ResourceKind::Node => {
                let node = required(raw.node, "node", kind)?;
                Resource::Node(NodeResource {
                    id: raw.id.unwrap_or_else(|| format!("node/{}", node)),
                    node,
                    memory,
                    max_memory: raw.maxmem,
                    max_cpu: raw.maxcpu,
                    status: raw.status,
                })
            }
            ResourceKind::Lxc | ResourceKind::Qemu => {
                let node = required(raw.node, "node", kind)?;
                let vmid = raw.vmid.ok_or_else(|| {
                    PveError::Transport(format!("{} resource is missing `vmid`", kind))
                })?;
                let workload = Workload {
                    id: raw.id.unwrap_or_else(|| format!("{}/{}", kind, vmid)),
                    node,
                    vmid,
                    memory,
                    max_memory: raw.maxmem,
                    name: raw.name,
                    status: raw.status,
                };
                if kind == ResourceKind::Lxc {
                    Resource::Container(workload)
                } else {
                    Resource::Vm(workload)
                }
            }
            ResourceKind::Storage => {
                let node = required(raw.node, "node", kind)?;
                Resource::Storage(StorageResource {
                    id: raw.id.unwrap_or_else(|| {
                        format!("storage/{}/{}", node, raw.storage.clone().unwrap_or_default())
                    }),
                    node,
                    storage: raw.storage,
                    status: raw.status,
                })
            }
            ResourceKind::Template => Resource::Template(TemplateResource {
                id: required(raw.id, "id", kind)?,
                node: raw.node,
            }),
        };
        Ok(Some(resource))
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Node(_) => ResourceKind::Node,
            Resource::Container(_) => ResourceKind::Lxc,
            Resource::Vm(_) => ResourceKind::Qemu,
            Resource::Storage(_) => ResourceKind::Storage,
            Resource::Template(_) => ResourceKind::Template,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Resource::Node(n) => &n.id,
            Resource::Container(w) | Resource::Vm(w) => &w.id,
            Resource::Storage(s) => &s.id,
            Resource::Template(t) => &t.id,
        }
    }
}

// ============================================================================
// Inventory snapshot
// ============================================================================

/// Ordered snapshot of the cluster's resources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Inventory {
    records: Vec<Resource>,
}

impl Inventory {
    pub fn new(records: Vec<Resource>) -> Self {
        Self { records }
    }

    /// Decode wire records, dropping unmodelled kinds
    pub fn from_raw(raw: Vec<RawResource>) -> Result<Self> {
        let mut records = Vec::with_capacity(raw.len());
        for entry in raw {
            if let Some(resource) = Resource::from_raw(entry)? {
                records.push(resource);
            }
        }
        Ok(Self { records })
    }

    /// Decode a `{ "data": [...] }` envelope
    pub fn from_json(body: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Envelope {
            data: Vec<RawResource>,
        }
        let envelope: Envelope = serde_json::from_str(body)?;
        Self::from_raw(envelope.data)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.records.iter()
    }

    pub fn nodes(&self) -> Vec<&NodeResource> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Resource::Node(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn containers(&self) -> Vec<&Workload> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Resource::Container(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    pub fn vms(&self) -> Vec<&Workload> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Resource::Vm(w) => Some(w),
                _ => None,
            })
            .collect()
    }

    pub fn storages(&self) -> Vec<&StorageResource> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Resource::Storage(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub fn templates(&self) -> Vec<&TemplateResource> {
        self.records
            .iter()
            .filter_map(|r| match r {
                Resource::Template(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Owning node of the container or VM with this vmid
    pub fn node_for_workload(&self, vmid: u32) -> Result<&str> {
        self.records
            .iter()
            .find_map(|r| match r {
                Resource::Container(w) | Resource::Vm(w) if w.vmid == vmid => {
                    Some(w.node.as_str())
                }
                _ => None,
            })
            .ok_or_else(|| PveError::NotFound(format!("could not find node for VMID {}", vmid)))
    }
}

impl IntoIterator for Inventory {
    type Item = Resource;
    type IntoIter = std::vec::IntoIter<Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
