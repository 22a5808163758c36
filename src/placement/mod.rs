//! Node placement for new workloads
//!
//! Picks the node with the most memory not yet committed to containers.
//! The figure used is *provisioned* memory (the allocation each container is
//! configured with), not live usage.

use std::cmp::Ordering;

use serde::Serialize;

use crate::error::{PveError, Result};
use crate::inventory::Inventory;

/// Uncommitted memory on a single node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeHeadroom {
    pub node: String,
    /// Memory capacity in bytes
    pub capacity: u64,
    /// Sum of the provisioned memory of the node's containers
    pub provisioned: i128,
    /// `capacity - provisioned`; negative when the node is overcommitted
    pub available: i128,
}

/// Compute headroom for every node, in the inventory's node order
///
/// Containers whose owning node is not in the node partition are ignored.
pub fn node_headroom(inventory: &Inventory) -> Vec<NodeHeadroom> {
    let containers = inventory.containers();

    inventory
        .nodes()
        .into_iter()
        .map(|node| {
            let provisioned: i128 = containers
                .iter()
                .filter(|c| c.node == node.node)
                .map(|c| c.memory as i128)
                .sum();
            NodeHeadroom {
                node: node.node.clone(),
                capacity: node.memory,
                provisioned,
                available: node.memory as i128 - provisioned,
            }
        })
        .collect()
}

/// Compare two headrooms; `Ordering::Greater` if `a` is the better target
pub fn compare_headroom(a: &NodeHeadroom, b: &NodeHeadroom) -> Ordering {
    a.available.cmp(&b.available)
}

/// Select the node with the strictly greatest available memory
///
/// Ties keep the node that comes first in the inventory.
pub fn pick_node(inventory: &Inventory) -> Result<String> {
    let mut best: Option<NodeHeadroom> = None;

    for candidate in node_headroom(inventory) {
        let replace = match &best {
            None => true,
            Some(current) => compare_headroom(&candidate, current) == Ordering::Greater,
        };
        if replace {
            best = Some(candidate);
        }
    }

    best.map(|h| h.node).ok_or(PveError::NoNodes)
}
