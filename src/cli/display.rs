//! Display formatting for CLI output
//!
//! SBIO pattern: Pure functions that format data for display

use crate::client::NodeStatus;
use crate::inventory::{Inventory, Resource, ResourceKind};
use crate::lifecycle::ContainerConfig;
use crate::placement::NodeHeadroom;
use crate::template::StorageContent;

// ============================================================================
// Table formatting helpers
// ============================================================================

/// Format a simple table with headers and rows
pub fn format_table(headers: &[&str], rows: Vec<Vec<String>>) -> String {
    if rows.is_empty() {
        return "No resources found.\n".to_string();
    }

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.len());
            }
        }
    }

    let mut output = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();
    push_row(&mut output, &header_cells, &widths);
    for row in &rows {
        push_row(&mut output, row, &widths);
    }
    output
}

fn push_row(output: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            line.push_str("   ");
        }
        match widths.get(i) {
            Some(width) => line.push_str(&format!("{:width$}", cell, width = *width)),
            None => line.push_str(cell),
        }
    }
    output.push_str(line.trim_end());
    output.push('\n');
}

/// Bytes as MiB, for memory columns
pub fn format_mib(bytes: u64) -> String {
    format!("{}Mi", bytes / (1024 * 1024))
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

// ============================================================================
// Inventory display
// ============================================================================

/// Format the inventory, optionally restricted to one kind
pub fn format_inventory(inventory: &Inventory, kind: Option<ResourceKind>) -> String {
    let headers = &["kind", "id", "node", "vmid", "memory", "status"];
    let rows: Vec<Vec<String>> = inventory
        .iter()
        .filter(|r| kind.map_or(true, |k| r.kind() == k))
        .map(|r| match r {
            Resource::Node(n) => vec![
                r.kind().to_string(),
                n.id.clone(),
                n.node.clone(),
                "-".to_string(),
                format_mib(n.memory),
                opt(&n.status),
            ],
            Resource::Container(w) | Resource::Vm(w) => vec![
                r.kind().to_string(),
                w.id.clone(),
                w.node.clone(),
                w.vmid.to_string(),
                format_mib(w.memory),
                opt(&w.status),
            ],
            Resource::Storage(s) => vec![
                r.kind().to_string(),
                s.id.clone(),
                s.node.clone(),
                "-".to_string(),
                "-".to_string(),
                opt(&s.status),
            ],
            Resource::Template(t) => vec![
                r.kind().to_string(),
                t.id.clone(),
                opt(&t.node),
                "-".to_string(),
                "-".to_string(),
                "-".to_string(),
            ],
        })
        .collect();

    format_table(headers, rows)
}

/// Format per-node headroom, marking the chosen node
pub fn format_headroom(headroom: &[NodeHeadroom], chosen: &str) -> String {
    let headers = &["", "node", "capacity", "provisioned", "available"];
    let rows: Vec<Vec<String>> = headroom
        .iter()
        .map(|h| {
            vec![
                if h.node == chosen { "*" } else { " " }.to_string(),
                h.node.clone(),
                format_mib(h.capacity),
                format!("{}Mi", h.provisioned / (1024 * 1024)),
                format!("{}Mi", h.available / (1024 * 1024)),
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format a storage content listing
pub fn format_storage_content(items: &[StorageContent]) -> String {
    let headers = &["volid", "content", "format", "size"];
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            vec![
                item.volid.clone(),
                item.content.clone(),
                item.format.clone(),
                format_mib(item.size),
            ]
        })
        .collect();

    format_table(headers, rows)
}

/// Format a node's status as key/value lines
pub fn format_node_status(node: &str, status: &NodeStatus) -> String {
    let mut output = format!("Node: {}\n", node);
    output.push_str(&format!("  CPU:     {:.1}%\n", status.cpu * 100.0));
    output.push_str(&format!(
        "  Memory:  {} / {}\n",
        format_mib(status.memory.used),
        format_mib(status.memory.total)
    ));
    if let Some(ref rootfs) = status.rootfs {
        output.push_str(&format!(
            "  Rootfs:  {} / {}\n",
            format_mib(rootfs.used),
            format_mib(rootfs.total)
        ));
    }
    output.push_str(&format!("  Uptime:  {}s\n", status.uptime));
    if !status.loadavg.is_empty() {
        output.push_str(&format!("  Load:    {}\n", status.loadavg.join(" ")));
    }
    if let Some(ref version) = status.pveversion {
        output.push_str(&format!("  Version: {}\n", version));
    }
    output
}

/// Format a container configuration as key/value lines
pub fn format_container_config(vmid: u32, config: &ContainerConfig) -> String {
    let mut output = format!("Container: {}\n", vmid);
    let fields = [
        ("Hostname", config.hostname.clone()),
        ("OS type", config.ostype.clone()),
        ("Arch", config.arch.clone()),
        ("Cores", config.cores.map(|c| c.to_string())),
        ("CPU limit", config.cpulimit.clone()),
        ("Memory", config.memory.map(|m| format!("{}Mi", m))),
        ("Swap", config.swap.map(|s| format!("{}Mi", s))),
        ("Rootfs", config.rootfs.clone()),
        ("Net0", config.net0.clone()),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            output.push_str(&format!("  {:<10} {}\n", format!("{}:", label), value));
        }
    }
    output
}
