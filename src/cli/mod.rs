//! CLI module for pvectl
//!
//! Provides subcommands over the library:
//! - `pvectl resources` - List cluster resources
//! - `pvectl pick-node` - Show placement headroom and the chosen node
//! - `pvectl create` - Create (or place and create) a container
//! - `pvectl status` - Start/stop/shutdown/resume/suspend a container
//! - `pvectl delete` - Delete a container

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod display;

pub use commands::*;
pub use display::*;

#[derive(Parser, Debug)]
#[command(name = "pvectl")]
#[command(about = "Drive container workloads on a Proxmox VE cluster")]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: ~/.pvectl/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to a .env file with PVE_* variables
    #[arg(long, value_name = "FILE", global = true)]
    pub env_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cluster resources
    Resources(ResourcesArgs),

    /// Show per-node headroom and the node a new workload would land on
    PickNode,

    /// Show the next free VMID
    NextId,

    /// Show a node's status
    NodeStatus {
        /// Node name
        node: String,
    },

    /// List container templates on a node
    Templates {
        /// Node name
        node: String,
    },

    /// List ISO images on a node
    Isos {
        /// Node name
        node: String,
    },

    /// Show a container's configuration
    Config(TargetArgs),

    /// Create a container
    Create(CreateArgs),

    /// Change a container's power state
    Status(StatusArgs),

    /// Delete a container
    Delete(TargetArgs),
}

/// Arguments for the resources command
#[derive(Parser, Debug)]
pub struct ResourcesArgs {
    /// Only show one kind: node, lxc, qemu, storage, template
    #[arg(short, long)]
    pub kind: Option<String>,
}

/// A container addressed by vmid, optionally pinned to a node
#[derive(Parser, Debug)]
pub struct TargetArgs {
    /// Container VMID
    pub vmid: u32,

    /// Owning node (looked up from the inventory when omitted)
    #[arg(short, long)]
    pub node: Option<String>,
}

/// Arguments for the status command
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// start, stop, shutdown, resume or suspend
    pub action: String,

    #[command(flatten)]
    pub target: TargetArgs,
}

/// Arguments for the create command
#[derive(Parser, Debug)]
pub struct CreateArgs {
    /// Template file name or volume id
    #[arg(short, long)]
    pub template: String,

    /// Hardware address for the container NIC
    #[arg(long)]
    pub mac: String,

    /// Hostname of the container
    #[arg(long)]
    pub hostname: String,

    /// Root password of the container
    #[arg(long, env = "PVE_CT_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// CPU cores (also used as CPU limit)
    #[arg(long, default_value = "1")]
    pub cores: u32,

    /// Memory in MiB
    #[arg(long, default_value = "512")]
    pub memory: u32,

    /// Root filesystem size in GiB
    #[arg(long, default_value = "8")]
    pub disk: u32,

    /// Storage backend id
    #[arg(long, default_value = "local-lvm")]
    pub storage: String,

    /// Target node (picked by placement when omitted)
    #[arg(long)]
    pub node: Option<String>,

    /// VMID (allocated from the cluster when omitted)
    #[arg(long)]
    pub vmid: Option<u32>,

    /// SSH public key recorded with the container
    #[arg(long)]
    pub ssh_public_key: Option<String>,
}
