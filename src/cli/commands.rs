//! Command implementations for the CLI
//!
//! SBIO pattern: Commands return formatted output, printing is left to the caller

use std::path::Path;

use thiserror::Error;

use super::display::*;
use super::{Commands, CreateArgs, TargetArgs};
use crate::client::PveClient;
use crate::config::{self, ClientConfig, ConfigError};
use crate::error::PveError;
use crate::inventory::ResourceKind;
use crate::lifecycle::{
    provision, ContainerDeleteRequest, ContainerStatusRequest, ProvisionRequest, StatusAction,
};
use crate::placement;
use crate::template::parse_template;

/// Errors that can occur during command execution
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] PveError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for commands
pub type CommandResult<T> = Result<T, CommandError>;

/// Resolve the client config: file (explicit or default) then environment
///
/// A missing default file is not an error; the environment may carry
/// everything.
pub fn resolve_config(path: Option<&Path>) -> CommandResult<ClientConfig> {
    let mut config = match path {
        Some(path) => config::load_config_file(path)?,
        None => {
            let default = config::default_config_path();
            if default.exists() {
                config::load_config_file(&default)?
            } else {
                ClientConfig::new("", "", "")
            }
        }
    };
    config.apply_env()?;
    config.validate()?;
    Ok(config)
}

/// Parse a `--kind` filter
pub fn parse_kind(kind: &str) -> CommandResult<ResourceKind> {
    let tag = match kind {
        "container" | "ct" => "lxc",
        "vm" => "qemu",
        other => other,
    };
    ResourceKind::from_tag(tag)
        .ok_or_else(|| CommandError::InvalidArgument(format!("unknown resource kind: {}", kind)))
}

async fn resolve_node(client: &PveClient, target: &TargetArgs) -> CommandResult<String> {
    match target.node {
        Some(ref node) => Ok(node.clone()),
        None => Ok(client.node_for_workload(target.vmid).await?),
    }
}

async fn create(client: &PveClient, args: CreateArgs) -> CommandResult<String> {
    let request = ProvisionRequest {
        template: parse_template(&args.template)?,
        mac: args.mac,
        cpu_cores: args.cores,
        memory: args.memory,
        storage_capacity: args.disk,
        storage_id: args.storage,
        hostname: args.hostname,
        password: args.password,
        ssh_public_key: args.ssh_public_key,
        ip_address: None,
    };

    let (node, vmid) = match (args.node, args.vmid) {
        (None, None) => {
            let placed = provision(client, request).await?;
            (placed.node, placed.vmid)
        }
        (node, vmid) => {
            let node = match node {
                Some(node) => node,
                None => client.pick_node().await?,
            };
            let vmid = match vmid {
                Some(vmid) => vmid,
                None => client.next_id().await?,
            };
            client
                .create_container(&request.into_create(node.clone(), vmid))
                .await?;
            (node, vmid)
        }
    };

    Ok(format!("Created container {} on {}\n", vmid, node))
}

/// Execute a command against the cluster and return its output
pub async fn run_command(client: &PveClient, command: Commands) -> CommandResult<String> {
    match command {
        Commands::Resources(args) => {
            let kind = args.kind.as_deref().map(parse_kind).transpose()?;
            let inventory = client.fetch_inventory().await?;
            Ok(format_inventory(&inventory, kind))
        }
        Commands::PickNode => {
            let inventory = client.fetch_inventory().await?;
            let chosen = placement::pick_node(&inventory)?;
            Ok(format_headroom(
                &placement::node_headroom(&inventory),
                &chosen,
            ))
        }
        Commands::NextId => Ok(format!("{}\n", client.next_id().await?)),
        Commands::NodeStatus { node } => {
            let status = client.node_status(&node).await?;
            Ok(format_node_status(&node, &status))
        }
        Commands::Templates { node } => {
            let templates = client.template_list(&node).await?;
            Ok(format_storage_content(&templates))
        }
        Commands::Isos { node } => {
            let isos = client.iso_list(&node).await?;
            Ok(isos.into_iter().map(|iso| iso + "\n").collect())
        }
        Commands::Config(target) => {
            let node = resolve_node(client, &target).await?;
            let config = client.container_config(&node, target.vmid).await?;
            Ok(format_container_config(target.vmid, &config))
        }
        Commands::Create(args) => create(client, args).await,
        Commands::Status(args) => {
            let action: StatusAction = args.action.parse()?;
            let node = resolve_node(client, &args.target).await?;
            client
                .set_status(&ContainerStatusRequest::new(
                    node.clone(),
                    args.target.vmid,
                    action,
                ))
                .await?;
            Ok(format!(
                "Container {} on {}: {} requested\n",
                args.target.vmid, node, action
            ))
        }
        Commands::Delete(target) => {
            let node = resolve_node(client, &target).await?;
            client
                .delete_container(&ContainerDeleteRequest::new(node.clone(), target.vmid))
                .await?;
            Ok(format!("Deleted container {} on {}\n", target.vmid, node))
        }
    }
}
