//! # pvectl
//!
//! Control-plane client for Proxmox VE clusters.
//!
//! - [`session`]: ticket authentication, cookie + CSRF handling, transparent
//!   re-authentication before every privileged call
//! - [`inventory`]: typed view of `/cluster/resources`
//! - [`placement`]: least-provisioned-memory node selection
//! - [`lifecycle`]: container create / status / delete dispatch
//!
//! ```no_run
//! use pvectl::{ClientConfig, PveClient};
//!
//! # async fn demo() -> pvectl::Result<()> {
//! let client = PveClient::connect(ClientConfig::new(
//!     "https://pve1.example.com:8006",
//!     "root@pam",
//!     "secret",
//! ))
//! .await?;
//! let node = client.pick_node().await?;
//! client.start_container(&node, 105).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod placement;
pub mod session;
pub mod template;

pub use client::{ClusterService, PveClient};
pub use config::ClientConfig;
pub use error::{PveError, Result};
pub use inventory::{Inventory, Resource, ResourceKind};
pub use lifecycle::{
    ContainerCreateRequest, ContainerDeleteRequest, ContainerStatusRequest, StatusAction,
};
pub use placement::pick_node;
pub use session::{Credential, SessionManager};
pub use template::{parse_template, ParsedTemplate};
