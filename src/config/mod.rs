//! Client configuration
//!
//! Connection settings and container-create defaults, loaded from a YAML file
//! (default: ~/.pvectl/config.yaml) with environment overrides.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default storage bucket holding container templates
pub const DEFAULT_TEMPLATE_STORAGE: &str = "templates";

/// Default storage bucket holding ISO images
pub const DEFAULT_ISO_STORAGE: &str = "ISOs";

/// Default config file location: ~/.pvectl/config.yaml
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".pvectl")
        .join("config.yaml")
}

/// Errors for config loading (separate from API errors)
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Connection settings for a PVE cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API host (e.g., "https://pve1.example.com:8006")
    pub host: String,

    /// Login name including realm (e.g., "root@pam")
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Skip TLS verification (self-signed PVE certificates)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    #[serde(default = "default_template_storage")]
    pub template_storage: String,

    #[serde(default = "default_iso_storage")]
    pub iso_storage: String,

    /// Fixed parameters applied to every container create
    #[serde(default)]
    pub create: CreateDefaults,
}

/// Fixed parameters of the container create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateDefaults {
    /// Swap allocation in MiB
    #[serde(default = "default_swap_mb")]
    pub swap_mb: u32,

    /// Bridge the container NIC is attached to
    #[serde(default = "default_bridge")]
    pub bridge: String,

    /// VLAN tag of the container NIC
    #[serde(default = "default_vlan_tag")]
    pub vlan_tag: u16,

    /// Interface name inside the container
    #[serde(default = "default_interface")]
    pub interface: String,
}

impl Default for CreateDefaults {
    fn default() -> Self {
        Self {
            swap_mb: default_swap_mb(),
            bridge: default_bridge(),
            vlan_tag: default_vlan_tag(),
            interface: default_interface(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_template_storage() -> String {
    DEFAULT_TEMPLATE_STORAGE.to_string()
}

fn default_iso_storage() -> String {
    DEFAULT_ISO_STORAGE.to_string()
}

fn default_swap_mb() -> u32 {
    512
}

fn default_bridge() -> String {
    "vmbr3".to_string()
}

fn default_vlan_tag() -> u16 {
    10
}

fn default_interface() -> String {
    "eth0".to_string()
}

impl ClientConfig {
    /// Create a config with defaults for everything but the credentials
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            username: username.into(),
            password: password.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            accept_invalid_certs: false,
            template_storage: default_template_storage(),
            iso_storage: default_iso_storage(),
            create: CreateDefaults::default(),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Accept self-signed certificates
    pub fn with_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Override fields from PVE_HOST, PVE_USERNAME, PVE_PASSWORD and PVE_TIMEOUT_SECS
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(host) = std::env::var("PVE_HOST") {
            self.host = host;
        }
        if let Ok(username) = std::env::var("PVE_USERNAME") {
            self.username = username;
        }
        if let Ok(password) = std::env::var("PVE_PASSWORD") {
            self.password = password;
        }
        if let Ok(timeout) = std::env::var("PVE_TIMEOUT_SECS") {
            self.timeout_secs = timeout
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PVE_TIMEOUT_SECS={}", timeout)))?;
        }
        Ok(())
    }

    /// Check the settings needed to reach the API
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Invalid("host must not be empty".to_string()));
        }
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "host must be an http(s) URL: {}",
                self.host
            )));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::Invalid("username must not be empty".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Parse config from YAML string
pub fn parse_config(content: &str) -> Result<ClientConfig, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load and parse a config file from disk, expanding a leading `~`
pub fn load_config_file(path: &Path) -> Result<ClientConfig, ConfigError> {
    let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
    let content = std::fs::read_to_string(expanded)?;
    parse_config(&content)
}
