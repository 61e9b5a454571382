//! Configuration types for the IPAM system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::render::DEFAULT_REJECT_MESSAGE;

/// Main IPAM configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpamConfig {
    /// Inventory repository configuration
    #[serde(default)]
    pub repository: RepositoryConfig,

    /// Where generated artifacts are written
    #[serde(default)]
    pub output: OutputConfig,

    /// Defaults for freshly created zone-control files
    #[serde(default)]
    pub soa: SoaConfig,

    /// Authentication file settings
    #[serde(default)]
    pub radius: RadiusConfig,
}

impl IpamConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.repository.validate()?;
        self.output.validate()?;
        self.soa.validate()?;
        self.radius.validate()?;
        Ok(())
    }
}

/// Inventory repository configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepositoryConfig {
    /// JSON file repository
    File {
        /// Path to the inventory file
        path: String,
    },

    /// In-memory repository (not persistent)
    #[default]
    Memory,
}

impl RepositoryConfig {
    /// Validate the repository configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            RepositoryConfig::File { path } if path.is_empty() => Err(crate::Error::config(
                "File repository path cannot be empty",
            )),
            _ => Ok(()),
        }
    }

    /// Get the repository type name
    pub fn type_name(&self) -> &str {
        match self {
            RepositoryConfig::File { .. } => "file",
            RepositoryConfig::Memory => "memory",
        }
    }
}

/// Output directory layout
///
/// ```text
/// <root>/bind/<domain>.db        <root>/bind/<domain>.soa.db
/// <root>/bind/<block>.db         <root>/bind/<block>.soa.db
/// <root>/dhcp/<network>.conf     <root>/dhcp/<network>.dynamic.conf
/// <root>/radius/users
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory of all generated files
    #[serde(default = "default_output_root")]
    pub root: PathBuf,
}

impl OutputConfig {
    /// Create an output layout under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Validate the output configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.root.as_os_str().is_empty() {
            return Err(crate::Error::config("Output directory cannot be empty"));
        }
        Ok(())
    }

    /// Directory holding zone and zone-control files
    pub fn bind_dir(&self) -> PathBuf {
        self.root.join("bind")
    }

    /// Directory holding DHCP fragments
    pub fn dhcp_dir(&self) -> PathBuf {
        self.root.join("dhcp")
    }

    /// Records file of a zone (`<stem>.db`)
    pub fn zone_file(&self, stem: &str) -> PathBuf {
        self.bind_dir().join(format!("{}.db", stem))
    }

    /// Zone-control file of a zone (`<stem>.soa.db`)
    pub fn soa_file(&self, stem: &str) -> PathBuf {
        self.bind_dir().join(format!("{}.soa.db", stem))
    }

    /// Fixed reservations of a network
    pub fn dhcp_fixed(&self, network: &str) -> PathBuf {
        self.dhcp_dir().join(format!("{}.conf", network))
    }

    /// Dynamic class of a network
    pub fn dhcp_dynamic(&self, network: &str) -> PathBuf {
        self.dhcp_dir().join(format!("{}.dynamic.conf", network))
    }

    /// FreeRADIUS authorization file
    pub fn radius_users(&self) -> PathBuf {
        self.root.join("radius").join("users")
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: default_output_root(),
        }
    }
}

fn default_output_root() -> PathBuf {
    PathBuf::from("output")
}

/// Defaults written into new zone-control files
///
/// Timers are in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaConfig {
    /// Primary name server of the zone
    #[serde(default = "default_primary_ns")]
    pub primary_ns: String,

    /// Responsible mailbox in DNS notation (`hostmaster.example.com`)
    #[serde(default = "default_hostmaster")]
    pub hostmaster: String,

    /// Default TTL
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    #[serde(default = "default_refresh")]
    pub refresh: u32,

    #[serde(default = "default_retry")]
    pub retry: u32,

    #[serde(default = "default_expire")]
    pub expire: u32,

    /// Negative caching TTL
    #[serde(default = "default_minimum")]
    pub minimum: u32,
}

impl SoaConfig {
    /// Validate the zone-control defaults
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.primary_ns.trim().is_empty() {
            return Err(crate::Error::config("SOA primary name server cannot be empty"));
        }
        if self.hostmaster.trim().is_empty() {
            return Err(crate::Error::config("SOA hostmaster cannot be empty"));
        }
        if self.refresh == 0 || self.retry == 0 || self.expire == 0 {
            return Err(crate::Error::config(
                "SOA refresh, retry and expire must be > 0",
            ));
        }
        if self.expire <= self.refresh {
            return Err(crate::Error::config("SOA expire must exceed refresh"));
        }
        Ok(())
    }
}

impl Default for SoaConfig {
    fn default() -> Self {
        Self {
            primary_ns: default_primary_ns(),
            hostmaster: default_hostmaster(),
            ttl: default_ttl(),
            refresh: default_refresh(),
            retry: default_retry(),
            expire: default_expire(),
            minimum: default_minimum(),
        }
    }
}

fn default_primary_ns() -> String {
    "ns.localhost".to_string()
}

fn default_hostmaster() -> String {
    "hostmaster.localhost".to_string()
}

fn default_ttl() -> u32 {
    86400
}

fn default_refresh() -> u32 {
    28800
}

fn default_retry() -> u32 {
    7200
}

fn default_expire() -> u32 {
    604800
}

fn default_minimum() -> u32 {
    86400
}

/// Authentication file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RadiusConfig {
    /// Reply message of the catch-all reject entry
    #[serde(default = "default_reject_message")]
    pub reject_message: String,
}

impl RadiusConfig {
    /// Validate the authentication file configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.reject_message.contains('\n') {
            return Err(crate::Error::config(
                "RADIUS reject message must fit on one line",
            ));
        }
        Ok(())
    }
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            reject_message: default_reject_message(),
        }
    }
}

fn default_reject_message() -> String {
    DEFAULT_REJECT_MESSAGE.to_string()
}
