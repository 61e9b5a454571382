//! Network blocks.

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::names::{validate_description, validate_network_name};

/// Default VLAN for networks that do not set one
pub const DEFAULT_VLAN: u16 = 1;

/// IP protocol version of a network or address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpVersion {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl IpVersion {
    /// Version of an address
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => IpVersion::V4,
            IpAddr::V6(_) => IpVersion::V6,
        }
    }

    /// Numeric version (4 or 6)
    pub fn number(self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

impl fmt::Display for IpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}

/// An IPv4 or IPv6 network block
///
/// Invariants:
/// - `cidr` is a network address (no host bits set)
/// - `gateway`, when present, lies inside `cidr`
/// - `vlan` is within 1..=4094
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Unique, immutable name
    pub name: String,

    /// Network block
    pub cidr: IpNet,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Gateway address
    #[serde(default)]
    pub gateway: Option<IpAddr>,

    /// DNS master for reverse resolution
    #[serde(default)]
    pub dns_master: Option<IpAddr>,

    /// DHCP server for the network
    #[serde(default)]
    pub dhcp_server: Option<IpAddr>,

    /// VLAN id handed out by RADIUS
    #[serde(default = "default_vlan")]
    pub vlan: u16,

    /// Contact email
    #[serde(default)]
    pub contact: Option<String>,
}

fn default_vlan() -> u16 {
    DEFAULT_VLAN
}

impl Network {
    /// Create a network from its base address and prefix length
    pub fn new(name: impl Into<String>, address: IpAddr, prefix: u8) -> Result<Self> {
        let name = name.into();
        validate_network_name(&name)?;

        let cidr = IpNet::new(address, prefix).map_err(|_| {
            Error::invalid_input(format!(
                "Prefix /{} is out of range for {}",
                prefix,
                IpVersion::of(&address)
            ))
        })?;

        if cidr.network() != address {
            return Err(Error::invalid_input(format!(
                "{}/{} has host bits set, network address is {}",
                address,
                prefix,
                cidr.network()
            )));
        }

        Ok(Self {
            name,
            cidr,
            description: String::new(),
            gateway: None,
            dns_master: None,
            dhcp_server: None,
            vlan: DEFAULT_VLAN,
            contact: None,
        })
    }

    /// Create a network from CIDR notation (e.g. "192.0.2.0/24")
    pub fn parse(name: impl Into<String>, cidr: &str) -> Result<Self> {
        let net: IpNet = cidr
            .parse()
            .map_err(|_| Error::invalid_input(format!("Invalid CIDR notation: {}", cidr)))?;
        // addr() keeps host bits so new() can reject them
        Self::new(name, net.addr(), net.prefix_len())
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the gateway; it must lie inside the network
    pub fn with_gateway(mut self, gateway: IpAddr) -> Result<Self> {
        self.check_member(gateway, "gateway")?;
        self.gateway = Some(gateway);
        Ok(self)
    }

    /// Set the DNS master
    pub fn with_dns_master(mut self, dns_master: IpAddr) -> Self {
        self.dns_master = Some(dns_master);
        self
    }

    /// Set the DHCP server
    pub fn with_dhcp_server(mut self, dhcp_server: IpAddr) -> Self {
        self.dhcp_server = Some(dhcp_server);
        self
    }

    /// Set the VLAN id
    pub fn with_vlan(mut self, vlan: u16) -> Result<Self> {
        check_vlan(vlan)?;
        self.vlan = vlan;
        Ok(self)
    }

    /// Set the contact email
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }

    /// IP version of the network
    pub fn version(&self) -> IpVersion {
        IpVersion::of(&self.cidr.network())
    }

    /// Base address
    pub fn address(&self) -> IpAddr {
        self.cidr.network()
    }

    /// Prefix length
    pub fn prefix(&self) -> u8 {
        self.cidr.prefix_len()
    }

    /// Re-check every invariant, for data that did not go through the builders
    pub fn validate(&self) -> Result<()> {
        validate_network_name(&self.name)?;
        validate_description(&self.description)?;
        if self.cidr.network() != self.cidr.addr() {
            return Err(Error::invalid_input(format!(
                "Network {}: {} has host bits set",
                self.name, self.cidr
            )));
        }
        if let Some(gateway) = self.gateway {
            self.check_member(gateway, "gateway")?;
        }
        check_vlan(self.vlan)
    }

    fn check_member(&self, ip: IpAddr, what: &str) -> Result<()> {
        if IpVersion::of(&ip) != self.version() || !self.cidr.contains(&ip) {
            return Err(Error::invalid_input(format!(
                "{} {} is not inside network {} ({})",
                what, ip, self.name, self.cidr
            )));
        }
        Ok(())
    }
}

fn check_vlan(vlan: u16) -> Result<()> {
    if !(1..=4094).contains(&vlan) {
        return Err(Error::invalid_input(format!(
            "Invalid VLAN ID: {} (must be 1-4094)",
            vlan
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_new() {
        let net = Network::new("lab", "192.0.2.0".parse().unwrap(), 24).unwrap();
        assert_eq!(net.version(), IpVersion::V4);
        assert_eq!(net.prefix(), 24);
        assert_eq!(net.vlan, DEFAULT_VLAN);
        assert_eq!(net.cidr.to_string(), "192.0.2.0/24");
    }

    #[test]
    fn test_network_rejects_host_bits() {
        let err = Network::parse("lab", "192.0.2.7/24").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_network_rejects_prefix_out_of_range() {
        assert!(Network::new("lab", "192.0.2.0".parse().unwrap(), 33).is_err());
        assert!(Network::new("v6", "2001:db8::".parse().unwrap(), 129).is_err());
        assert!(Network::new("v6", "2001:db8::".parse().unwrap(), 64).is_ok());
    }

    #[test]
    fn test_gateway_must_be_inside() {
        let net = Network::parse("lab", "192.0.2.0/24").unwrap();
        assert!(net.clone().with_gateway("192.0.2.254".parse().unwrap()).is_ok());
        assert!(net.clone().with_gateway("198.51.100.1".parse().unwrap()).is_err());
        assert!(net.with_gateway("2001:db8::1".parse().unwrap()).is_err());
    }

    #[test]
    fn test_vlan_range() {
        let net = Network::parse("lab", "192.0.2.0/24").unwrap();
        assert!(net.clone().with_vlan(0).is_err());
        assert!(net.clone().with_vlan(4095).is_err());
        assert_eq!(net.with_vlan(42).unwrap().vlan, 42);
    }

    #[test]
    fn test_network_name_must_be_file_safe() {
        let err = Network::parse("../../escaped", "192.0.2.0/24").unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(Network::parse("lab\"{", "192.0.2.0/24").is_err());
        assert!(Network::parse("lab-2.east", "192.0.2.0/24").is_ok());
    }

    #[test]
    fn test_validate_catches_loaded_names() {
        let net: Network =
            serde_json::from_str(r#"{"name":"../out","cidr":"192.0.2.0/24"}"#).unwrap();
        assert!(net.validate().is_err());

        let net = Network::parse("lab", "192.0.2.0/24")
            .unwrap()
            .with_description("two\nlines");
        assert!(net.validate().is_err());
    }

    #[test]
    fn test_network_serde_defaults() {
        let net: Network =
            serde_json::from_str(r#"{"name":"lab","cidr":"192.0.2.0/24"}"#).unwrap();
        assert_eq!(net.vlan, 1);
        assert!(net.gateway.is_none());
        assert!(net.validate().is_ok());
    }
}
