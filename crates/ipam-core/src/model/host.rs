//! Hosts and their network interfaces.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::model::names::validate_host_name;

/// A 48-bit MAC address, displayed as `00:11:22:33:44:55`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Build from raw octets
    pub fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Raw octets
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::invalid_input(format!("Invalid MAC address format: '{}'", s));

        let separator = if s.contains('-') { '-' } else { ':' };
        let mut octets = [0u8; 6];
        let mut parts = s.split(separator);
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or_else(invalid)?;
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({})", self)
    }
}

impl Serialize for MacAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MacAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A network interface bound to a host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// Hardware address
    pub mac: MacAddress,
    /// Name of the machine carrying the interface
    #[serde(default)]
    pub hardware: Option<String>,
}

impl Interface {
    /// Create an interface
    pub fn new(mac: MacAddress) -> Self {
        Self {
            mac,
            hardware: None,
        }
    }

    /// Set the hardware name
    pub fn with_hardware(mut self, hardware: impl Into<String>) -> Self {
        self.hardware = Some(hardware.into());
        self
    }
}

/// Binding of interface, home network and addresses under one name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Unique host name
    pub name: String,
    /// Bound interface
    #[serde(default)]
    pub interface: Option<Interface>,
    /// Home network name
    #[serde(default)]
    pub network: Option<String>,
    /// Addresses held by the host, in insertion order
    #[serde(default)]
    pub addresses: Vec<IpAddr>,
    /// Participate in DHCP
    #[serde(default = "default_dhcp")]
    pub dhcp: bool,
}

fn default_dhcp() -> bool {
    true
}

impl Host {
    /// Create a host with no interface, network or address
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_host_name(&name)?;
        Ok(Self {
            name,
            interface: None,
            network: None,
            addresses: Vec::new(),
            dhcp: default_dhcp(),
        })
    }

    /// Bind an interface
    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Set the home network
    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    /// Add an address
    pub fn with_address(mut self, ip: IpAddr) -> Self {
        self.add_address(ip);
        self
    }

    /// Set DHCP participation
    pub fn with_dhcp(mut self, dhcp: bool) -> Self {
        self.dhcp = dhcp;
        self
    }

    /// Add an address; returns false if already held
    pub fn add_address(&mut self, ip: IpAddr) -> bool {
        if self.addresses.contains(&ip) {
            return false;
        }
        self.addresses.push(ip);
        true
    }

    /// MAC address of the bound interface
    pub fn mac(&self) -> Option<MacAddress> {
        self.interface.as_ref().map(|interface| interface.mac)
    }

    /// Re-check the name, for data that did not go through [`Host::new`]
    pub fn validate(&self) -> Result<()> {
        validate_host_name(&self.name)
    }
}
