//! Inputs and outputs of service operations

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::model::{Interface, Network};

/// Partial update of a network's mutable fields
///
/// `None` leaves a field unchanged. The name and CIDR never change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkUpdate {
    pub description: Option<String>,
    pub gateway: Option<IpAddr>,
    pub dns_master: Option<IpAddr>,
    pub dhcp_server: Option<IpAddr>,
    pub vlan: Option<u16>,
    pub contact: Option<String>,
}

/// A network with every address allocated in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkDetails {
    /// The network
    pub network: Network,
    /// Allocated addresses, ascending
    pub addresses: Vec<AddressDetails>,
    /// Usable addresses not yet allocated
    pub available: u128,
}

/// One allocated address and the name it resolves back to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressDetails {
    pub ip: IpAddr,
    /// Fully qualified name of the linked PTR record
    pub ptr: Option<String>,
}

/// How a new host gets its address
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HostAddress {
    /// No address
    #[default]
    None,
    /// A specific address, created when not yet allocated
    Fixed(IpAddr),
    /// The first free address of the host's network
    Allocate,
}

/// Request to create a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub name: String,
    pub interface: Option<Interface>,
    /// Home network name
    pub network: Option<String>,
    pub address: HostAddress,
    pub dhcp: bool,
}

impl HostRequest {
    /// Host with no interface, network or address, taking part in DHCP
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: None,
            network: None,
            address: HostAddress::None,
            dhcp: true,
        }
    }

    pub fn with_interface(mut self, interface: Interface) -> Self {
        self.interface = Some(interface);
        self
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = Some(network.into());
        self
    }

    pub fn with_address(mut self, address: HostAddress) -> Self {
        self.address = address;
        self
    }

    pub fn with_dhcp(mut self, dhcp: bool) -> Self {
        self.dhcp = dhcp;
        self
    }
}

/// What to delete along with a host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostRemoval {
    /// Remove addresses no other host holds
    pub addresses: bool,
    /// Also remove records left unreferenced by those addresses
    pub records: bool,
}
