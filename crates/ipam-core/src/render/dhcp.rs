//! ISC DHCP renderer
//!
//! Produces two files per IPv4 network: fixed `host` reservations and a
//! dynamic class listing hosts that live on the network without a fixed
//! address. IPv6 networks render nothing.

use std::fmt::Write as _;

use tracing::warn;

use crate::allocator;
use crate::inventory::Inventory;
use crate::model::{Host, IpVersion, MacAddress, Network};

/// Rendered DHCP outputs for one network
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DhcpConfig {
    /// `host NAME { ... }` reservations
    pub fixed: String,
    /// Dynamic class and its subclass members
    pub dynamic: String,
}

/// Render the reservations and dynamic class of `network`
pub fn render_dhcp(network: &Network, inventory: &Inventory) -> DhcpConfig {
    if network.version() == IpVersion::V6 {
        return DhcpConfig::default();
    }

    let mut fixed = format!(
        "# fixed reservations for network {} generated by ipam\n",
        network.name
    );
    let mut members: Vec<(&Host, MacAddress)> = Vec::new();

    for host in inventory.hosts() {
        let Some(mac) = host.mac().filter(|_| host.dhcp) else {
            continue;
        };
        if let Err(e) = host.validate() {
            warn!("Host {:?} left out of DHCP for network {}: {}", host.name, network.name, e);
            continue;
        }

        match host
            .addresses
            .iter()
            .find(|ip| allocator::contains(network, **ip))
        {
            Some(ip) => {
                // writing into a String cannot fail
                let _ = write!(
                    fixed,
                    "host {} {{\n    hardware ethernet {};\n    fixed-address {};\n}}\n",
                    host.name, mac, ip
                );
            }
            None if host.network.as_deref() == Some(network.name.as_str()) => {
                members.push((host, mac));
            }
            None => {}
        }
    }

    let mut dynamic = format!(
        "# dynamic class for network {} generated by ipam\nclass \"{}\" {{\n    match hardware;\n}}\n",
        network.name, network.name
    );
    for (host, mac) in members {
        let _ = writeln!(dynamic, "subclass \"{}\" 1:{}; # {}", network.name, mac, host.name);
    }

    DhcpConfig { fixed, dynamic }
}
