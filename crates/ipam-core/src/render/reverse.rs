//! Reverse zone renderer
//!
//! IPv4 networks wider than /24 are split into /24 delegation blocks, one
//! zone per block. Everything else, IPv6 included, is a single block.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::inventory::Inventory;
use crate::model::{Network, RecordType};
use crate::render::zone::{ResourceLine, Zone};

/// Prefix of an IPv4 reverse delegation block
pub const DELEGATION_PREFIX: u8 = 24;

/// Reverse zone for one delegation block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReverseZone {
    /// Block covered by the zone
    pub block: IpNet,
    /// Rendered records
    pub zone: Zone,
}

impl ReverseZone {
    /// Stem used for the zone's file names
    pub fn file_stem(&self) -> String {
        block_file_stem(&self.block)
    }
}

/// Reverse lookup name of an address, without trailing dot
///
/// `192.0.2.5` gives `5.2.0.192.in-addr.arpa`; IPv6 uses nibbles under `ip6.arpa`.
pub fn reverse_pointer(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{}.{}.{}.{}.in-addr.arpa", d, c, b, a)
        }
        IpAddr::V6(v6) => {
            let hex = format!("{:032x}", u128::from(v6));
            let mut name = String::with_capacity(72);
            for nibble in hex.chars().rev() {
                name.push(nibble);
                name.push('.');
            }
            name.push_str("ip6.arpa");
            name
        }
    }
}

/// Blocks a network's reverse zone is split into
pub fn delegation_blocks(network: &Network) -> Vec<IpNet> {
    match network.cidr {
        IpNet::V4(net) if net.prefix_len() < DELEGATION_PREFIX => match net.subnets(DELEGATION_PREFIX) {
            Ok(subnets) => subnets.map(IpNet::V4).collect(),
            Err(_) => vec![network.cidr],
        },
        _ => vec![network.cidr],
    }
}

/// File stem of a block: its network address, colons dropped for IPv6
pub fn block_file_stem(block: &IpNet) -> String {
    match block {
        IpNet::V4(net) => net.network().to_string(),
        IpNet::V6(net) => net.network().to_string().replace(':', ""),
    }
}

/// Render one reverse zone per delegation block of `network`
pub fn render_reverse(network: &Network, inventory: &Inventory) -> Vec<ReverseZone> {
    let ptr = RecordType::Ptr;

    delegation_blocks(network)
        .into_iter()
        .map(|block| {
            let mut zone = Zone::new(format!(
                "reverse zone {} for network {} generated by ipam",
                block, network.name
            ));

            for address in inventory.addresses_within(&block) {
                for record in inventory.linked_records(address, &ptr) {
                    zone.lines.push(ResourceLine::new(
                        reverse_pointer(address.ip),
                        "PTR",
                        format!("{}.", record.fqdn()),
                    ));
                }
            }

            ReverseZone { block, zone }
        })
        .collect()
}
