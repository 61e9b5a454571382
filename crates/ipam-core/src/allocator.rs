//! IP allocator
//!
//! Containment testing and free-address search over a network. Everything
//! here is pure: [`free_address`] picks an address but reserves nothing, the
//! caller has to persist the result before the next search can see it.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::ops::RangeInclusive;

use ipnet::IpNet;

use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::model::{IpVersion, Network};

/// True iff the versions match and `ip` falls inside the network block
pub fn contains(network: &Network, ip: IpAddr) -> bool {
    IpVersion::of(&ip) == network.version() && network.cidr.contains(&ip)
}

/// Ascending iterator over the usable host addresses of a network
///
/// IPv4 skips the network and broadcast addresses except on /31 and /32.
/// IPv6 skips the subnet-router anycast address except on /127 and /128.
pub fn usable_hosts(network: &Network) -> UsableHosts {
    UsableHosts {
        range: host_range(&network.cidr),
    }
}

/// First usable address that is neither allocated nor the gateway
pub fn free_address(network: &Network, inventory: &Inventory) -> Result<IpAddr> {
    usable_hosts(network)
        .find(|ip| !inventory.is_allocated(ip) && network.gateway != Some(*ip))
        .ok_or_else(|| Error::network_full(&network.name))
}

/// Whether `ip` is one of the network's usable host addresses
pub fn is_usable(network: &Network, ip: IpAddr) -> bool {
    if !contains(network, ip) {
        return false;
    }
    match (host_range(&network.cidr), ip) {
        (HostRange::V4(range), IpAddr::V4(v4)) => range.contains(&u32::from(v4)),
        (HostRange::V6(range), IpAddr::V6(v6)) => range.contains(&u128::from(v6)),
        _ => false,
    }
}

/// Number of addresses [`free_address`] could still hand out
pub fn available_count(network: &Network, inventory: &Inventory) -> u128 {
    let total = match host_range(&network.cidr) {
        HostRange::V4(range) => range_len(*range.start() as u128, *range.end() as u128),
        HostRange::V6(range) => range_len(*range.start(), *range.end()),
    };

    let allocated = inventory
        .addresses_in(network)
        .filter(|address| is_usable(network, address.ip))
        .count() as u128;

    let gateway = network
        .gateway
        .filter(|gw| is_usable(network, *gw) && !inventory.is_allocated(gw))
        .map_or(0, |_| 1);

    total.saturating_sub(allocated + gateway)
}

fn range_len(start: u128, end: u128) -> u128 {
    if end < start {
        0
    } else {
        (end - start).saturating_add(1)
    }
}

#[derive(Debug, Clone)]
enum HostRange {
    V4(RangeInclusive<u32>),
    V6(RangeInclusive<u128>),
}

fn host_range(cidr: &IpNet) -> HostRange {
    match cidr {
        IpNet::V4(net) => {
            let network = u32::from(net.network());
            let broadcast = u32::from(net.broadcast());
            let range = match net.prefix_len() {
                32 | 31 => network..=broadcast,
                _ => network + 1..=broadcast - 1,
            };
            HostRange::V4(range)
        }
        IpNet::V6(net) => {
            let network = u128::from(net.network());
            let last = u128::from(net.broadcast());
            let range = match net.prefix_len() {
                128 | 127 => network..=last,
                _ => network + 1..=last,
            };
            HostRange::V6(range)
        }
    }
}

/// Iterator returned by [`usable_hosts`]
#[derive(Debug, Clone)]
pub struct UsableHosts {
    range: HostRange,
}

impl Iterator for UsableHosts {
    type Item = IpAddr;

    fn next(&mut self) -> Option<IpAddr> {
        match &mut self.range {
            HostRange::V4(range) => range.next().map(|n| IpAddr::V4(Ipv4Addr::from(n))),
            HostRange::V6(range) => range.next().map(|n| IpAddr::V6(Ipv6Addr::from(n))),
        }
    }
}
