//! FreeRADIUS `users` renderer
//!
//! ```text
//! 00:11:22:33:44:55 Cleartext-Password := 00:11:22:33:44:55
//!     Tunnel-Type = VLAN,
//!     Tunnel-Medium-Type = IEEE-802,
//!     Tunnel-Private-Group-Id = 42
//! DEFAULT Auth-Type := Reject
//!     Reply-Message = "No authorisation"
//! ```
//!
//! No timestamp goes into the file so diffs only show real changes.

use std::fmt::Write as _;

use crate::inventory::Inventory;
use crate::model::{DEFAULT_VLAN, Host};

/// Reply message of the catch-all reject entry
pub const DEFAULT_REJECT_MESSAGE: &str = "No authorisation";

/// Render one entry per host with an interface, then the reject stanza
pub fn render_users(inventory: &Inventory, reject_message: &str) -> String {
    let mut out = String::new();

    for host in inventory.hosts() {
        let Some(mac) = host.mac() else {
            continue;
        };
        // writing into a String cannot fail
        let _ = write!(
            out,
            "{mac} Cleartext-Password := {mac}\n    Tunnel-Type = VLAN,\n    \
             Tunnel-Medium-Type = IEEE-802,\n    Tunnel-Private-Group-Id = {vlan}\n",
            mac = mac,
            vlan = host_vlan(host, inventory)
        );
    }

    let _ = write!(
        out,
        "DEFAULT Auth-Type := Reject\n    Reply-Message = \"{}\"\n",
        reject_message.replace('"', "'")
    );
    out
}

/// Home network VLAN, else the network owning the first address, else 1
fn host_vlan(host: &Host, inventory: &Inventory) -> u16 {
    host.network
        .as_deref()
        .and_then(|name| inventory.network(name))
        .or_else(|| {
            host.addresses
                .first()
                .and_then(|ip| inventory.owning_network(ip))
        })
        .map_or(DEFAULT_VLAN, |network| network.vlan)
}
