//! Address space model
//!
//! Plain data types for networks, addresses, domains, name records and hosts.
//! Validation lives in the constructors; cross-entity rules live in
//! [`crate::inventory`] and [`crate::service`].

pub mod address;
pub mod host;
pub mod names;
pub mod network;
pub mod record;

pub use address::Address;
pub use host::{Host, Interface, MacAddress};
pub use network::{IpVersion, Network, DEFAULT_VLAN};
pub use record::{Domain, NameRecord, RecordId, RecordKey, RecordType};
