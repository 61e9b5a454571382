//! In-memory inventory snapshot
//!
//! [`Inventory`] holds every entity keyed the way the repository addresses
//! them. Renderers and the allocator read from it; repositories persist it.
//! Address ownership is always derived by containment, never stored.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;

use serde::{Deserialize, Serialize};

use crate::allocator;
use crate::model::{Address, Domain, Host, NameRecord, Network, RecordId, RecordKey, RecordType};

/// Any entity the repository stores
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    /// A network block
    Network(Network),
    /// An allocated address
    Address(Address),
    /// A DNS domain
    Domain(Domain),
    /// A name record
    Record(NameRecord),
    /// A host
    Host(Host),
}

impl Entity {
    /// Primary key of the entity
    pub fn key(&self) -> EntityKey {
        match self {
            Entity::Network(network) => EntityKey::Network(network.name.clone()),
            Entity::Address(address) => EntityKey::Address(address.ip),
            Entity::Domain(domain) => EntityKey::Domain(domain.name.clone()),
            Entity::Record(record) => EntityKey::Record(record.id),
            Entity::Host(host) => EntityKey::Host(host.name.clone()),
        }
    }
}

/// Primary key of a stored entity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    /// Network by name
    Network(String),
    /// Address by IP
    Address(IpAddr),
    /// Domain by name
    Domain(String),
    /// Record by id
    Record(RecordId),
    /// Host by name
    Host(String),
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Network(name) => write!(f, "network {}", name),
            EntityKey::Address(ip) => write!(f, "address {}", ip),
            EntityKey::Domain(name) => write!(f, "domain {}", name),
            EntityKey::Record(id) => write!(f, "record {}", id),
            EntityKey::Host(name) => write!(f, "host {}", name),
        }
    }
}

/// One staged change, applied through [`Inventory::apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Create or replace
    Insert(Entity),
    /// Delete if present
    Remove(EntityKey),
}

/// Snapshot of the whole inventory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "InventoryData", into = "InventoryData")]
pub struct Inventory {
    networks: BTreeMap<String, Network>,
    addresses: BTreeMap<IpAddr, Address>,
    domains: BTreeMap<String, Domain>,
    records: BTreeMap<RecordId, NameRecord>,
    hosts: BTreeMap<String, Host>,
}

/// Serialized form: flat lists, each entity carrying its own key
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct InventoryData {
    #[serde(default)]
    networks: Vec<Network>,
    #[serde(default)]
    addresses: Vec<Address>,
    #[serde(default)]
    domains: Vec<Domain>,
    #[serde(default)]
    records: Vec<NameRecord>,
    #[serde(default)]
    hosts: Vec<Host>,
}

impl From<InventoryData> for Inventory {
    fn from(data: InventoryData) -> Self {
        Self {
            networks: data.networks.into_iter().map(|n| (n.name.clone(), n)).collect(),
            addresses: data.addresses.into_iter().map(|a| (a.ip, a)).collect(),
            domains: data.domains.into_iter().map(|d| (d.name.clone(), d)).collect(),
            records: data.records.into_iter().map(|r| (r.id, r)).collect(),
            hosts: data.hosts.into_iter().map(|h| (h.name.clone(), h)).collect(),
        }
    }
}

impl From<Inventory> for InventoryData {
    fn from(inventory: Inventory) -> Self {
        Self {
            networks: inventory.networks.into_values().collect(),
            addresses: inventory.addresses.into_values().collect(),
            domains: inventory.domains.into_values().collect(),
            records: inventory.records.into_values().collect(),
            hosts: inventory.hosts.into_values().collect(),
        }
    }
}

impl Inventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace an entity, returning the previous value
    pub fn insert(&mut self, entity: Entity) -> Option<Entity> {
        match entity {
            Entity::Network(n) => self.networks.insert(n.name.clone(), n).map(Entity::Network),
            Entity::Address(a) => self.addresses.insert(a.ip, a).map(Entity::Address),
            Entity::Domain(d) => self.domains.insert(d.name.clone(), d).map(Entity::Domain),
            Entity::Record(r) => self.records.insert(r.id, r).map(Entity::Record),
            Entity::Host(h) => self.hosts.insert(h.name.clone(), h).map(Entity::Host),
        }
    }

    /// Remove an entity, returning it if it existed
    pub fn remove(&mut self, key: &EntityKey) -> Option<Entity> {
        match key {
            EntityKey::Network(name) => self.networks.remove(name).map(Entity::Network),
            EntityKey::Address(ip) => self.addresses.remove(ip).map(Entity::Address),
            EntityKey::Domain(name) => self.domains.remove(name).map(Entity::Domain),
            EntityKey::Record(id) => self.records.remove(id).map(Entity::Record),
            EntityKey::Host(name) => self.hosts.remove(name).map(Entity::Host),
        }
    }

    /// Apply one mutation; true when something changed
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::Insert(entity) => {
                self.insert(entity);
                true
            }
            Mutation::Remove(key) => self.remove(&key).is_some(),
        }
    }

    /// Fetch a copy of an entity
    pub fn fetch(&self, key: &EntityKey) -> Option<Entity> {
        match key {
            EntityKey::Network(name) => self.network(name).cloned().map(Entity::Network),
            EntityKey::Address(ip) => self.address(ip).cloned().map(Entity::Address),
            EntityKey::Domain(name) => self.domain(name).cloned().map(Entity::Domain),
            EntityKey::Record(id) => self.record(*id).cloned().map(Entity::Record),
            EntityKey::Host(name) => self.host(name).cloned().map(Entity::Host),
        }
    }

    /// Networks in name order
    pub fn networks(&self) -> impl Iterator<Item = &Network> {
        self.networks.values()
    }

    /// Addresses in ascending order (IPv4 before IPv6)
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.addresses.values()
    }

    /// Domains in name order
    pub fn domains(&self) -> impl Iterator<Item = &Domain> {
        self.domains.values()
    }

    /// Records in creation order
    pub fn records(&self) -> impl Iterator<Item = &NameRecord> {
        self.records.values()
    }

    /// Hosts in name order
    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Network by name
    pub fn network(&self, name: &str) -> Option<&Network> {
        self.networks.get(name)
    }

    /// Address by IP
    pub fn address(&self, ip: &IpAddr) -> Option<&Address> {
        self.addresses.get(ip)
    }

    /// Whether an address is allocated
    pub fn is_allocated(&self, ip: &IpAddr) -> bool {
        self.addresses.contains_key(ip)
    }

    /// Domain by name
    pub fn domain(&self, name: &str) -> Option<&Domain> {
        self.domains.get(name)
    }

    /// Record by id
    pub fn record(&self, id: RecordId) -> Option<&NameRecord> {
        self.records.get(&id)
    }

    /// Record by its unique (name, domain, type) triple
    pub fn find_record(&self, key: &RecordKey) -> Option<&NameRecord> {
        self.records
            .values()
            .find(|r| r.name == key.name && r.domain == key.domain && r.kind == key.kind)
    }

    /// Host by name
    pub fn host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }

    /// First network, in name order, containing the address
    pub fn owning_network(&self, ip: &IpAddr) -> Option<&Network> {
        self.networks
            .values()
            .find(|network| allocator::contains(network, *ip))
    }

    /// Allocated addresses inside a network, ascending
    pub fn addresses_in<'a>(&'a self, network: &'a Network) -> impl Iterator<Item = &'a Address> {
        self.addresses_within(&network.cidr)
            .filter(move |address| allocator::contains(network, address.ip))
    }

    /// Allocated addresses inside a prefix, ascending
    ///
    /// Only keys in the prefix range are visited.
    pub fn addresses_within(&self, prefix: &IpNet) -> impl Iterator<Item = &Address> + '_ {
        self.addresses
            .range(prefix.network()..=prefix.broadcast())
            .map(|(_, address)| address)
    }

    /// Records of a domain, ordered by name then creation order
    pub fn records_in_domain(&self, domain: &str) -> Vec<&NameRecord> {
        let mut records: Vec<&NameRecord> = self
            .records
            .values()
            .filter(|record| record.domain == domain)
            .collect();
        records.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        records
    }

    /// Addresses linking a record, ascending
    pub fn addresses_linking(&self, id: RecordId) -> impl Iterator<Item = &Address> {
        self.addresses
            .values()
            .filter(move |address| address.is_linked(id))
    }

    /// Records linked to an address with the given type
    pub fn linked_records<'a>(
        &'a self,
        address: &'a Address,
        kind: &'a RecordType,
    ) -> impl Iterator<Item = &'a NameRecord> {
        address
            .records
            .iter()
            .filter_map(|id| self.records.get(id))
            .filter(move |record| &record.kind == kind)
    }

    /// Whether any address links the record or any CNAME targets it
    pub fn is_referenced(&self, id: RecordId) -> bool {
        self.addresses.values().any(|address| address.is_linked(id))
            || self.records.values().any(|record| record.target == Some(id))
    }

    /// Hosts holding an address
    pub fn hosts_holding(&self, ip: &IpAddr) -> impl Iterator<Item = &Host> {
        self.hosts
            .values()
            .filter(move |host| host.addresses.contains(ip))
    }

    /// Next unused record id
    pub fn next_record_id(&self) -> RecordId {
        RecordId(self.records.keys().next_back().map_or(1, |id| id.0 + 1))
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        self.networks.len()
            + self.addresses.len()
            + self.domains.len()
            + self.records.len()
            + self.hosts.len()
    }

    /// Whether the inventory is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invariant violations in data that bypassed the service layer
    ///
    /// Loaded files are checked with this rather than rejected outright.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for network in self.networks.values() {
            if let Err(e) = network.validate() {
                problems.push(e.to_string());
            }
        }

        for address in self.addresses.values() {
            if self.owning_network(&address.ip).is_none() {
                problems.push(format!("Address {} is not inside any network", address.ip));
            }
            for id in &address.records {
                if !self.records.contains_key(id) {
                    problems.push(format!(
                        "Address {} links missing record {}",
                        address.ip, id
                    ));
                }
            }
        }

        for domain in self.domains.values() {
            if let Err(e) = domain.validate() {
                problems.push(format!("Domain {}: {}", domain.name.escape_debug(), e));
            }
        }

        for record in self.records.values() {
            if let Err(e) = record.validate() {
                problems.push(format!("Record {}: {}", record.id, e));
            }
            if !self.domains.contains_key(&record.domain) {
                problems.push(format!(
                    "Record {} belongs to missing domain {}",
                    record.fqdn(),
                    record.domain
                ));
            }
            if let Some(target) = record.target
                && !self.records.contains_key(&target)
            {
                problems.push(format!(
                    "CNAME {} targets missing record {}",
                    record.fqdn(),
                    target
                ));
            }
        }

        for host in self.hosts.values() {
            if let Err(e) = host.validate() {
                problems.push(e.to_string());
            }
            if let Some(network) = &host.network
                && !self.networks.contains_key(network)
            {
                problems.push(format!(
                    "Host {} references missing network {}",
                    host.name, network
                ));
            }
            for ip in &host.addresses {
                if !self.addresses.contains_key(ip) {
                    problems.push(format!("Host {} holds unknown address {}", host.name, ip));
                }
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Inventory {
        let mut inventory = Inventory::new();
        inventory.insert(Entity::Network(Network::parse("lab", "192.0.2.0/24").unwrap()));
        inventory.insert(Entity::Network(Network::parse("dmz", "198.51.100.0/24").unwrap()));
        inventory.insert(Entity::Domain(Domain::new("example.com").unwrap()));
        for ip in ["192.0.2.20", "198.51.100.1", "192.0.2.3"] {
            inventory.insert(Entity::Address(Address::new(ip.parse().unwrap())));
        }
        inventory
    }

    #[test]
    fn test_owning_network() {
        let inventory = sample();
        let ip: IpAddr = "198.51.100.1".parse().unwrap();
        assert_eq!(inventory.owning_network(&ip).unwrap().name, "dmz");

        let outside: IpAddr = "203.0.113.1".parse().unwrap();
        assert!(inventory.owning_network(&outside).is_none());
    }

    #[test]
    fn test_addresses_in_is_ascending_and_scoped() {
        let inventory = sample();
        let lab = inventory.network("lab").unwrap();
        let ips: Vec<String> = inventory
            .addresses_in(lab)
            .map(|a| a.ip.to_string())
            .collect();
        assert_eq!(ips, vec!["192.0.2.3", "192.0.2.20"]);
    }

    #[test]
    fn test_addresses_within_stays_in_prefix() {
        let mut inventory = Inventory::new();
        for ip in ["10.16.2.255", "10.16.3.0", "10.16.3.7", "10.16.3.255", "10.16.4.0"] {
            inventory.insert(Entity::Address(Address::new(ip.parse().unwrap())));
        }
        inventory.insert(Entity::Address(Address::new("2001:db8::1".parse().unwrap())));

        let block: IpNet = "10.16.3.0/24".parse().unwrap();
        let ips: Vec<String> = inventory
            .addresses_within(&block)
            .map(|a| a.ip.to_string())
            .collect();
        assert_eq!(ips, vec!["10.16.3.0", "10.16.3.7", "10.16.3.255"]);

        let v6: IpNet = "2001:db8::/64".parse().unwrap();
        assert_eq!(inventory.addresses_within(&v6).count(), 1);
    }

    #[test]
    fn test_insert_remove_fetch() {
        let mut inventory = sample();
        let key = EntityKey::Network("lab".to_string());
        assert!(inventory.fetch(&key).is_some());
        assert!(matches!(inventory.remove(&key), Some(Entity::Network(_))));
        assert!(inventory.fetch(&key).is_none());
        assert!(inventory.remove(&key).is_none());
    }

    #[test]
    fn test_record_ordering_and_ids() {
        let mut inventory = sample();
        assert_eq!(inventory.next_record_id(), RecordId(1));

        for name in ["www", "api", "www"] {
            let id = inventory.next_record_id();
            let kind = if inventory
                .find_record(&RecordKey::new(name, "example.com", RecordType::A))
                .is_some()
            {
                RecordType::Ptr
            } else {
                RecordType::A
            };
            let record =
                NameRecord::new(id, RecordKey::new(name, "example.com", kind)).unwrap();
            inventory.insert(Entity::Record(record));
        }

        let ordered: Vec<(String, u64)> = inventory
            .records_in_domain("example.com")
            .iter()
            .map(|r| (r.name.clone(), r.id.0))
            .collect();
        assert_eq!(
            ordered,
            vec![
                ("api".to_string(), 2),
                ("www".to_string(), 1),
                ("www".to_string(), 3)
            ]
        );
        assert_eq!(inventory.next_record_id(), RecordId(4));
    }

    #[test]
    fn test_is_referenced() {
        let mut inventory = sample();
        let record = NameRecord::new(
            RecordId(1),
            RecordKey::new("www", "example.com", RecordType::A),
        )
        .unwrap();
        inventory.insert(Entity::Record(record));
        assert!(!inventory.is_referenced(RecordId(1)));

        let mut address = Address::new("192.0.2.3".parse().unwrap());
        address.link(RecordId(1));
        inventory.insert(Entity::Address(address));
        assert!(inventory.is_referenced(RecordId(1)));
    }

    #[test]
    fn test_serde_round_trip_and_problems() {
        let mut inventory = sample();
        inventory.insert(Entity::Address(Address::new("203.0.113.9".parse().unwrap())));

        let json = serde_json::to_string(&inventory).unwrap();
        let back: Inventory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inventory);

        let problems = back.problems();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("203.0.113.9"));
    }

    #[test]
    fn test_problems_flag_unsafe_names_and_text() {
        let mut inventory = sample();

        let mut network = Network::parse("edge", "203.0.113.0/24").unwrap();
        network.name = "../../escaped".to_string();
        inventory.insert(Entity::Network(network));

        let mut host = Host::new("printer").unwrap();
        host.name = "printer { }".to_string();
        inventory.insert(Entity::Host(host));

        let key = RecordKey::new("www", "example.com", RecordType::A);
        let mut record = NameRecord::new(RecordId(1), key).unwrap();
        record.description = "x\nevil    IN A    203.0.113.66".to_string();
        inventory.insert(Entity::Record(record));

        let problems = inventory.problems();
        assert_eq!(problems.len(), 3, "{:?}", problems);
        assert!(problems.iter().any(|p| p.contains("escaped")));
        assert!(problems.iter().any(|p| p.contains("printer")));
        assert!(problems.iter().any(|p| p.starts_with("Record #1")));
    }
}
