//! # IPAM Service
//!
//! Validated read-modify-write operations over a [`Repository`].
//!
//! ## Responsibilities
//!
//! - Enforce inventory invariants (containment, uniqueness, one PTR per
//!   address, A/CNAME exclusivity, acyclic CNAME chains)
//! - Persist allocations immediately so the next search sees them
//! - Reference-counted deletion of name records
//!
//! ## Concurrency
//!
//! Operations on one service are serialised behind an async mutex. Two
//! services over the same repository are not coordinated: both can pick the
//! same free address between snapshot and write. Duplicate creation is
//! rejected by the later operation only if it snapshots after the earlier
//! one committed.

mod changes;
pub mod request;

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::allocator;
use crate::error::{Error, Result};
use crate::inventory::{Entity, EntityKey, Inventory};
use crate::model::names::validate_description;
use crate::model::{Address, Domain, Host, NameRecord, Network, RecordId, RecordKey, RecordType};
use crate::traits::repository::Repository;

use changes::Changes;
pub use request::{AddressDetails, HostAddress, HostRemoval, HostRequest, NetworkDetails, NetworkUpdate};

/// Inventory operations over a shared repository
pub struct IpamService {
    repository: Arc<dyn Repository>,
    op_lock: Mutex<()>,
}

impl IpamService {
    /// Create a service over `repository`
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            op_lock: Mutex::new(()),
        }
    }

    /// Underlying repository
    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repository
    }

    /// Current inventory
    pub async fn snapshot(&self) -> Result<Inventory> {
        self.repository.snapshot().await
    }

    async fn begin(&self) -> Result<Changes> {
        Ok(Changes::new(self.repository.snapshot().await?))
    }

    async fn commit(&self, changes: Changes) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        changes.commit(self.repository.as_ref()).await
    }

    // ---- networks ----

    /// Register a network
    pub async fn create_network(&self, network: Network) -> Result<Network> {
        let _op = self.op_lock.lock().await;
        network.validate()?;

        let mut changes = self.begin().await?;
        let inv = changes.inventory();
        if inv.network(&network.name).is_some() {
            return Err(Error::conflict(format!("Network {} already exists", network.name)));
        }
        if let Some(other) = inv.networks().find(|other| other.cidr == network.cidr) {
            return Err(Error::conflict(format!(
                "Network {} already covers {}",
                other.name, network.cidr
            )));
        }

        changes.insert(Entity::Network(network.clone()));
        self.commit(changes).await?;
        info!("Created network {} ({})", network.name, network.cidr);
        Ok(network)
    }

    /// Change a network's mutable fields
    pub async fn update_network(&self, name: &str, update: NetworkUpdate) -> Result<Network> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let mut network = require_network(changes.inventory(), name)?.clone();

        if let Some(description) = update.description {
            network = network.with_description(description);
        }
        if let Some(gateway) = update.gateway {
            network = network.with_gateway(gateway)?;
        }
        if let Some(dns_master) = update.dns_master {
            network = network.with_dns_master(dns_master);
        }
        if let Some(dhcp_server) = update.dhcp_server {
            network = network.with_dhcp_server(dhcp_server);
        }
        if let Some(vlan) = update.vlan {
            network = network.with_vlan(vlan)?;
        }
        if let Some(contact) = update.contact {
            network = network.with_contact(contact);
        }

        network.validate()?;

        changes.insert(Entity::Network(network.clone()));
        self.commit(changes).await?;
        info!("Updated network {}", name);
        Ok(network)
    }

    /// Delete a network that holds no addresses
    pub async fn remove_network(&self, name: &str) -> Result<()> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let inv = changes.inventory();
        let network = require_network(inv, name)?;

        let in_use = inv.addresses_in(network).count();
        if in_use > 0 {
            return Err(Error::conflict(format!(
                "Network {} still holds {} addresses",
                name, in_use
            )));
        }

        changes.remove(EntityKey::Network(name.to_string()));
        self.commit(changes).await?;
        info!("Removed network {}", name);
        Ok(())
    }

    /// A network with its addresses and their PTR names
    pub async fn network_details(&self, name: &str) -> Result<NetworkDetails> {
        let inv = self.snapshot().await?;
        let network = require_network(&inv, name)?;
        let ptr = RecordType::Ptr;

        let addresses = inv
            .addresses_in(network)
            .map(|address| AddressDetails {
                ip: address.ip,
                ptr: inv.linked_records(address, &ptr).next().map(NameRecord::fqdn),
            })
            .collect();

        Ok(NetworkDetails {
            network: network.clone(),
            addresses,
            available: allocator::available_count(network, &inv),
        })
    }

    // ---- domains ----

    /// Register a domain
    pub async fn create_domain(&self, domain: Domain) -> Result<Domain> {
        let _op = self.op_lock.lock().await;
        domain.validate()?;

        let mut changes = self.begin().await?;
        if changes.inventory().domain(&domain.name).is_some() {
            return Err(Error::conflict(format!("Domain {} already exists", domain.name)));
        }

        changes.insert(Entity::Domain(domain.clone()));
        self.commit(changes).await?;
        info!("Created domain {}", domain.name);
        Ok(domain)
    }

    /// Delete a domain that holds no records
    pub async fn remove_domain(&self, name: &str) -> Result<()> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let inv = changes.inventory();
        if inv.domain(name).is_none() {
            return Err(Error::not_found(format!("domain {}", name)));
        }

        let records = inv.records_in_domain(name).len();
        if records > 0 {
            return Err(Error::conflict(format!(
                "Domain {} still holds {} records",
                name, records
            )));
        }

        changes.remove(EntityKey::Domain(name.to_string()));
        self.commit(changes).await?;
        info!("Removed domain {}", name);
        Ok(())
    }

    // ---- records ----

    /// Create a name record
    ///
    /// CNAMEs need a `target`; other types must not have one.
    pub async fn create_record(
        &self,
        key: RecordKey,
        target: Option<RecordKey>,
        description: &str,
    ) -> Result<NameRecord> {
        let _op = self.op_lock.lock().await;
        validate_description(description)?;
        let mut changes = self.begin().await?;

        let mut record = new_record(&mut changes, key, target.as_ref())?;
        if !description.is_empty() {
            record.description = description.to_string();
            changes.insert(Entity::Record(record.clone()));
        }

        self.commit(changes).await?;
        info!("Created record {}", record.key());
        Ok(record)
    }

    /// Point an existing CNAME at another record
    pub async fn retarget_cname(&self, key: &RecordKey, target: &RecordKey) -> Result<NameRecord> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let inv = changes.inventory();

        let mut record = require_record(inv, key)?.clone();
        if record.kind != RecordType::Cname {
            return Err(Error::invalid_input(format!("{} is not a CNAME", key)));
        }
        let target_id = require_record(inv, target)?.id;
        check_cname_chain(inv, record.id, target_id)?;

        record.target = Some(target_id);
        changes.insert(Entity::Record(record.clone()));
        self.commit(changes).await?;
        info!("Retargeted {} to {}", key, target);
        Ok(record)
    }

    /// Delete a record, unlinking it from every address
    ///
    /// Refused while a CNAME still targets it.
    pub async fn remove_record(&self, key: &RecordKey) -> Result<()> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let inv = changes.inventory();
        let record = require_record(inv, key)?;
        let id = record.id;

        if let Some(alias) = inv.records().find(|other| other.target == Some(id)) {
            return Err(Error::conflict(format!(
                "{} is the target of CNAME {}",
                key,
                alias.fqdn()
            )));
        }

        let linked: Vec<Address> = inv.addresses_linking(id).cloned().collect();
        for mut address in linked {
            address.unlink(id);
            changes.insert(Entity::Address(address));
        }
        changes.remove(EntityKey::Record(id));

        self.commit(changes).await?;
        info!("Removed record {}", key);
        Ok(())
    }

    /// Link an A or PTR record to an address
    pub async fn link_record(&self, ip: IpAddr, key: &RecordKey) -> Result<Address> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let address = link(&mut changes, ip, key)?;
        self.commit(changes).await?;
        Ok(address)
    }

    /// Unlink a record from an address; false if it was not linked
    pub async fn unlink_record(&self, ip: IpAddr, key: &RecordKey) -> Result<bool> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let inv = changes.inventory();
        let id = require_record(inv, key)?.id;
        let mut address = require_address(inv, ip)?.clone();

        if !address.unlink(id) {
            return Ok(false);
        }
        changes.insert(Entity::Address(address));
        self.commit(changes).await?;
        debug!("Unlinked {} from {}", key, ip);
        Ok(true)
    }

    // ---- addresses ----

    /// Free address of a network, without reserving it
    ///
    /// Another caller may pick the same address until one of them persists
    /// it. Prefer [`allocate_address`](Self::allocate_address).
    pub async fn propose_address(&self, network: &str) -> Result<IpAddr> {
        let inv = self.snapshot().await?;
        allocator::free_address(require_network(&inv, network)?, &inv)
    }

    /// Allocate a specific address
    ///
    /// Without `network` the owning network is looked up by containment.
    /// With `fqdn`, A and PTR records for that name are created or reused
    /// and linked.
    pub async fn create_address(
        &self,
        ip: IpAddr,
        network: Option<&str>,
        fqdn: Option<&str>,
    ) -> Result<Address> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;

        let address = add_address(&mut changes, ip, network, fqdn)?;
        self.commit(changes).await?;
        info!("Allocated {}", ip);
        Ok(address)
    }

    /// Allocate the first free address of a network and persist it
    pub async fn allocate_address(&self, network: &str, fqdn: Option<&str>) -> Result<Address> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;

        let inv = changes.inventory();
        let ip = allocator::free_address(require_network(inv, network)?, inv)?;
        let address = add_address(&mut changes, ip, Some(network), fqdn)?;

        self.commit(changes).await?;
        info!("Allocated {} in network {}", ip, network);
        Ok(address)
    }

    /// Release an address
    ///
    /// Hosts holding it drop it. With `cascade`, linked records that no other
    /// address or CNAME references are deleted too.
    pub async fn remove_address(&self, ip: IpAddr, cascade: bool) -> Result<()> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        release_address(&mut changes, ip, cascade)?;
        self.commit(changes).await?;
        info!("Released {}", ip);
        Ok(())
    }

    // ---- hosts ----

    /// Create a host, optionally with an interface and an address
    pub async fn create_host(&self, request: HostRequest) -> Result<Host> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let inv = changes.inventory();

        let mut host = Host::new(&request.name)?.with_dhcp(request.dhcp);
        if inv.host(&host.name).is_some() {
            return Err(Error::conflict(format!("Host {} already exists", host.name)));
        }
        if let Some(network) = &request.network {
            require_network(inv, network)?;
            host = host.with_network(network);
        }
        if let Some(interface) = request.interface {
            if let Some(owner) = inv.hosts().find(|other| other.mac() == Some(interface.mac)) {
                return Err(Error::conflict(format!(
                    "Interface {} already bound to host {}",
                    interface.mac, owner.name
                )));
            }
            host = host.with_interface(interface);
        }

        let ip = match request.address {
            HostAddress::None => None,
            HostAddress::Fixed(ip) => Some(ip),
            HostAddress::Allocate => {
                let name = host.network.as_deref().ok_or_else(|| {
                    Error::invalid_input(format!(
                        "Host {} needs a network to allocate an address",
                        host.name
                    ))
                })?;
                Some(allocator::free_address(require_network(inv, name)?, inv)?)
            }
        };
        if let Some(ip) = ip {
            hold_address(&mut changes, ip, host.network.as_deref())?;
            host.add_address(ip);
        }

        changes.insert(Entity::Host(host.clone()));
        self.commit(changes).await?;
        info!("Created host {}", host.name);
        Ok(host)
    }

    /// Give a host another address, allocating it when unknown
    pub async fn add_host_address(&self, name: &str, ip: IpAddr) -> Result<Host> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let mut host = require_host(changes.inventory(), name)?.clone();

        hold_address(&mut changes, ip, None)?;
        if !host.add_address(ip) {
            debug!("Host {} already holds {}", name, ip);
            return Ok(host);
        }

        changes.insert(Entity::Host(host.clone()));
        self.commit(changes).await?;
        info!("Host {} now holds {}", name, ip);
        Ok(host)
    }

    /// Delete a host
    pub async fn remove_host(&self, name: &str, removal: HostRemoval) -> Result<()> {
        let _op = self.op_lock.lock().await;
        let mut changes = self.begin().await?;
        let host = require_host(changes.inventory(), name)?.clone();
        changes.remove(EntityKey::Host(host.name.clone()));

        if removal.addresses {
            for ip in &host.addresses {
                if changes.inventory().hosts_holding(ip).next().is_some() {
                    debug!("Keeping {}: still held by another host", ip);
                    continue;
                }
                if changes.inventory().address(ip).is_some() {
                    release_address(&mut changes, *ip, removal.records)?;
                }
            }
        }

        self.commit(changes).await?;
        info!("Removed host {}", name);
        Ok(())
    }
}

fn require_network<'a>(inv: &'a Inventory, name: &str) -> Result<&'a Network> {
    inv.network(name)
        .ok_or_else(|| Error::not_found(format!("network {}", name)))
}

fn require_address(inv: &Inventory, ip: IpAddr) -> Result<&Address> {
    inv.address(&ip)
        .ok_or_else(|| Error::not_found(format!("address {}", ip)))
}

fn require_record<'a>(inv: &'a Inventory, key: &RecordKey) -> Result<&'a NameRecord> {
    inv.find_record(key)
        .ok_or_else(|| Error::not_found(format!("record {}", key)))
}

fn require_host<'a>(inv: &'a Inventory, name: &str) -> Result<&'a Host> {
    inv.host(name)
        .ok_or_else(|| Error::not_found(format!("host {}", name)))
}

/// Network an address must live in: the named one, or the owner by containment
fn resolve_network<'a>(inv: &'a Inventory, ip: IpAddr, name: Option<&str>) -> Result<&'a Network> {
    match name {
        Some(name) => {
            let network = require_network(inv, name)?;
            if !allocator::contains(network, ip) {
                return Err(Error::containment(ip, &network.name, network.cidr));
            }
            Ok(network)
        }
        None => inv
            .owning_network(&ip)
            .ok_or_else(|| Error::not_found(format!("network containing {}", ip))),
    }
}

/// Walk the target chain from `target`; reaching `record` or looping is a cycle
fn check_cname_chain(inv: &Inventory, record: RecordId, target: RecordId) -> Result<()> {
    let mut seen = HashSet::from([record]);
    let mut cursor = Some(target);

    while let Some(id) = cursor {
        if !seen.insert(id) {
            let name = inv.record(id).map_or_else(|| id.to_string(), NameRecord::fqdn);
            return Err(Error::cname_cycle(format!("chain loops back through {}", name)));
        }
        cursor = inv.record(id).and_then(|record| record.target);
    }
    Ok(())
}

/// Stage a new record after every uniqueness check
fn new_record(changes: &mut Changes, key: RecordKey, target: Option<&RecordKey>) -> Result<NameRecord> {
    let inv = changes.inventory();
    if inv.domain(&key.domain).is_none() {
        return Err(Error::not_found(format!("domain {}", key.domain)));
    }
    if inv.find_record(&key).is_some() {
        return Err(Error::conflict(format!("Record {} already exists", key)));
    }

    let clash = match key.kind {
        RecordType::A => Some(RecordType::Cname),
        RecordType::Cname => Some(RecordType::A),
        _ => None,
    };
    if let Some(clash) = clash
        && inv.find_record(&key.with_kind(clash)).is_some()
    {
        return Err(Error::conflict(format!(
            "{}.{} cannot carry both A and CNAME records",
            key.name, key.domain
        )));
    }

    let id = inv.next_record_id();
    let mut record = NameRecord::new(id, key)?;

    match (&record.kind, target) {
        (RecordType::Cname, Some(target)) => {
            let target_id = require_record(inv, target)?.id;
            check_cname_chain(inv, id, target_id)?;
            record.target = Some(target_id);
        }
        (RecordType::Cname, None) => {
            return Err(Error::invalid_input(format!(
                "CNAME {} needs a target",
                record.fqdn()
            )));
        }
        (_, Some(_)) => {
            return Err(Error::invalid_input(format!(
                "Only CNAME records have a target, not {}",
                record.key()
            )));
        }
        (_, None) => {}
    }

    changes.insert(Entity::Record(record.clone()));
    Ok(record)
}

/// Existing record under `key`, or a newly staged one
fn find_or_create_record(changes: &mut Changes, key: RecordKey) -> Result<RecordId> {
    match changes.inventory().find_record(&key) {
        Some(record) => Ok(record.id),
        None => new_record(changes, key, None).map(|record| record.id),
    }
}

fn link(changes: &mut Changes, ip: IpAddr, key: &RecordKey) -> Result<Address> {
    let inv = changes.inventory();
    let record = require_record(inv, key)?;
    let mut address = require_address(inv, ip)?.clone();

    match record.kind {
        RecordType::Cname => {
            return Err(Error::invalid_input(format!(
                "CNAME {} cannot be linked to an address",
                record.fqdn()
            )));
        }
        RecordType::Ptr => {
            let ptr = RecordType::Ptr;
            if let Some(existing) = inv
                .linked_records(&address, &ptr)
                .find(|existing| existing.id != record.id)
            {
                return Err(Error::conflict(format!(
                    "Address {} already has PTR {}",
                    ip,
                    existing.fqdn()
                )));
            }
        }
        _ => {}
    }

    if address.link(record.id) {
        debug!("Linked {} to {}", key, ip);
        changes.insert(Entity::Address(address.clone()));
    }
    Ok(address)
}

/// Stage a new address and, with `fqdn`, its A and PTR links
fn add_address(
    changes: &mut Changes,
    ip: IpAddr,
    network: Option<&str>,
    fqdn: Option<&str>,
) -> Result<Address> {
    let inv = changes.inventory();
    resolve_network(inv, ip, network)?;
    if inv.is_allocated(&ip) {
        return Err(Error::conflict(format!("Address {} is already allocated", ip)));
    }
    let mut address = Address::new(ip);
    changes.insert(Entity::Address(address.clone()));

    if let Some(fqdn) = fqdn {
        let a_key = RecordKey::from_fqdn(fqdn, RecordType::A)?;
        let ptr_key = a_key.with_kind(RecordType::Ptr);
        find_or_create_record(changes, a_key.clone())?;
        find_or_create_record(changes, ptr_key.clone())?;
        link(changes, ip, &a_key)?;
        address = link(changes, ip, &ptr_key)?;
    }
    Ok(address)
}

/// Make sure `ip` is allocated, creating it in its network when unknown
fn hold_address(changes: &mut Changes, ip: IpAddr, network: Option<&str>) -> Result<()> {
    let inv = changes.inventory();
    if inv.is_allocated(&ip) {
        resolve_network(inv, ip, network)?;
        return Ok(());
    }
    add_address(changes, ip, network, None).map(|_| ())
}

fn release_address(changes: &mut Changes, ip: IpAddr, cascade: bool) -> Result<()> {
    let inv = changes.inventory();
    let address = require_address(inv, ip)?.clone();

    let holders: Vec<Host> = inv.hosts_holding(&ip).cloned().collect();
    for mut host in holders {
        host.addresses.retain(|held| *held != ip);
        debug!("Host {} no longer holds {}", host.name, ip);
        changes.insert(Entity::Host(host));
    }
    changes.remove(EntityKey::Address(ip));

    if cascade {
        for id in &address.records {
            let inv = changes.inventory();
            if inv.record(*id).is_none() {
                warn!("Address {} linked missing record {}", ip, id);
                continue;
            }
            if inv.is_referenced(*id) {
                debug!("Keeping record {}: still referenced", id);
                continue;
            }
            changes.remove(EntityKey::Record(*id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Interface, MacAddress};
    use crate::repository::MemoryRepository;

    async fn service() -> IpamService {
        let service = IpamService::new(Arc::new(MemoryRepository::new()));
        service
            .create_network(Network::parse("lab", "192.0.2.0/24").unwrap())
            .await
            .unwrap();
        service
            .create_domain(Domain::new("example.com").unwrap())
            .await
            .unwrap();
        service
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn key(name: &str, kind: RecordType) -> RecordKey {
        RecordKey::new(name, "example.com", kind)
    }

    #[tokio::test]
    async fn test_create_address_with_fqdn_links_a_and_ptr() {
        let service = service().await;
        let address = service
            .create_address(ip("192.0.2.10"), Some("lab"), Some("www.example.com"))
            .await
            .unwrap();
        assert_eq!(address.records.len(), 2);

        let details = service.network_details("lab").await.unwrap();
        assert_eq!(details.addresses.len(), 1);
        assert_eq!(details.addresses[0].ptr.as_deref(), Some("www.example.com"));
        assert_eq!(details.available, 253);
    }

    #[tokio::test]
    async fn test_create_address_reuses_existing_records() {
        let service = service().await;
        service
            .create_address(ip("192.0.2.10"), None, Some("www.example.com"))
            .await
            .unwrap();
        let second = service
            .create_address(ip("192.0.2.11"), None, Some("www.example.com"))
            .await;

        // same A and PTR records, linked a second time
        let second = second.unwrap();
        let inv = service.snapshot().await.unwrap();
        assert_eq!(inv.records().count(), 2);
        assert_eq!(second.records, inv.address(&ip("192.0.2.10")).unwrap().records);
    }

    #[tokio::test]
    async fn test_containment_and_duplicates() {
        let service = service().await;

        let err = service
            .create_address(ip("10.0.0.1"), Some("lab"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ContainmentViolation { .. }));
        assert!(err.is_recoverable());

        let err = service.create_address(ip("10.0.0.1"), None, None).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        service.create_address(ip("192.0.2.7"), None, None).await.unwrap();
        let err = service.create_address(ip("192.0.2.7"), None, None).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_allocate_persists_each_pick() {
        let service = service().await;
        let first = service.allocate_address("lab", None).await.unwrap();
        let second = service.allocate_address("lab", None).await.unwrap();
        assert_eq!(first.ip, ip("192.0.2.1"));
        assert_eq!(second.ip, ip("192.0.2.2"));
    }

    #[tokio::test]
    async fn test_second_ptr_rejected() {
        let service = service().await;
        service
            .create_address(ip("192.0.2.10"), None, Some("www.example.com"))
            .await
            .unwrap();
        service
            .create_record(key("mail", RecordType::Ptr), None, "")
            .await
            .unwrap();

        let err = service
            .link_record(ip("192.0.2.10"), &key("mail", RecordType::Ptr))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_a_and_cname_are_exclusive() {
        let service = service().await;
        service.create_record(key("www", RecordType::A), None, "").await.unwrap();

        let err = service
            .create_record(key("www", RecordType::Cname), Some(key("www", RecordType::A)), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // CNAMEs need a target, others must not have one
        let err = service
            .create_record(key("alias", RecordType::Cname), None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = service
            .create_record(key("db", RecordType::A), Some(key("www", RecordType::A)), "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_record_needs_domain() {
        let service = service().await;
        let err = service
            .create_record(RecordKey::new("www", "example.org", RecordType::A), None, "")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_remove_network_and_domain_in_use() {
        let service = service().await;
        service
            .create_address(ip("192.0.2.10"), None, Some("www.example.com"))
            .await
            .unwrap();

        assert!(matches!(service.remove_network("lab").await, Err(Error::Conflict(_))));
        assert!(matches!(service.remove_domain("example.com").await, Err(Error::Conflict(_))));

        service.remove_address(ip("192.0.2.10"), true).await.unwrap();
        service.remove_network("lab").await.unwrap();
        service.remove_domain("example.com").await.unwrap();
        assert!(service.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_network() {
        let service = service().await;
        let update = NetworkUpdate {
            gateway: Some(ip("192.0.2.254")),
            vlan: Some(42),
            description: Some("lab floor".into()),
            ..Default::default()
        };
        let lab = service.update_network("lab", update).await.unwrap();
        assert_eq!(lab.vlan, 42);
        assert_eq!(lab.gateway, Some(ip("192.0.2.254")));

        let bad = NetworkUpdate {
            gateway: Some(ip("10.0.0.1")),
            ..Default::default()
        };
        assert!(service.update_network("lab", bad).await.is_err());
        let bad = NetworkUpdate {
            vlan: Some(4095),
            ..Default::default()
        };
        assert!(service.update_network("lab", bad).await.is_err());

        // failed updates left the stored network alone
        let stored = service.network_details("lab").await.unwrap().network;
        assert_eq!(stored, lab);
    }

    #[tokio::test]
    async fn test_create_host_with_allocated_address() {
        let service = service().await;
        let mac: MacAddress = "00:11:22:33:44:55".parse().unwrap();
        let host = service
            .create_host(
                HostRequest::new("web")
                    .with_interface(Interface::new(mac))
                    .with_network("lab")
                    .with_address(HostAddress::Allocate),
            )
            .await
            .unwrap();
        assert_eq!(host.addresses, vec![ip("192.0.2.1")]);
        assert!(service.snapshot().await.unwrap().is_allocated(&ip("192.0.2.1")));

        let err = service
            .create_host(HostRequest::new("clone").with_interface(Interface::new(mac)))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let err = service
            .create_host(HostRequest::new("nowhere").with_address(HostAddress::Allocate))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_add_host_address_creates_it() {
        let service = service().await;
        service.create_host(HostRequest::new("web")).await.unwrap();

        let host = service.add_host_address("web", ip("192.0.2.50")).await.unwrap();
        assert_eq!(host.addresses, vec![ip("192.0.2.50")]);
        assert!(service.snapshot().await.unwrap().is_allocated(&ip("192.0.2.50")));

        let again = service.add_host_address("web", ip("192.0.2.50")).await.unwrap();
        assert_eq!(again.addresses.len(), 1);
    }

    #[tokio::test]
    async fn test_check_cname_chain_detects_existing_loop() {
        let mut inv = Inventory::new();
        for (id, target) in [(1, 2), (2, 1)] {
            let mut record = NameRecord::new(
                RecordId(id),
                key(&format!("n{}", id), RecordType::Cname),
            )
            .unwrap();
            record.target = Some(RecordId(target));
            inv.insert(Entity::Record(record));
        }

        let err = check_cname_chain(&inv, RecordId(3), RecordId(1)).unwrap_err();
        assert!(matches!(err, Error::CnameCycle(_)));
    }
}
