//! Test doubles and common fixtures for contract tests
//!
//! Every contract file compiles this module on its own, so not every item is
//! used everywhere.

#![allow(dead_code)]

use ipam_core::error::{Error, Result};
use ipam_core::inventory::{Entity, EntityKey, Inventory, Mutation};
use ipam_core::model::{Domain, Network, RecordKey, RecordType};
use ipam_core::{IpamConfig, IpamService, MemoryRepository, OutputConfig, Repository};
use std::net::IpAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Repository wrapper counting writes
#[derive(Debug, Clone, Default)]
pub struct CountingRepository {
    inner: MemoryRepository,
    inserts: Arc<AtomicUsize>,
    removes: Arc<AtomicUsize>,
    applies: Arc<AtomicUsize>,
}

impl CountingRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of insert() calls so far
    pub fn insert_count(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    /// Number of remove() calls so far
    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    /// Number of batches applied so far
    pub fn apply_count(&self) -> usize {
        self.applies.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Repository for CountingRepository {
    async fn snapshot(&self) -> Result<Inventory> {
        self.inner.snapshot().await
    }

    async fn fetch(&self, key: &EntityKey) -> Result<Option<Entity>> {
        self.inner.fetch(key).await
    }

    async fn insert(&self, entity: Entity) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(entity).await
    }

    async fn remove(&self, key: &EntityKey) -> Result<bool> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }

    async fn flush(&self) -> Result<()> {
        self.inner.flush().await
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<()> {
        self.applies.fetch_add(1, Ordering::SeqCst);
        for mutation in &mutations {
            match mutation {
                Mutation::Insert(_) => self.inserts.fetch_add(1, Ordering::SeqCst),
                Mutation::Remove(_) => self.removes.fetch_add(1, Ordering::SeqCst),
            };
        }
        self.inner.apply(mutations).await
    }
}

/// Repository whose backend is unreachable
#[derive(Debug, Default)]
pub struct UnreachableRepository;

#[async_trait::async_trait]
impl Repository for UnreachableRepository {
    async fn snapshot(&self) -> Result<Inventory> {
        Err(Error::repository("backend unreachable"))
    }

    async fn fetch(&self, _key: &EntityKey) -> Result<Option<Entity>> {
        Err(Error::repository("backend unreachable"))
    }

    async fn insert(&self, _entity: Entity) -> Result<()> {
        Err(Error::repository("backend unreachable"))
    }

    async fn remove(&self, _key: &EntityKey) -> Result<bool> {
        Err(Error::repository("backend unreachable"))
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

pub fn key(name: &str, kind: RecordType) -> RecordKey {
    RecordKey::new(name, "example.com", kind)
}

/// Service over `repository` with network `lab` (`cidr`) and domain example.com
pub async fn service_with(repository: Arc<dyn Repository>, cidr: &str) -> IpamService {
    let service = IpamService::new(repository);
    service
        .create_network(Network::parse("lab", cidr).expect("valid network"))
        .await
        .expect("network created");
    service
        .create_domain(Domain::new("example.com").expect("valid domain"))
        .await
        .expect("domain created");
    service
}

/// Service over a fresh memory repository, network `lab` is 192.0.2.0/24
pub async fn lab_service() -> IpamService {
    service_with(Arc::new(MemoryRepository::new()), "192.0.2.0/24").await
}

/// Default configuration writing under `root`
pub fn config_for(root: &Path) -> IpamConfig {
    let mut config = IpamConfig::new();
    config.output = OutputConfig::new(root);
    config
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {}", path.display(), e))
}
