// # Repository Trait
//
// Defines the interface to the persisted inventory.
//
// ## Purpose
//
// The repository is the system of record for networks, addresses, domains,
// name records and hosts. Renderers never talk to it directly: the
// generator takes a [`snapshot`](Repository::snapshot) and renders from that.
//
// ## Implementations
//
// - Memory: process-local, for tests and dry runs
// - File: JSON document with atomic replace and backup recovery
//
// ## Usage
//
// ```rust,no_run
// use ipam_core::Repository;
// use ipam_core::inventory::{Entity, EntityKey};
// use ipam_core::model::Network;
// use ipam_core::repository::MemoryRepository;
//
// #[tokio::main]
// async fn main() -> ipam_core::Result<()> {
//     let repo = MemoryRepository::new();
//
//     repo.insert(Entity::Network(Network::parse("lab", "192.0.2.0/24")?)).await?;
//     let lab = repo.fetch(&EntityKey::Network("lab".into())).await?;
//     assert!(lab.is_some());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::inventory::{Entity, EntityKey, Inventory, Mutation};

/// Trait for inventory repositories
///
/// Implementations must be thread-safe and usable across async tasks.
/// There is no transaction primitive: a read followed by a write may
/// interleave with another caller's writes. Callers that need
/// read-validate-write atomicity serialise above the repository.
///
/// ## Implementation Guidelines
///
/// - `insert` is create-or-replace keyed by [`Entity::key`]
/// - Writes are visible to subsequent `snapshot`/`fetch` calls immediately
/// - `flush()` must persist all pending changes
/// - `apply()` should be all-or-nothing; durable stores override it
#[async_trait]
pub trait Repository: Send + Sync {
    /// Copy of the whole inventory
    async fn snapshot(&self) -> Result<Inventory, crate::Error>;

    /// Fetch one entity
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Entity))`: The stored entity
    /// - `Ok(None)`: No entity under that key
    /// - `Err(Error)`: Storage error
    async fn fetch(&self, key: &EntityKey) -> Result<Option<Entity>, crate::Error>;

    /// Create or replace an entity
    async fn insert(&self, entity: Entity) -> Result<(), crate::Error>;

    /// Delete an entity
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: The entity existed and was removed
    /// - `Ok(false)`: Nothing was stored under that key
    /// - `Err(Error)`: Storage error
    async fn remove(&self, key: &EntityKey) -> Result<bool, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;

    /// Apply a batch of mutations in order
    ///
    /// The default replays them one by one and then flushes, so a failure
    /// midway leaves the earlier ones applied. Implementations that can
    /// commit the batch atomically must override it.
    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), crate::Error> {
        for mutation in mutations {
            match mutation {
                Mutation::Insert(entity) => self.insert(entity).await?,
                Mutation::Remove(key) => {
                    self.remove(&key).await?;
                }
            }
        }
        self.flush().await
    }
}
