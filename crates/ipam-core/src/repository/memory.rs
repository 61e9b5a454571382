// # Memory Repository
//
// In-memory implementation of Repository.
//
// ## Purpose
//
// Fast, non-persistent inventory for tests and dry runs. Clones share the
// same underlying inventory, which is how tests model several services
// talking to one store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::inventory::{Entity, EntityKey, Inventory, Mutation};
use crate::traits::repository::Repository;

/// In-memory repository implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<RwLock<Inventory>>,
}

impl MemoryRepository {
    /// Create a new empty memory repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository seeded with `inventory`
    pub fn with_inventory(inventory: Inventory) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inventory)),
        }
    }

    /// Get the number of stored entities
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the repository is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn snapshot(&self) -> Result<Inventory, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn fetch(&self, key: &EntityKey) -> Result<Option<Entity>, Error> {
        Ok(self.inner.read().await.fetch(key))
    }

    async fn insert(&self, entity: Entity) -> Result<(), Error> {
        self.inner.write().await.insert(entity);
        Ok(())
    }

    async fn remove(&self, key: &EntityKey) -> Result<bool, Error> {
        Ok(self.inner.write().await.remove(key).is_some())
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing buffered
        Ok(())
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), Error> {
        let mut inventory = self.inner.write().await;
        for mutation in mutations {
            inventory.apply(mutation);
        }
        Ok(())
    }
}
