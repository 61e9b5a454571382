// Staged writes of one service operation.
//
// Operations validate and mutate a working copy of the inventory, so later
// steps see earlier ones (fresh record ids, newly linked addresses). The
// recorded writes go to the repository as one batch at the end.

use crate::Error;
use crate::inventory::{Entity, EntityKey, Inventory, Mutation};
use crate::traits::repository::Repository;

#[derive(Debug)]
pub(crate) struct Changes {
    inventory: Inventory,
    writes: Vec<Mutation>,
}

impl Changes {
    pub(crate) fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            writes: Vec::new(),
        }
    }

    /// Working copy, including staged writes
    pub(crate) fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub(crate) fn insert(&mut self, entity: Entity) {
        self.inventory.insert(entity.clone());
        self.writes.push(Mutation::Insert(entity));
    }

    pub(crate) fn remove(&mut self, key: EntityKey) -> bool {
        let existed = self.inventory.remove(&key).is_some();
        if existed {
            self.writes.push(Mutation::Remove(key));
        }
        existed
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Hand the staged writes to the repository as one batch
    pub(crate) async fn commit(self, repository: &dyn Repository) -> Result<(), Error> {
        let count = self.writes.len();
        repository.apply(self.writes).await?;
        tracing::trace!("Committed {} inventory writes", count);
        Ok(())
    }
}
