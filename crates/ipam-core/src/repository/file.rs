// # File Repository
//
// File-based implementation of Repository with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good inventory
// - Recovery: Falls back to backup if corruption detected
// - Batches: `apply` commits a whole batch with a single rename, memory is
//   only updated once the file is in place
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "inventory": {
//     "networks": [{ "name": "lab", "cidr": "192.0.2.0/24", "vlan": 1, ... }],
//     "addresses": [{ "ip": "192.0.2.10", "records": [1], ... }],
//     "domains": [{ "name": "example.com", ... }],
//     "records": [{ "id": 1, "name": "www", "domain": "example.com", "kind": "A", ... }],
//     "hosts": []
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::Error;
use crate::inventory::{Entity, EntityKey, Inventory, Mutation};
use crate::traits::repository::Repository;

/// Inventory file format version
const INVENTORY_FILE_VERSION: &str = "1.0";

/// File-based repository with crash recovery
///
/// Every write rewrites the whole document: new content goes to a temporary
/// file, the previous file is copied to `.backup`, then the temporary file
/// is renamed into place. A failed write leaves both the file and the
/// in-memory inventory as they were.
#[derive(Debug)]
pub struct FileRepository {
    path: PathBuf,
    inventory: Arc<RwLock<Inventory>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct InventoryFileFormat {
    version: String,
    inventory: Inventory,
}

impl FileRepository {
    /// Create or load a file repository
    ///
    /// This will:
    /// 1. Try to load the existing inventory file
    /// 2. If corruption detected, try to load from backup
    /// 3. If both fail, start with an empty inventory
    /// 4. Create parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create inventory directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let inventory = Self::load_with_recovery(&path).await?;

        for problem in inventory.problems() {
            tracing::warn!("Inventory {}: {}", path.display(), problem);
        }

        Ok(Self {
            path,
            inventory: Arc::new(RwLock::new(inventory)),
        })
    }

    /// Load the inventory with automatic recovery
    async fn load_with_recovery(path: &Path) -> Result<Inventory, Error> {
        let e = match Self::load(path).await {
            Ok(inventory) => {
                tracing::debug!("Loaded inventory from file: {} entities", inventory.len());
                return Ok(inventory);
            }
            Err(e @ Error::Json(_)) => e,
            // Other error (not corruption)
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "Inventory file appears corrupted: {}. Attempting recovery from backup.",
            e
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty inventory.");
            return Ok(Inventory::new());
        }

        match Self::load(&backup_path).await {
            Ok(inventory) => {
                tracing::info!(
                    "Recovered inventory from backup: {} entities",
                    inventory.len()
                );
                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!(
                        "Failed to restore inventory file from backup: {}",
                        restore_err
                    );
                }
                Ok(inventory)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also corrupted: {}. Starting with empty inventory.",
                    backup_err
                );
                Ok(Inventory::new())
            }
        }
    }

    /// Load the inventory from file
    async fn load(path: &Path) -> Result<Inventory, Error> {
        if !path.exists() {
            tracing::debug!("Inventory file does not exist: {}", path.display());
            return Ok(Inventory::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::repository(format!(
                "Failed to read inventory file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: InventoryFileFormat = serde_json::from_str(&content)?;

        if file.version != INVENTORY_FILE_VERSION {
            tracing::warn!(
                "Inventory file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                INVENTORY_FILE_VERSION,
                file.version
            );
        }

        Ok(file.inventory)
    }

    /// Write `inventory` to file atomically
    ///
    /// Callers hold the inventory write lock so writes never interleave.
    async fn persist(&self, inventory: &Inventory) -> Result<(), Error> {
        let file = InventoryFileFormat {
            version: INVENTORY_FILE_VERSION.to_string(),
            inventory: inventory.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::repository(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::repository(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.sync_all().await.map_err(|e| {
                Error::repository(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::repository(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Inventory written to file: {}", self.path.display());
        Ok(())
    }

    /// Restore the inventory file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::repository(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored inventory file from backup");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    /// Path of the inventory file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Repository for FileRepository {
    async fn snapshot(&self) -> Result<Inventory, Error> {
        Ok(self.inventory.read().await.clone())
    }

    async fn fetch(&self, key: &EntityKey) -> Result<Option<Entity>, Error> {
        Ok(self.inventory.read().await.fetch(key))
    }

    async fn insert(&self, entity: Entity) -> Result<(), Error> {
        self.apply(vec![Mutation::Insert(entity)]).await
    }

    async fn remove(&self, key: &EntityKey) -> Result<bool, Error> {
        let mut current = self.inventory.write().await;
        if current.fetch(key).is_none() {
            return Ok(false);
        }

        let mut next = current.clone();
        next.remove(key);
        self.persist(&next).await?;
        *current = next;
        Ok(true)
    }

    async fn flush(&self) -> Result<(), Error> {
        // every mutation is on disk before it becomes visible
        Ok(())
    }

    async fn apply(&self, mutations: Vec<Mutation>) -> Result<(), Error> {
        let mut current = self.inventory.write().await;

        let count = mutations.len();
        let mut next = current.clone();
        let mut changed = false;
        for mutation in mutations {
            changed |= next.apply(mutation);
        }
        if !changed {
            return Ok(());
        }

        self.persist(&next).await?;
        *current = next;
        tracing::trace!("Applied {} mutations to {}", count, self.path.display());
        Ok(())
    }
}
