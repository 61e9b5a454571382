// # Repository Implementations
//
// This module provides implementations of the Repository trait for
// different persistence strategies.

pub mod file;
pub mod memory;

use std::sync::Arc;

pub use file::FileRepository;
pub use memory::MemoryRepository;

use crate::Error;
use crate::config::RepositoryConfig;
use crate::traits::repository::Repository;

/// Open the repository described by `config`
pub async fn open(config: &RepositoryConfig) -> Result<Arc<dyn Repository>, Error> {
    let repository: Arc<dyn Repository> = match config {
        RepositoryConfig::File { path } => Arc::new(FileRepository::new(path).await?),
        RepositoryConfig::Memory => Arc::new(MemoryRepository::new()),
    };
    tracing::debug!("Opened {} repository", config.type_name());
    Ok(repository)
}
