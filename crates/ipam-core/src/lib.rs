// # ipam-core
//
// Core library for the IP address management system.
//
// ## Architecture Overview
//
// This library tracks network blocks and the addresses allocated in them,
// and renders that inventory into configuration files:
// - **Inventory**: Snapshot of networks, addresses, domains, records and hosts
// - **Allocator**: Containment tests and free-address search
// - **Renderers**: Forward/reverse zones, DHCP fragments, RADIUS users
// - **Serial rotation**: Crash-safe SOA serial increments
// - **Repository**: Trait for persisting the inventory
// - **IpamService**: Validated inventory operations
// - **Generator**: One regeneration pass from snapshot to files
//
// ## Design Principles
//
// 1. **Pure rendering**: Renderers never touch the filesystem
// 2. **Derived ownership**: An address belongs to whichever network contains it
// 3. **Explicit persistence**: Allocation reserves nothing until it is stored
// 4. **Library-First**: All core functionality can be used as a library

pub mod allocator;
pub mod config;
pub mod error;
pub mod generator;
pub mod inventory;
pub mod model;
pub mod output;
pub mod render;
pub mod repository;
pub mod service;
pub mod soa;
pub mod traits;

// Re-export core types for convenience
pub use traits::Repository;
pub use config::{IpamConfig, OutputConfig, RadiusConfig, RepositoryConfig, SoaConfig};
pub use error::{Error, Result};
pub use generator::{ArtifactKind, ArtifactStatus, GenerationReport, Generator};
pub use inventory::{Entity, EntityKey, Inventory, Mutation};
pub use repository::{FileRepository, MemoryRepository};
pub use service::IpamService;
