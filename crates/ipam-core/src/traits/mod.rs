//! Core traits for the IPAM system
//!
//! - [`Repository`]: Persisted inventory of networks, addresses, names and hosts

pub mod repository;

pub use repository::Repository;
