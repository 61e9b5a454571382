//! Error types for the IPAM system
//!
//! This module defines all error types used throughout the crate.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for IPAM operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the IPAM system
#[derive(Error, Debug)]
pub enum Error {
    /// Free-address search exhausted the network
    #[error("Network {network} has no unused address")]
    NetworkFull {
        /// Network name
        network: String,
    },

    /// Address does not belong to the named network
    #[error("Address {ip} not in network {network} ({cidr})")]
    ContainmentViolation {
        /// Offending address
        ip: IpAddr,
        /// Network name
        network: String,
        /// Network CIDR block
        cidr: String,
    },

    /// Referenced entity absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entity already exists or would break a uniqueness rule
    #[error("Conflict: {0}")]
    Conflict(String),

    /// CNAME target chain would loop back on itself
    #[error("CNAME cycle: {0}")]
    CnameCycle(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Exclusive lock on an output file could not be taken
    #[error("Failed to lock {}: {source}", path.display())]
    LockAcquisition {
        /// Locked path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A previous rotation died between its two renames
    #[error(
        "Interrupted serial rotation: {} is missing and {} holds the previous content. \
        Restore the backup manually.",
        canonical.display(),
        backup.display()
    )]
    InterruptedRotation {
        /// Canonical control file
        canonical: PathBuf,
        /// Leftover backup
        backup: PathBuf,
    },

    /// Serial token on a control file line is not an integer
    #[error("Invalid serial: {0}")]
    InvalidSerial(String),

    /// Repository-related errors
    #[error("Repository error: {0}")]
    Repository(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a "network full" error
    pub fn network_full(network: impl Into<String>) -> Self {
        Self::NetworkFull {
            network: network.into(),
        }
    }

    /// Create a containment violation
    pub fn containment(ip: IpAddr, network: impl Into<String>, cidr: impl ToString) -> Self {
        Self::ContainmentViolation {
            ip,
            network: network.into(),
            cidr: cidr.to_string(),
        }
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a CNAME cycle error
    pub fn cname_cycle(msg: impl Into<String>) -> Self {
        Self::CnameCycle(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a lock acquisition error
    pub fn lock(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LockAcquisition {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid serial error
    pub fn invalid_serial(msg: impl Into<String>) -> Self {
        Self::InvalidSerial(msg.into())
    }

    /// Create a repository error
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::Repository(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Business conditions the caller can fix by changing its input.
    ///
    /// Everything else is an infrastructure failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NetworkFull { .. }
                | Self::ContainmentViolation { .. }
                | Self::NotFound(_)
                | Self::Conflict(_)
                | Self::CnameCycle(_)
                | Self::InvalidInput(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_split() {
        assert!(Error::network_full("lab").is_recoverable());
        assert!(Error::containment("10.0.0.1".parse().unwrap(), "lab", "192.0.2.0/24").is_recoverable());
        assert!(Error::not_found("host web").is_recoverable());

        let io = std::io::Error::other("denied");
        assert!(!Error::lock("/tmp/x", io).is_recoverable());
        assert!(!Error::invalid_serial("abc").is_recoverable());
    }

    #[test]
    fn test_containment_message() {
        let err = Error::containment("10.0.0.1".parse().unwrap(), "lab", "192.0.2.0/24");
        assert_eq!(
            err.to_string(),
            "Address 10.0.0.1 not in network lab (192.0.2.0/24)"
        );
    }

    #[test]
    fn test_source_errors_convert_with_question_mark() {
        fn parse(text: &str) -> Result<serde_json::Value> {
            Ok(serde_json::from_str(text)?)
        }
        fn open(path: &str) -> Result<std::fs::File> {
            Ok(std::fs::File::open(path)?)
        }

        assert!(matches!(parse("{"), Err(Error::Json(_))));
        assert!(matches!(open("/nonexistent/inventory.json"), Err(Error::Io(_))));
    }
}
