//! Allocated addresses.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::network::IpVersion;
use crate::model::record::RecordId;

/// An address allocated inside some network
///
/// The owning network is never stored; it is recomputed by containment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// The address itself (unique)
    pub ip: IpAddr,
    /// Linked name records (A, PTR, ...)
    #[serde(default)]
    pub records: Vec<RecordId>,
    /// Creation time
    pub created: DateTime<Utc>,
}

impl Address {
    /// Create an address with no linked records
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            records: Vec::new(),
            created: Utc::now(),
        }
    }

    /// IP version of the address
    pub fn version(&self) -> IpVersion {
        IpVersion::of(&self.ip)
    }

    /// Whether a record is linked
    pub fn is_linked(&self, id: RecordId) -> bool {
        self.records.contains(&id)
    }

    /// Link a record; returns false if it was already linked
    pub fn link(&mut self, id: RecordId) -> bool {
        if self.is_linked(id) {
            return false;
        }
        self.records.push(id);
        true
    }

    /// Unlink a record; returns false if it was not linked
    pub fn unlink(&mut self, id: RecordId) -> bool {
        let before = self.records.len();
        self.records.retain(|linked| *linked != id);
        self.records.len() != before
    }
}
