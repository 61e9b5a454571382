//! Domains and name records.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::names::{validate_description, validate_domain_name, validate_record_name};

/// Identifier of a name record; ascending ids give creation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// DNS record type of a name record
///
/// AAAA entries are stored as [`RecordType::A`]; the renderer picks the
/// wire type from the address version.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RecordType {
    /// Address record (A or AAAA)
    A,
    /// Alias record
    Cname,
    /// Reverse pointer record
    Ptr,
    /// Any other type, kept verbatim (upper case)
    Other(String),
}

impl RecordType {
    /// Canonical type string
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Ptr => "PTR",
            RecordType::Other(kind) => kind,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "A" | "AAAA" => Ok(RecordType::A),
            "CNAME" => Ok(RecordType::Cname),
            "PTR" => Ok(RecordType::Ptr),
            "" => Err(Error::invalid_input("Record type cannot be empty")),
            other if other.chars().all(|c| c.is_ascii_alphanumeric()) => {
                Ok(RecordType::Other(other.to_string()))
            }
            other => Err(Error::invalid_input(format!(
                "Invalid record type: '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for RecordType {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RecordType> for String {
    fn from(kind: RecordType) -> Self {
        kind.as_str().to_string()
    }
}

/// Unique (name, domain, type) triple identifying a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    /// Left-hand name within the domain
    pub name: String,
    /// Domain name
    pub domain: String,
    /// Record type
    pub kind: RecordType,
}

impl RecordKey {
    /// Create a record key
    pub fn new(name: impl Into<String>, domain: impl Into<String>, kind: RecordType) -> Self {
        Self {
            name: name.into(),
            domain: domain.into(),
            kind,
        }
    }

    /// Split a fully qualified name at its first dot ("www.example.com")
    pub fn from_fqdn(fqdn: &str, kind: RecordType) -> Result<Self> {
        let fqdn = fqdn.trim_end_matches('.');
        let (name, domain) = fqdn.split_once('.').ok_or_else(|| {
            Error::invalid_input(format!("'{}' is not a fully qualified name", fqdn))
        })?;
        Ok(Self::new(name, domain, kind))
    }

    /// Same name and domain, other type
    pub fn with_kind(&self, kind: RecordType) -> Self {
        Self::new(self.name.clone(), self.domain.clone(), kind)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} {}", self.name, self.domain, self.kind)
    }
}

/// A DNS domain such as example.com
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Immutable domain name
    pub name: String,
    /// Short description
    #[serde(default)]
    pub description: String,
    /// DNS master serving the zone
    #[serde(default)]
    pub dns_master: Option<IpAddr>,
    /// Contact email
    #[serde(default)]
    pub contact: Option<String>,
}

impl Domain {
    /// Create a domain after validating its name
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_domain_name(&name)?;
        Ok(Self {
            name,
            description: String::new(),
            dns_master: None,
            contact: None,
        })
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Re-check name and description, for data that did not go through [`Domain::new`]
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.name)?;
        validate_description(&self.description)
    }

    /// Set the DNS master
    pub fn with_dns_master(mut self, dns_master: IpAddr) -> Self {
        self.dns_master = Some(dns_master);
        self
    }

    /// Set the contact email
    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = Some(contact.into());
        self
    }
}

/// A named entry in a domain (www.example.com A, ...)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Record id
    pub id: RecordId,
    /// Left-hand name
    pub name: String,
    /// Owning domain
    pub domain: String,
    /// Record type
    pub kind: RecordType,
    /// Target of a CNAME
    #[serde(default)]
    pub target: Option<RecordId>,
    /// Short description, rendered as a trailing comment
    #[serde(default)]
    pub description: String,
    /// Creation time
    pub created: DateTime<Utc>,
}

impl NameRecord {
    /// Create a record from its key
    pub fn new(id: RecordId, key: RecordKey) -> Result<Self> {
        validate_record_name(&key.name)?;
        validate_domain_name(&key.domain)?;
        Ok(Self {
            id,
            name: key.name,
            domain: key.domain,
            kind: key.kind,
            target: None,
            description: String::new(),
            created: Utc::now(),
        })
    }

    /// Unique key of this record
    pub fn key(&self) -> RecordKey {
        RecordKey::new(self.name.clone(), self.domain.clone(), self.kind.clone())
    }

    /// Fully qualified name without trailing dot; the apex `@` is the domain itself
    pub fn fqdn(&self) -> String {
        if self.name == "@" {
            return self.domain.clone();
        }
        format!("{}.{}", self.name, self.domain)
    }

    /// Re-check name, domain and description
    pub fn validate(&self) -> Result<()> {
        validate_record_name(&self.name)?;
        validate_domain_name(&self.domain)?;
        validate_description(&self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_parse() {
        assert_eq!("a".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("AAAA".parse::<RecordType>().unwrap(), RecordType::A);
        assert_eq!("cname".parse::<RecordType>().unwrap(), RecordType::Cname);
        assert_eq!("PTR".parse::<RecordType>().unwrap(), RecordType::Ptr);
        assert_eq!(
            "mx".parse::<RecordType>().unwrap(),
            RecordType::Other("MX".to_string())
        );
        assert!("".parse::<RecordType>().is_err());
        assert!("M X".parse::<RecordType>().is_err());
    }

    #[test]
    fn test_record_type_serde() {
        let json = serde_json::to_string(&RecordType::Cname).unwrap();
        assert_eq!(json, "\"CNAME\"");
        let kind: RecordType = serde_json::from_str("\"txt\"").unwrap();
        assert_eq!(kind, RecordType::Other("TXT".to_string()));
    }

    #[test]
    fn test_record_key_from_fqdn() {
        let key = RecordKey::from_fqdn("www.example.com.", RecordType::A).unwrap();
        assert_eq!(key.name, "www");
        assert_eq!(key.domain, "example.com");
        assert!(RecordKey::from_fqdn("localhost", RecordType::A).is_err());
    }

    #[test]
    fn test_name_record_validation() {
        let key = RecordKey::new("bad name", "example.com", RecordType::A);
        assert!(NameRecord::new(RecordId(1), key).is_err());

        let key = RecordKey::new("www", "example.com", RecordType::A);
        let record = NameRecord::new(RecordId(1), key).unwrap();
        assert_eq!(record.fqdn(), "www.example.com");
    }

    #[test]
    fn test_apex_fqdn_is_the_domain() {
        let key = RecordKey::new("@", "example.com", RecordType::A);
        let apex = NameRecord::new(RecordId(1), key).unwrap();
        assert_eq!(apex.fqdn(), "example.com");
    }

    #[test]
    fn test_validate_rejects_multiline_description() {
        let key = RecordKey::new("www", "example.com", RecordType::A);
        let mut record = NameRecord::new(RecordId(1), key).unwrap();
        record.description = "front end".to_string();
        assert!(record.validate().is_ok());

        record.description = "x\nevil    IN A    203.0.113.66".to_string();
        assert!(matches!(record.validate(), Err(Error::InvalidInput(_))));

        let domain = Domain::new("example.com").unwrap().with_description("a\rb");
        assert!(domain.validate().is_err());
    }
}
