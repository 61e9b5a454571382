//! Name validation shared by domains, records and hosts.

use crate::error::{Error, Result};

/// Maximum length of a host name.
const MAX_HOST_NAME: usize = 150;

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 validation: 253 chars total, labels of at most 63
/// alphanumeric or hyphen characters that neither start nor end with a hyphen.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::invalid_input("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::invalid_input(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        validate_label(domain, label, |c| c.is_ascii_alphanumeric() || c == '-')?;
    }

    Ok(())
}

/// Validate the left-hand side of a resource record.
///
/// `@` is the zone apex. Otherwise labels follow domain rules, plus `_` for
/// service labels and a leading `*` for wildcards.
pub fn validate_record_name(name: &str) -> Result<()> {
    if name == "@" {
        return Ok(());
    }
    if name.is_empty() {
        return Err(Error::invalid_input("Record name cannot be empty"));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::invalid_input(format!(
            "Space not allowed in name: '{}'",
            name
        )));
    }

    for (i, label) in name.split('.').enumerate() {
        if i == 0 && label == "*" {
            continue;
        }
        validate_label(name, label, |c| {
            c.is_ascii_alphanumeric() || c == '-' || c == '_'
        })?;
    }

    Ok(())
}

/// Validate a host name: bounded length, file- and DHCP-safe characters.
pub fn validate_host_name(name: &str) -> Result<()> {
    if name.len() > MAX_HOST_NAME {
        return Err(Error::invalid_input(format!(
            "Host name too long: {} chars (max {})",
            name.len(),
            MAX_HOST_NAME
        )));
    }
    validate_identifier("Host", name)
}

/// Validate a network name.
///
/// Network names become file names under the output root and DHCP class
/// names, so they obey the same rules as host names.
pub fn validate_network_name(name: &str) -> Result<()> {
    validate_identifier("Network", name)
}

/// Validate free text stored alongside an entity.
///
/// Descriptions end up in generated files on a single line: no control
/// characters, line breaks included.
pub fn validate_description(description: &str) -> Result<()> {
    if let Some(c) = description.chars().find(|c| c.is_control()) {
        return Err(Error::invalid_input(format!(
            "Description contains control character {:?}: '{}'",
            c,
            description.escape_debug()
        )));
    }
    Ok(())
}

/// ASCII alphanumerics, `-`, `_` and `.`, not starting with `.`, no `..`
fn validate_identifier(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_input(format!("{} name cannot be empty", what)));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(Error::invalid_input(format!(
            "Space not allowed in {} name: '{}'",
            what.to_lowercase(),
            name
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(Error::invalid_input(format!(
            "{} name contains invalid character '{}': '{}'",
            what,
            c.escape_debug(),
            name.escape_debug()
        )));
    }
    if name.starts_with('.') || name.contains("..") {
        return Err(Error::invalid_input(format!(
            "{} name cannot start with '.' or contain '..': '{}'",
            what, name
        )));
    }
    Ok(())
}

fn validate_label(full: &str, label: &str, allowed: impl Fn(char) -> bool) -> Result<()> {
    if label.is_empty() {
        return Err(Error::invalid_input(format!(
            "Name has empty label: '{}'",
            full
        )));
    }

    if label.len() > 63 {
        return Err(Error::invalid_input(format!(
            "Label too long: {} chars (max 63). Label: '{}'",
            label.len(),
            label
        )));
    }

    if !label.chars().all(allowed) {
        return Err(Error::invalid_input(format!(
            "Label contains invalid characters. Label: '{}'",
            label
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(Error::invalid_input(format!(
            "Label cannot start or end with hyphen. Label: '{}'",
            label
        )));
    }

    Ok(())
}
