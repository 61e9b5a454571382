//! Forward zone renderer
//!
//! One line per (A record, linked address) and per CNAME. Records come out
//! ordered by name then creation order so regenerated files diff cleanly.

use tracing::debug;

use crate::inventory::Inventory;
use crate::model::{IpVersion, RecordType};
use crate::render::zone::{ResourceLine, Zone};

/// Render the records of `domain`
pub fn render_forward(domain: &str, inventory: &Inventory) -> Zone {
    let mut zone = Zone::new(format!("forward zone {} generated by ipam", domain));

    for record in inventory.records_in_domain(domain) {
        match record.kind {
            RecordType::A => {
                for address in inventory.addresses_linking(record.id) {
                    let kind = match address.version() {
                        IpVersion::V6 => "AAAA",
                        IpVersion::V4 => "A",
                    };
                    zone.lines.push(
                        ResourceLine::new(&record.name, kind, address.ip.to_string())
                            .with_comment(&record.description),
                    );
                }
            }
            RecordType::Cname => {
                let Some(target) = record.target.and_then(|id| inventory.record(id)) else {
                    debug!("CNAME {} has no target, skipped", record.fqdn());
                    continue;
                };
                zone.lines.push(
                    ResourceLine::new(&record.name, "CNAME", format!("{}.", target.fqdn()))
                        .with_comment(&record.description),
                );
            }
            RecordType::Ptr | RecordType::Other(_) => {}
        }
    }

    zone
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Entity;
    use crate::model::{Address, Domain, NameRecord, Network, RecordId, RecordKey};
    use crate::render::zone::parse_zone;

    fn inventory() -> Inventory {
        let mut inventory = Inventory::new();
        inventory.insert(Entity::Network(Network::parse("lab", "192.0.2.0/24").unwrap()));
        inventory.insert(Entity::Network(Network::parse("lab6", "2001:db8::/64").unwrap()));
        inventory.insert(Entity::Domain(Domain::new("example.com").unwrap()));
        inventory
    }

    fn record(inventory: &mut Inventory, name: &str, kind: RecordType) -> RecordId {
        let id = inventory.next_record_id();
        let record = NameRecord::new(id, RecordKey::new(name, "example.com", kind)).unwrap();
        inventory.insert(Entity::Record(record));
        id
    }

    fn link(inventory: &mut Inventory, ip: &str, id: RecordId) {
        let ip = ip.parse().unwrap();
        let mut address = inventory
            .address(&ip)
            .cloned()
            .unwrap_or_else(|| Address::new(ip));
        address.link(id);
        inventory.insert(Entity::Address(address));
    }

    #[test]
    fn test_a_record_line() {
        let mut inv = inventory();
        let www = record(&mut inv, "www", RecordType::A);
        link(&mut inv, "192.0.2.10", www);

        let zone = render_forward("example.com", &inv);
        let lines = parse_zone(&zone.render());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], ResourceLine::new("www", "A", "192.0.2.10"));
    }

    #[test]
    fn test_aaaa_and_multiple_addresses() {
        let mut inv = inventory();
        let www = record(&mut inv, "www", RecordType::A);
        link(&mut inv, "2001:db8::10", www);
        link(&mut inv, "192.0.2.11", www);
        link(&mut inv, "192.0.2.10", www);

        let text = render_forward("example.com", &inv).render();
        let kinds: Vec<(String, String)> = parse_zone(&text)
            .into_iter()
            .map(|l| (l.kind, l.value))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("A".to_string(), "192.0.2.10".to_string()),
                ("A".to_string(), "192.0.2.11".to_string()),
                ("AAAA".to_string(), "2001:db8::10".to_string()),
            ]
        );
    }

    #[test]
    fn test_cname_points_at_target_fqdn() {
        let mut inv = inventory();
        let www = record(&mut inv, "www", RecordType::A);
        link(&mut inv, "192.0.2.10", www);
        let alias = record(&mut inv, "alias", RecordType::Cname);
        if let Some(Entity::Record(mut r)) = inv.fetch(&crate::inventory::EntityKey::Record(alias)) {
            r.target = Some(www);
            inv.insert(Entity::Record(r));
        }

        let lines = parse_zone(&render_forward("example.com", &inv).render());
        assert_eq!(lines[0], ResourceLine::new("alias", "CNAME", "www.example.com."));
        assert_eq!(lines[1].name, "www");
    }

    #[test]
    fn test_ptr_and_unlinked_records_not_rendered() {
        let mut inv = inventory();
        let ptr = record(&mut inv, "www", RecordType::Ptr);
        link(&mut inv, "192.0.2.10", ptr);
        record(&mut inv, "ghost", RecordType::A);

        let zone = render_forward("example.com", &inv);
        assert!(zone.lines.is_empty());
        assert_eq!(zone.render(), "; forward zone example.com generated by ipam\n");
    }

    #[test]
    fn test_output_is_deterministic() {
        let mut inv = inventory();
        for (i, name) in ["db", "api", "www"].iter().enumerate() {
            let id = record(&mut inv, name, RecordType::A);
            link(&mut inv, &format!("192.0.2.{}", 10 + i), id);
        }
        let first = render_forward("example.com", &inv).render();
        let second = render_forward("example.com", &inv).render();
        assert_eq!(first, second);

        let names: Vec<String> = parse_zone(&first).into_iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["api", "db", "www"]);
    }
}
