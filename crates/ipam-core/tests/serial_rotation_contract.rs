//! Contract Test: Zone-Control Serial Rotation
//!
//! Constraints verified:
//! - One rotation turns serial S into S+1 and leaves every other byte alone
//! - Two rotations yield S+2
//! - An absent control file is created from the template, dated YYYYMMDD00
//! - A leftover backup with no canonical file blocks rotation until an
//!   operator restores it
//!
//! If this test fails, secondaries may miss zone updates.

use chrono::{NaiveDate, NaiveDateTime};
use ipam_core::SoaConfig;
use ipam_core::error::Error;
use ipam_core::soa::{BumpOutcome, SerialState, SoaTemplate, ZoneControlFile, parse_serial};
use std::fs;
use tempfile::tempdir;

const CONTROL: &str = "\
$TTL 86400
@    IN SOA ns1.example.com. hostmaster.example.com. (
        2024010100 ; Serial
        28800 ; Refresh
        7200 ; Retry
        604800 ; Expire
        86400 ; Minimum
)
@    IN NS    ns1.example.com.
$INCLUDE example.com.db
";

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

#[test]
fn scenario_serial_line_incremented_by_one() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.com.soa.db");
    fs::write(&path, "2024010100 ; Serial\n").unwrap();

    let control = ZoneControlFile::new(&path, SoaTemplate::default());
    control.bump("example.com.db", now()).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), "2024010101 ; Serial\n");
}

#[test]
fn rotation_changes_only_the_serial_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.com.soa.db");
    fs::write(&path, CONTROL).unwrap();

    let control = ZoneControlFile::new(&path, SoaTemplate::default());
    let outcome = control.bump("example.com.db", now()).unwrap();
    assert_eq!(outcome, BumpOutcome::Rotated { serial: Some(2024010101) });

    let after = fs::read_to_string(&path).unwrap();
    let before_lines: Vec<&str> = CONTROL.lines().collect();
    let after_lines: Vec<&str> = after.lines().collect();
    assert_eq!(before_lines.len(), after_lines.len());

    let changed: Vec<usize> = before_lines
        .iter()
        .zip(&after_lines)
        .enumerate()
        .filter(|(_, (b, a))| b != a)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(changed, vec![2]);
    assert_eq!(after_lines[2], "        2024010101 ; Serial");
    assert!(after.ends_with('\n'));
}

#[test]
fn two_rotations_add_two() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.com.soa.db");
    fs::write(&path, CONTROL).unwrap();

    let control = ZoneControlFile::new(&path, SoaTemplate::default());
    control.bump("example.com.db", now()).unwrap();
    control.bump("example.com.db", now()).unwrap();

    assert_eq!(control.serial().unwrap(), Some(2024010102));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        CONTROL.replace("2024010100", "2024010102")
    );
}

#[test]
fn absent_file_gets_dated_template() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("10.16.0.0.soa.db");
    let config = SoaConfig {
        primary_ns: "ns1.example.com".to_string(),
        hostmaster: "hostmaster.example.com.".to_string(),
        ..SoaConfig::default()
    };
    let control = ZoneControlFile::new(&path, SoaTemplate::new(config));

    let outcome = control.bump("10.16.0.0.db", now()).unwrap();
    assert_eq!(outcome, BumpOutcome::Created { serial: 2024060100 });

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(parse_serial(&text), Some(2024060100));
    assert!(text.contains("IN SOA ns1.example.com. hostmaster.example.com. ("));
    assert!(text.contains("$INCLUDE 10.16.0.0.db"));
}

#[test]
fn interrupted_rotation_needs_operator() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.com.soa.db");
    let control = ZoneControlFile::new(&path, SoaTemplate::default());

    // a process died after the first rename
    let backup = dir.path().join("example.com.soa.db.20240601115959.000000.old");
    fs::write(&backup, CONTROL).unwrap();
    assert!(matches!(control.state().unwrap(), SerialState::Rotating { .. }));

    for _ in 0..2 {
        let err = control.bump("example.com.db", now()).unwrap_err();
        assert!(matches!(err, Error::InterruptedRotation { .. }));
        assert!(!err.is_recoverable());
    }

    // operator restores the backup, rotation resumes from its serial
    fs::rename(&backup, &path).unwrap();
    assert_eq!(control.state().unwrap(), SerialState::Present);
    let outcome = control.bump("example.com.db", now()).unwrap();
    assert_eq!(outcome.serial(), Some(2024010101));
}

#[test]
fn lock_file_sits_next_to_control_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("example.com.soa.db");
    let control = ZoneControlFile::new(&path, SoaTemplate::default());

    assert_eq!(control.lock_path(), dir.path().join("example.com.soa.db.lock"));
    control.bump("example.com.db", now()).unwrap();
    assert!(control.lock_path().exists());
}
