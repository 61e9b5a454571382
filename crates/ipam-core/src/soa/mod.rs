// # Zone-Control Serial Rotation
//
// Each zone has a small control file (`<stem>.soa.db`) carrying the SOA
// record. Its serial must grow by exactly one per regeneration so secondaries
// pick up the change.
//
// ## States
//
// - Absent: no control file. The first bump writes the template with serial
//   `YYYYMMDD00` and stops.
// - Present: the control file exists.
// - Rotating: the control file is missing and a `<file>.<timestamp>.old`
//   backup exists. A process died mid-rotation. This is never repaired
//   automatically.
//
// ## Rotation
//
// 1. rename `<file>` to `<file>.<timestamp>.old`
// 2. copy every line into `<file>.<timestamp>.new`, incrementing the leading
//    integer of each line containing `Serial`
// 3. rename `<file>.<timestamp>.new` to `<file>`
// 4. delete the backup
//
// `<file>.lock` is held exclusively for the whole sequence.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::Error;
use crate::config::SoaConfig;
use crate::output::ExclusiveLock;

/// Marker identifying the serial line
pub const SERIAL_MARKER: &str = "Serial";

/// Serial of a control file created on `date`
pub fn initial_serial(date: NaiveDate) -> u64 {
    date.year() as u64 * 1_000_000 + date.month() as u64 * 10_000 + date.day() as u64 * 100
}

/// Template for new control files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoaTemplate {
    config: SoaConfig,
}

impl SoaTemplate {
    /// Create a template from the configured defaults
    pub fn new(config: SoaConfig) -> Self {
        Self { config }
    }

    /// Render the control file for a zone whose records live in `include`
    pub fn render(&self, serial: u64, include: &str) -> String {
        let c = &self.config;
        format!(
            "$TTL {ttl}\n\
             @    IN SOA {ns}. {hostmaster}. (\n\
             \x20       {serial} ; {marker}\n\
             \x20       {refresh} ; Refresh\n\
             \x20       {retry} ; Retry\n\
             \x20       {expire} ; Expire\n\
             \x20       {minimum} ; Minimum\n\
             )\n\
             @    IN NS    {ns}.\n\
             $INCLUDE {include}\n",
            ttl = c.ttl,
            ns = c.primary_ns.trim_end_matches('.'),
            hostmaster = c.hostmaster.trim_end_matches('.'),
            serial = serial,
            marker = SERIAL_MARKER,
            refresh = c.refresh,
            retry = c.retry,
            expire = c.expire,
            minimum = c.minimum,
            include = include,
        )
    }
}

impl Default for SoaTemplate {
    fn default() -> Self {
        Self::new(SoaConfig::default())
    }
}

/// Lifecycle state of a control file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerialState {
    /// No control file yet
    Absent,
    /// Control file in place
    Present,
    /// Canonical file missing, backup left by an interrupted rotation
    Rotating {
        /// Leftover backup
        backup: PathBuf,
    },
}

/// What a bump did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpOutcome {
    /// Control file written from the template
    Created {
        /// Initial serial
        serial: u64,
    },
    /// Existing file rotated
    Rotated {
        /// New serial, `None` when the file had no serial line
        serial: Option<u64>,
    },
}

impl BumpOutcome {
    /// Serial now in the control file, if known
    pub fn serial(&self) -> Option<u64> {
        match self {
            BumpOutcome::Created { serial } => Some(*serial),
            BumpOutcome::Rotated { serial } => *serial,
        }
    }
}

/// Increment the serial of every `Serial` line in `text`
///
/// Every other byte is kept, line endings included. Returns the rewritten
/// text and the first new serial, `None` when no line carries the marker.
pub fn increment_serial_lines(text: &str) -> Result<(String, Option<u64>), Error> {
    let mut out = String::with_capacity(text.len() + 1);
    let mut first = None;

    for line in text.split_inclusive('\n') {
        if !line.contains(SERIAL_MARKER) {
            out.push_str(line);
            continue;
        }

        let token = line.split_whitespace().next().unwrap_or_default();
        let serial: u64 = token.parse().map_err(|_| {
            Error::invalid_serial(format!("'{}' on line '{}'", token, line.trim_end()))
        })?;
        let next = serial
            .checked_add(1)
            .ok_or_else(|| Error::invalid_serial(format!("{} cannot be incremented", serial)))?;

        out.push_str(&line.replacen(token, &next.to_string(), 1));
        first.get_or_insert(next);
    }

    Ok((out, first))
}

/// Leading serial of the first `Serial` line
pub fn parse_serial(text: &str) -> Option<u64> {
    text.lines()
        .find(|line| line.contains(SERIAL_MARKER))
        .and_then(|line| line.split_whitespace().next())
        .and_then(|token| token.parse().ok())
}

/// One zone-control file on disk
#[derive(Debug, Clone)]
pub struct ZoneControlFile {
    path: PathBuf,
    template: SoaTemplate,
}

impl ZoneControlFile {
    /// Control file at `path`, created from `template` when absent
    pub fn new(path: impl Into<PathBuf>, template: SoaTemplate) -> Self {
        Self {
            path: path.into(),
            template,
        }
    }

    /// Canonical path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock held during rotation
    pub fn lock_path(&self) -> PathBuf {
        self.sibling("lock")
    }

    /// Inspect the file's lifecycle state
    pub fn state(&self) -> Result<SerialState, Error> {
        let backup = self.leftover_backup()?;

        if self.path.exists() {
            if let Some(backup) = backup {
                tracing::warn!(
                    "Stale rotation backup {} next to {}",
                    backup.display(),
                    self.path.display()
                );
            }
            return Ok(SerialState::Present);
        }

        Ok(match backup {
            Some(backup) => SerialState::Rotating { backup },
            None => SerialState::Absent,
        })
    }

    /// Current serial, `None` when absent or without a serial line
    pub fn serial(&self) -> Result<Option<u64>, Error> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(parse_serial(&fs::read_to_string(&self.path)?))
    }

    /// Advance the serial by one, creating the file on first use
    ///
    /// `now` names the rotation's temporary files and dates a new serial.
    pub fn bump(&self, include: &str, now: NaiveDateTime) -> Result<BumpOutcome, Error> {
        let _lock = ExclusiveLock::acquire(self.lock_path())?;

        match self.state()? {
            SerialState::Absent => {
                let serial = initial_serial(now.date());
                self.create(include, serial, now)?;
                tracing::info!("Created {} with serial {}", self.path.display(), serial);
                Ok(BumpOutcome::Created { serial })
            }
            SerialState::Rotating { backup } => Err(Error::InterruptedRotation {
                canonical: self.path.clone(),
                backup,
            }),
            SerialState::Present => {
                let serial = self.rotate(now)?;
                Ok(BumpOutcome::Rotated { serial })
            }
        }
    }

    fn create(&self, include: &str, serial: u64, now: NaiveDateTime) -> Result<(), Error> {
        let staged = self.staged_path(now, "new");
        write_synced(&staged, &self.template.render(serial, include))?;
        fs::rename(&staged, &self.path)?;
        Ok(())
    }

    fn rotate(&self, now: NaiveDateTime) -> Result<Option<u64>, Error> {
        let backup = self.staged_path(now, "old");
        let staged = self.staged_path(now, "new");

        fs::rename(&self.path, &backup)?;

        let rewritten = fs::read_to_string(&backup)
            .map_err(Error::from)
            .and_then(|text| increment_serial_lines(&text))
            .and_then(|(text, serial)| write_synced(&staged, &text).map(|_| serial));

        let serial = match rewritten {
            Ok(serial) => serial,
            Err(e) => {
                self.restore(&backup, &staged);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staged, &self.path) {
            self.restore(&backup, &staged);
            return Err(e.into());
        }
        fs::remove_file(&backup)?;

        match serial {
            Some(serial) => {
                tracing::debug!("Rotated {} to serial {}", self.path.display(), serial)
            }
            None => tracing::warn!(
                "{} has no {} line, serial left unchanged",
                self.path.display(),
                SERIAL_MARKER
            ),
        }
        Ok(serial)
    }

    /// Put the backup back after a controlled failure
    fn restore(&self, backup: &Path, staged: &Path) {
        if staged.exists()
            && let Err(e) = fs::remove_file(staged)
        {
            tracing::warn!("Failed to remove {}: {}", staged.display(), e);
        }
        match fs::rename(backup, &self.path) {
            Ok(()) => tracing::info!("Restored {} from backup", self.path.display()),
            Err(e) => tracing::error!(
                "Failed to restore {} from {}: {}",
                self.path.display(),
                backup.display(),
                e
            ),
        }
    }

    fn leftover_backup(&self) -> Result<Option<PathBuf>, Error> {
        let Some(dir) = self.path.parent() else {
            return Ok(None);
        };
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        if !dir.exists() {
            return Ok(None);
        }

        let prefix = format!("{}.", self.file_name());
        let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.starts_with(&prefix) && name.ends_with(".old"))
            })
            .collect();
        backups.sort();
        Ok(backups.pop())
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        self.path.with_file_name(format!("{}.{}", self.file_name(), suffix))
    }

    fn staged_path(&self, now: NaiveDateTime, suffix: &str) -> PathBuf {
        self.sibling(&format!("{}.{}", now.format("%Y%m%d%H%M%S%.6f"), suffix))
    }
}

fn write_synced(path: &Path, contents: &str) -> Result<(), Error> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
