//! Artifact generator
//!
//! The Generator is responsible for:
//! - Taking one inventory snapshot per run
//! - Rendering every artifact from that snapshot
//! - Writing each file under its exclusive lock
//! - Rotating the zone-control serial after each zone write
//!
//! ## Pass Order
//!
//! ```text
//! snapshot ──▶ forward zones ──▶ reverse zones ──▶ DHCP ──▶ RADIUS
//!              (per domain)      (per /24 block)   (per v4 network)
//! ```
//!
//! A failed artifact is recorded in the [`GenerationReport`] and the pass
//! moves on. Only a failed snapshot aborts the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::{debug, error, info, warn};

use crate::config::{IpamConfig, OutputConfig};
use crate::error::{Error, Result};
use crate::inventory::Inventory;
use crate::model::IpVersion;
use crate::model::names::{validate_domain_name, validate_network_name};
use crate::output::write_locked;
use crate::render::reverse::block_file_stem;
use crate::render::{delegation_blocks, render_dhcp, render_forward, render_reverse, render_users};
use crate::soa::{BumpOutcome, SoaTemplate, ZoneControlFile};
use crate::traits::repository::Repository;

/// Kind of generated file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Forward zone of a domain
    ForwardZone,
    /// Reverse zone of a delegation block
    ReverseZone,
    /// Fixed DHCP reservations of a network
    DhcpFixed,
    /// Dynamic DHCP class of a network
    DhcpDynamic,
    /// FreeRADIUS users file
    RadiusUsers,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::ForwardZone => "forward zone",
            ArtifactKind::ReverseZone => "reverse zone",
            ArtifactKind::DhcpFixed => "dhcp fixed",
            ArtifactKind::DhcpDynamic => "dhcp dynamic",
            ArtifactKind::RadiusUsers => "radius users",
        };
        f.write_str(name)
    }
}

/// Outcome of one artifact
#[derive(Debug)]
pub enum ArtifactStatus {
    /// File written; zones carry the serial now in their control file
    Written {
        serial: Option<u64>,
    },
    /// Generation of this artifact failed
    Failed(Error),
}

/// One line of the generation report
#[derive(Debug)]
pub struct ArtifactReport {
    pub kind: ArtifactKind,
    /// Domain, block or network name
    pub subject: String,
    pub path: PathBuf,
    pub status: ArtifactStatus,
}

impl ArtifactReport {
    /// Whether the artifact was written
    pub fn is_written(&self) -> bool {
        matches!(self.status, ArtifactStatus::Written { .. })
    }
}

impl fmt::Display for ArtifactReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            ArtifactStatus::Written { serial: Some(serial) } => write!(
                f,
                "{} {}: {} (serial {})",
                self.kind,
                self.subject,
                self.path.display(),
                serial
            ),
            ArtifactStatus::Written { serial: None } => {
                write!(f, "{} {}: {}", self.kind, self.subject, self.path.display())
            }
            ArtifactStatus::Failed(e) => {
                write!(f, "{} {}: FAILED: {}", self.kind, self.subject, e)
            }
        }
    }
}

/// Per-artifact outcome of one run, in pass order
#[derive(Debug, Default)]
pub struct GenerationReport {
    pub artifacts: Vec<ArtifactReport>,
}

impl GenerationReport {
    /// Artifacts that failed
    pub fn failures(&self) -> impl Iterator<Item = &ArtifactReport> {
        self.artifacts.iter().filter(|artifact| !artifact.is_written())
    }

    /// True when every artifact was written
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Artifacts of one kind
    pub fn of_kind(&self, kind: ArtifactKind) -> impl Iterator<Item = &ArtifactReport> {
        self.artifacts.iter().filter(move |artifact| artifact.kind == kind)
    }

    fn record(&mut self, kind: ArtifactKind, subject: &str, path: PathBuf, result: Result<Option<u64>>) {
        let status = match result {
            Ok(serial) => {
                debug!("Generated {} {}", kind, subject);
                ArtifactStatus::Written { serial }
            }
            Err(e) => {
                error!("Failed to generate {} {}: {}", kind, subject, e);
                ArtifactStatus::Failed(e)
            }
        };
        self.artifacts.push(ArtifactReport {
            kind,
            subject: subject.to_string(),
            path,
            status,
        });
    }
}

/// Renders the inventory into configuration files
///
/// ## Lifecycle
///
/// 1. Create with [`Generator::new()`]
/// 2. Call [`Generator::run()`] once per regeneration
///
/// Runs of the same generator must not overlap: file locks cover each write,
/// not the render-write-rotate sequence of a zone.
pub struct Generator {
    repository: Arc<dyn Repository>,
    output: OutputConfig,
    template: SoaTemplate,
    reject_message: String,
}

impl Generator {
    /// Create a generator writing under `config.output`
    pub fn new(repository: Arc<dyn Repository>, config: &IpamConfig) -> Self {
        Self {
            repository,
            output: config.output.clone(),
            template: SoaTemplate::new(config.soa.clone()),
            reject_message: config.radius.reject_message.clone(),
        }
    }

    /// Output layout
    pub fn output(&self) -> &OutputConfig {
        &self.output
    }

    /// Run one full regeneration pass
    pub async fn run(&self) -> Result<GenerationReport> {
        let inventory = self.repository.snapshot().await?;
        info!(
            "Generating artifacts for {} domains and {} networks into {}",
            inventory.domains().count(),
            inventory.networks().count(),
            self.output.root().display()
        );

        let mut report = GenerationReport::default();
        self.forward_zones(&inventory, &mut report).await;
        self.reverse_zones(&inventory, &mut report).await;
        self.dhcp(&inventory, &mut report).await;
        self.radius(&inventory, &mut report).await;

        let failed = report.failures().count();
        if failed == 0 {
            info!("Generated {} artifacts", report.artifacts.len());
        } else {
            warn!(
                "Generated {} artifacts, {} failed",
                report.artifacts.len() - failed,
                failed
            );
        }
        Ok(report)
    }

    async fn forward_zones(&self, inventory: &Inventory, report: &mut GenerationReport) {
        for domain in inventory.domains() {
            // loaded inventories may carry names that would escape the output root
            let result = match validate_domain_name(&domain.name) {
                Ok(()) => {
                    let zone = render_forward(&domain.name, inventory);
                    self.write_zone(&domain.name, zone.render()).await
                }
                Err(e) => Err(e),
            };
            report.record(
                ArtifactKind::ForwardZone,
                &domain.name,
                self.output.zone_file(&domain.name),
                result,
            );
        }
    }

    async fn reverse_zones(&self, inventory: &Inventory, report: &mut GenerationReport) {
        for network in inventory.networks() {
            if let Err(e) = validate_network_name(&network.name) {
                warn!("Skipping reverse zones of network {:?}: {}", network.name, e);
                for block in delegation_blocks(network) {
                    let stem = block_file_stem(&block);
                    let e = Error::invalid_input(format!("Unsafe network name {:?}", network.name));
                    report.record(
                        ArtifactKind::ReverseZone,
                        &format!("{} ({})", block, network.name),
                        self.output.zone_file(&stem),
                        Err(e),
                    );
                }
                continue;
            }
            for reverse in render_reverse(network, inventory) {
                let stem = reverse.file_stem();
                let result = self.write_zone(&stem, reverse.zone.render()).await;
                report.record(
                    ArtifactKind::ReverseZone,
                    &format!("{} ({})", reverse.block, network.name),
                    self.output.zone_file(&stem),
                    result,
                );
            }
        }
    }

    async fn dhcp(&self, inventory: &Inventory, report: &mut GenerationReport) {
        for network in inventory.networks() {
            if network.version() == IpVersion::V6 {
                debug!("Skipping DHCP for IPv6 network {}", network.name);
                continue;
            }

            let fixed = self.output.dhcp_fixed(&network.name);
            let dynamic = self.output.dhcp_dynamic(&network.name);
            if let Err(e) = validate_network_name(&network.name) {
                warn!("Skipping DHCP for network {:?}: {}", network.name, e);
                report.record(ArtifactKind::DhcpFixed, &network.name, fixed, Err(e));
                let e = Error::invalid_input(format!("Unsafe network name {:?}", network.name));
                report.record(ArtifactKind::DhcpDynamic, &network.name, dynamic, Err(e));
                continue;
            }

            let config = render_dhcp(network, inventory);

            let result = self.write(fixed.clone(), config.fixed).await.map(|_| None);
            report.record(ArtifactKind::DhcpFixed, &network.name, fixed, result);

            let result = self.write(dynamic.clone(), config.dynamic).await.map(|_| None);
            report.record(ArtifactKind::DhcpDynamic, &network.name, dynamic, result);
        }
    }

    async fn radius(&self, inventory: &Inventory, report: &mut GenerationReport) {
        let path = self.output.radius_users();
        let users = render_users(inventory, &self.reject_message);
        let result = self.write(path.clone(), users).await.map(|_| None);
        report.record(ArtifactKind::RadiusUsers, "users", path, result);
    }

    /// Write `<stem>.db`, then advance `<stem>.soa.db`
    async fn write_zone(&self, stem: &str, contents: String) -> Result<Option<u64>> {
        let zone_file = self.output.zone_file(stem);
        let include = file_name(&zone_file);
        self.write(zone_file, contents).await?;

        let control = ZoneControlFile::new(self.output.soa_file(stem), self.template.clone());
        let outcome = blocking(move || control.bump(&include, Local::now().naive_local())).await?;

        if let BumpOutcome::Created { serial } = outcome {
            info!("Initialised zone {} at serial {}", stem, serial);
        }
        Ok(outcome.serial())
    }

    async fn write(&self, path: PathBuf, contents: String) -> Result<()> {
        blocking(move || write_locked(&path, &contents)).await
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run blocking filesystem work off the async workers
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Other(format!("Blocking task failed: {}", e)))?
}
