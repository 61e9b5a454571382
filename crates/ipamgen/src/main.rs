// # ipamgen - IPAM artifact generator
//
// The ipamgen binary is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Opening the inventory repository
// 4. Running one generation pass and reporting the outcome
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Repository
// - `IPAM_REPOSITORY_TYPE`: Type of repository (file, memory)
// - `IPAM_INVENTORY_PATH`: Path to the inventory file (for file repository)
//
// ### Output
// - `IPAM_OUTPUT_DIR`: Root directory of generated files
//
// ### Zone-control defaults
// - `IPAM_SOA_PRIMARY_NS`: Primary name server
// - `IPAM_SOA_HOSTMASTER`: Responsible mailbox in DNS notation
// - `IPAM_SOA_REFRESH`, `IPAM_SOA_RETRY`, `IPAM_SOA_EXPIRE`, `IPAM_SOA_MINIMUM`:
//   SOA timers in seconds
//
// ### RADIUS
// - `IPAM_REJECT_MESSAGE`: Reply message of the catch-all reject entry
//
// ### Logging
// - `IPAM_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export IPAM_REPOSITORY_TYPE=file
// export IPAM_INVENTORY_PATH=/var/lib/ipam/inventory.json
// export IPAM_OUTPUT_DIR=/srv/ipam
// export IPAM_SOA_PRIMARY_NS=ns1.example.com
//
// ipamgen
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use ipam_core::{Generator, IpamConfig, OutputConfig, RepositoryConfig};

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum IpamExitCode {
    /// Every artifact written
    Success = 0,
    /// Configuration or startup error
    ConfigError = 1,
    /// Run aborted before producing a report
    RuntimeError = 2,
    /// Run completed but some artifacts failed
    PartialFailure = 3,
}

impl From<IpamExitCode> for ExitCode {
    fn from(code: IpamExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    repository_type: String,
    inventory_path: Option<String>,
    output_dir: String,
    soa_primary_ns: Option<String>,
    soa_hostmaster: Option<String>,
    soa_refresh: Option<u32>,
    soa_retry: Option<u32>,
    soa_expire: Option<u32>,
    soa_minimum: Option<u32>,
    reject_message: Option<String>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            repository_type: env::var("IPAM_REPOSITORY_TYPE")
                .unwrap_or_else(|_| "file".to_string()),
            inventory_path: env::var("IPAM_INVENTORY_PATH").ok(),
            output_dir: env::var("IPAM_OUTPUT_DIR").unwrap_or_else(|_| "output".to_string()),
            soa_primary_ns: env::var("IPAM_SOA_PRIMARY_NS").ok(),
            soa_hostmaster: env::var("IPAM_SOA_HOSTMASTER").ok(),
            soa_refresh: parse_var("IPAM_SOA_REFRESH")?,
            soa_retry: parse_var("IPAM_SOA_RETRY")?,
            soa_expire: parse_var("IPAM_SOA_EXPIRE")?,
            soa_minimum: parse_var("IPAM_SOA_MINIMUM")?,
            reject_message: env::var("IPAM_REJECT_MESSAGE").ok(),
            log_level: env::var("IPAM_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.repository_type.as_str() {
            "file" => {
                if self.inventory_path.as_ref().is_none_or(|p| p.is_empty()) {
                    anyhow::bail!(
                        "IPAM_INVENTORY_PATH is required when IPAM_REPOSITORY_TYPE=file. \
                        Set it via: export IPAM_INVENTORY_PATH=/var/lib/ipam/inventory.json"
                    );
                }
            }
            "memory" => {}
            _ => anyhow::bail!(
                "IPAM_REPOSITORY_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.repository_type
            ),
        }

        if self.output_dir.is_empty() {
            anyhow::bail!("IPAM_OUTPUT_DIR cannot be empty");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPAM_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration
    fn to_ipam_config(&self) -> Result<IpamConfig> {
        let mut config = IpamConfig::new();

        config.repository = match self.repository_type.as_str() {
            "memory" => RepositoryConfig::Memory,
            _ => RepositoryConfig::File {
                path: self.inventory_path.clone().unwrap_or_default(),
            },
        };
        config.output = OutputConfig::new(&self.output_dir);

        if let Some(ns) = &self.soa_primary_ns {
            config.soa.primary_ns = ns.clone();
        }
        if let Some(hostmaster) = &self.soa_hostmaster {
            config.soa.hostmaster = hostmaster.clone();
        }
        if let Some(refresh) = self.soa_refresh {
            config.soa.refresh = refresh;
        }
        if let Some(retry) = self.soa_retry {
            config.soa.retry = retry;
        }
        if let Some(expire) = self.soa_expire {
            config.soa.expire = expire;
        }
        if let Some(minimum) = self.soa_minimum {
            config.soa.minimum = minimum;
        }
        if let Some(message) = &self.reject_message {
            config.radius.reject_message = message.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse an optional numeric variable; set but malformed is an error
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number. Got: {}", name, value)),
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return IpamExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IpamExitCode::ConfigError.into();
    }

    let ipam_config = match config.to_ipam_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {}", e);
            return IpamExitCode::ConfigError.into();
        }
    };

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpamExitCode::ConfigError.into();
    }

    info!("Starting ipamgen");
    info!(
        "Repository: {}, output: {}",
        ipam_config.repository.type_name(),
        ipam_config.output.root().display()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpamExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run(ipam_config).await {
            Ok(code) => code,
            Err(e) => {
                error!("Generation aborted: {:#}", e);
                IpamExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Run one generation pass
async fn run(config: IpamConfig) -> Result<IpamExitCode> {
    let repository = ipam_core::repository::open(&config.repository)
        .await
        .context("Failed to open inventory repository")?;

    let generator = Generator::new(Arc::clone(&repository), &config);
    let report = generator.run().await.context("Failed to snapshot inventory")?;

    for artifact in &report.artifacts {
        if artifact.is_written() {
            println!("{}", artifact);
        } else {
            eprintln!("{}", artifact);
        }
    }

    if report.is_success() {
        info!("All {} artifacts generated", report.artifacts.len());
        Ok(IpamExitCode::Success)
    } else {
        warn!(
            "{} of {} artifacts failed",
            report.failures().count(),
            report.artifacts.len()
        );
        Ok(IpamExitCode::PartialFailure)
    }
}
