//! Driver configuration
//!
//! Settings come from a TOML file with a `[netscaler_driver]` table and an
//! optional `[[networks]]` list. Connection settings given on the command
//! line or in the environment take precedence over the file.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::collector::CollectorConfig;
use crate::error::{Error, Result};
use crate::ncc::NccClientConfig;
use crate::network::NetworkEntry;

pub const DEFAULT_PERIODIC_TASK_INTERVAL: &str = "2";
pub const DEFAULT_STATUS_COLLECTION: &str = "True,300";
pub const DEFAULT_PAGE_SIZE: u32 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Whether the member status sweep runs, and how many groups it asks for
/// per page
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StatusCollection {
    pub enabled: bool,
    pub page_size: u32,
}

impl Default for StatusCollection {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FromStr for StatusCollection {
    type Err = Error;

    /// Parses `"<enabled>,<page size>"`, e.g. `"True,300"`
    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.splitn(2, ',');
        let enabled = parts
            .next()
            .map(|flag| flag.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let page_size = match parts.next() {
            None => DEFAULT_PAGE_SIZE,
            Some(size) => match size.trim().parse::<u32>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(Error::ConfigError(format!(
                        "netscaler_status_collection page size must be a positive integer, got '{}'",
                        size.trim()
                    )))
                }
            },
        };

        Ok(Self { enabled, page_size })
    }
}

fn parse_interval(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::ConfigError(format!(
            "periodic_task_interval must be a positive number of seconds, got '{}'",
            raw.trim()
        ))),
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DriverSection {
    pub netscaler_ncc_uri: Option<String>,
    pub netscaler_ncc_username: Option<String>,
    pub netscaler_ncc_password: Option<String>,
    pub netscaler_ncc_cleanup_mode: Option<String>,
    pub periodic_task_interval: String,
    pub netscaler_status_collection: String,
    pub request_timeout_secs: u64,
    pub max_status_pages: u32,
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            netscaler_ncc_uri: None,
            netscaler_ncc_username: None,
            netscaler_ncc_password: None,
            netscaler_ncc_cleanup_mode: None,
            periodic_task_interval: DEFAULT_PERIODIC_TASK_INTERVAL.to_string(),
            netscaler_status_collection: DEFAULT_STATUS_COLLECTION.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_status_pages: 0,
        }
    }
}

/// Raw contents of the config file
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub netscaler_driver: DriverSection,
    pub networks: Vec<NetworkEntry>,
}

/// Values from the command line or environment that win over the file
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub ncc_uri: Option<String>,
    pub ncc_username: Option<String>,
    pub ncc_password: Option<String>,
}

/// Validated settings for the whole driver process
#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub ncc: NccClientConfig,
    pub collector: CollectorConfig,
    pub networks: Vec<NetworkEntry>,
}

impl DriverConfig {
    /// Load the config file at `path` (if any) and apply `overrides`
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match path {
            Some(path) => {
                debug!("Loading driver config from {}", path.display());
                let raw = std::fs::read_to_string(path).map_err(|e| {
                    Error::ConfigError(format!("Failed to read {}: {e}", path.display()))
                })?;
                toml::from_str(&raw)?
            }
            None => ConfigFile::default(),
        };
        Self::from_file(file, overrides)
    }

    pub fn from_toml_str(raw: &str, overrides: Overrides) -> Result<Self> {
        Self::from_file(toml::from_str(raw)?, overrides)
    }

    pub fn from_file(file: ConfigFile, overrides: Overrides) -> Result<Self> {
        let section = file.netscaler_driver;

        let uri = overrides
            .ncc_uri
            .or(section.netscaler_ncc_uri)
            .filter(|uri| !uri.trim().is_empty())
            .ok_or_else(|| {
                Error::ConfigError("netscaler_ncc_uri is not configured".to_string())
            })?;

        let interval = parse_interval(&section.periodic_task_interval)?;
        let status_collection: StatusCollection = section.netscaler_status_collection.parse()?;

        if section.request_timeout_secs == 0 {
            return Err(Error::ConfigError(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            ncc: NccClientConfig {
                uri,
                username: overrides.ncc_username.or(section.netscaler_ncc_username),
                password: overrides.ncc_password.or(section.netscaler_ncc_password),
                cleanup_mode: section.netscaler_ncc_cleanup_mode,
                timeout: Duration::from_secs(section.request_timeout_secs),
            },
            collector: CollectorConfig {
                interval,
                status_collection,
                max_pages: (section.max_status_pages > 0).then_some(section.max_status_pages),
            },
            networks: file.networks,
        })
    }
}

/// Effective settings with the password hidden
impl fmt::Display for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "netscaler_ncc_uri = {}", self.ncc.uri)?;
        writeln!(
            f,
            "netscaler_ncc_username = {}",
            self.ncc.username.as_deref().unwrap_or("<unset>")
        )?;
        writeln!(
            f,
            "netscaler_ncc_password = {}",
            if self.ncc.password.is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        )?;
        writeln!(
            f,
            "netscaler_ncc_cleanup_mode = {}",
            self.ncc.cleanup_mode.as_deref().unwrap_or("<unset>")
        )?;
        writeln!(f, "request_timeout_secs = {}", self.ncc.timeout.as_secs())?;
        writeln!(
            f,
            "periodic_task_interval = {}",
            self.collector.interval.as_secs()
        )?;
        writeln!(
            f,
            "status_collection = {} (page size {})",
            self.collector.status_collection.enabled, self.collector.status_collection.page_size
        )?;
        match self.collector.max_pages {
            Some(max) => writeln!(f, "max_status_pages = {max}")?,
            None => writeln!(f, "max_status_pages = unbounded")?,
        }
        write!(f, "networks = {}", self.networks.len())
    }
}
