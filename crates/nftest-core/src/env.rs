//! Harness settings taken from the environment.
//!
//! Built once at startup and passed to whatever needs it.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use tracing::Level;

use crate::syslog::RelayConfig;

pub const ENV_OUTPUT: &str = "NFT_OUTPUT";
pub const ENV_TEMP: &str = "NFT_TEMP";
pub const ENV_INIT: &str = "NFT_INIT";
pub const ENV_LOG: &str = "NFT_LOG";
pub const ENV_LOG_LEVEL: &str = "NFT_LOG_LEVEL";
pub const ENV_PIPELINE: &str = "NFT_PIPELINE";
pub const ENV_SYSLOG_HOST: &str = "NFT_SYSLOG_HOST";

/// Executable launched for each case unless overridden.
pub const DEFAULT_PIPELINE: &str = "nextflow";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessEnv {
    /// Root for per-case output directories.
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    /// Where `nftest init` writes its templates.
    pub init_dir: PathBuf,
    pub log_file: PathBuf,
    /// Console verbosity. The log file always records DEBUG.
    pub log_level: Level,
    pub pipeline: String,
    pub syslog_host: IpAddr,
}

impl HarnessEnv {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::from_lookup(|key| std::env::var(key).ok(), cwd)
    }

    /// Read settings through `lookup`; `cwd` is the default init directory.
    pub fn from_lookup<F>(lookup: F, cwd: PathBuf) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let output_dir = PathBuf::from(lookup(ENV_OUTPUT).unwrap_or_else(|| "./".to_string()));
        let log_file = lookup(ENV_LOG)
            .map(PathBuf::from)
            .unwrap_or_else(|| output_dir.join("nftest.log"));

        Self {
            temp_dir: PathBuf::from(lookup(ENV_TEMP).unwrap_or_else(|| "./".to_string())),
            init_dir: lookup(ENV_INIT).map(PathBuf::from).unwrap_or(cwd),
            log_level: lookup(ENV_LOG_LEVEL)
                .and_then(|name| parse_level(&name))
                .unwrap_or(Level::INFO),
            pipeline: lookup(ENV_PIPELINE).unwrap_or_else(|| DEFAULT_PIPELINE.to_string()),
            syslog_host: lookup(ENV_SYSLOG_HOST)
                .and_then(|host| host.parse().ok())
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            output_dir,
            log_file,
        }
    }

    /// Relay settings for this environment.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            bind_host: self.syslog_host,
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Parse a level name, also accepting `WARNING`, `CRITICAL` and `NOTSET`.
pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_uppercase().as_str() {
        "CRITICAL" | "FATAL" | "ERROR" => Some(Level::ERROR),
        "WARNING" | "WARN" => Some(Level::WARN),
        "INFO" => Some(Level::INFO),
        "DEBUG" => Some(Level::DEBUG),
        "TRACE" | "NOTSET" => Some(Level::TRACE),
        _ => None,
    }
}
