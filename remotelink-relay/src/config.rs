use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use color_eyre::eyre::bail;
use serde::Deserialize;

use crate::reconcile::TelemetryLiveness;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub transport: TransportConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address for the HTTP server to listen on
    pub http_addr: SocketAddr,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    Memory,
    Sqlite { path: PathBuf },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    Mock {
        /// Remotes that refuse every command
        #[serde(default)]
        offline: Vec<String>,
    },
    Http {
        /// Base URL of the device manager API
        endpoint: String,
        /// Registry path the remote id is appended to
        device_path: String,
        /// Bearer token sent with every request
        #[serde(default)]
        token: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct PollerConfig {
    pub enabled: bool,
    /// Interval in seconds between liveness sweeps
    pub interval_secs: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 60,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub liveness: TelemetryLiveness,
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> color_eyre::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> color_eyre::Result<()> {
        if self.poller.enabled && self.poller.interval_secs == 0 {
            bail!("poller.interval_secs must be at least 1");
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                http_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            },
            storage: StorageConfig::Memory,
            transport: TransportConfig::Mock {
                offline: Vec::new(),
            },
            poller: PollerConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}
