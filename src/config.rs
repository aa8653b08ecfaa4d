//! Server configuration from environment variables
//!
//! - `DATASET_PATH`: emissions dataset (default `data/emissions_dataset.json`)
//! - `HOST`: bind address (default `0.0.0.0`)
//! - `PORT`: bind port (default `8000`)

use anyhow::{Context, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::factors::DEFAULT_DATASET_PATH;

pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub dataset_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Unset keys keep their defaults;
    /// set but unparsable values are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("DATASET_PATH").filter(|p| !p.is_empty()) {
            config.dataset_path = PathBuf::from(path);
        }

        if let Some(host) = lookup("HOST") {
            config.host = host
                .parse()
                .with_context(|| format!("Invalid HOST: {}", host))?;
        }

        if let Some(port) = lookup("PORT") {
            config.port = port
                .parse()
                .with_context(|| format!("Invalid PORT: {}", port))?;
        }

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
