//! Network configuration.
//!
//! Load from: an explicit path, env `STAKEVIEW_NETWORKS_PATH`, or
//! `./config/networks.json`.
//!
//! ```json
//! { "networks": [ { "id": "cosmos-hub-mainnet", "api_url": "https://lcd.example.com",
//!   "rpc_url": "https://rpc.example.com", "address_prefix": "cosmos", "protocol": "v2" } ] }
//! ```

use crate::client::ProtocolVersion;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const NETWORKS_PATH_ENV: &str = "STAKEVIEW_NETWORKS_PATH";
const DEFAULT_NETWORKS_PATH: &str = "./config/networks.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("network {network:?}: {reason}")]
    Invalid { network: String, reason: String },
    #[error("unknown network {0:?}")]
    UnknownNetwork(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub id: String,
    /// REST endpoint of the node.
    pub api_url: String,
    /// Tendermint RPC endpoint, source of new-block events.
    pub rpc_url: String,
    /// Bech32 prefix of account addresses (`cosmos`).
    pub address_prefix: String,
    #[serde(default)]
    pub protocol: ProtocolVersion,
}

impl NetworkConfig {
    fn invalid(&self, reason: impl Into<String>) -> ConfigError {
        ConfigError::Invalid {
            network: self.id.clone(),
            reason: reason.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(self.invalid("empty id"));
        }
        if self.address_prefix.trim().is_empty() {
            return Err(self.invalid("empty address_prefix"));
        }
        for (field, value) in [("api_url", &self.api_url), ("rpc_url", &self.rpc_url)] {
            Url::parse(value).map_err(|e| self.invalid(format!("{field}: {e}")))?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworksConfig {
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

impl NetworksConfig {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, else env `STAKEVIEW_NETWORKS_PATH`, else `./config/networks.json`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        match std::env::var(NETWORKS_PATH_ENV) {
            Ok(path) => Self::load_from_path(Path::new(&path)),
            Err(_) => Self::load_from_path(Path::new(DEFAULT_NETWORKS_PATH)),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        for network in &self.networks {
            network.validate()?;
            if !ids.insert(network.id.as_str()) {
                return Err(network.invalid("duplicate id"));
            }
        }
        Ok(())
    }

    pub fn network(&self, id: &str) -> Result<&NetworkConfig, ConfigError> {
        self.networks
            .iter()
            .find(|n| n.id == id)
            .ok_or_else(|| ConfigError::UnknownNetwork(id.to_string()))
    }
}
