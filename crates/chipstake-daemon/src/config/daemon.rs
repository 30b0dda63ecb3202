use chipstake_ledger::{Genesis, ProtocolParams};
use chipstake_types::{ChipstakeError, ChipstakeResult};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::api::ApiConfig;
use super::constants::{DEFAULT_DATA_DIR_NAME, DEFAULT_SYSTEM_DATA_DIR, STORE_DIR_NAME};
use super::logging::LoggingConfig;
use super::storage::StorageSettings;
use super::types::LogLevel;
use crate::storage::StorageConfig;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub data_dir: PathBuf,
    pub protocol: ProtocolParams,
    pub genesis: Genesis,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
    pub storage: StorageSettings,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            protocol: ProtocolParams::default(),
            genesis: Genesis::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
            storage: StorageSettings::default(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(DEFAULT_DATA_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SYSTEM_DATA_DIR))
}

impl DaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> ChipstakeResult<Self> {
        let path = path.as_ref();

        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| ChipstakeError::Config(format!("Failed to read config: {}", e)))?;

            toml::from_str(&contents)
                .map_err(|e| ChipstakeError::Config(format!("Failed to parse config: {}", e)))?
        } else {
            info!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> ChipstakeResult<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ChipstakeError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ChipstakeError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path.as_ref(), contents)
            .map_err(|e| ChipstakeError::Config(format!("Failed to write config: {}", e)))?;

        info!("Configuration saved to {:?}", path.as_ref());
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("CHIPSTAKE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(port) = std::env::var("CHIPSTAKE_API_PORT") {
            if let Ok(p) = port.parse() {
                self.api.port = p;
            }
        }

        if let Ok(bind) = std::env::var("CHIPSTAKE_API_BIND") {
            if let Ok(addr) = bind.parse() {
                self.api.bind_address = addr;
                if !self.api_is_localhost_only() {
                    warn!(
                        "API server binding to non-localhost address: {}. Transactions are unauthenticated.",
                        bind
                    );
                }
            }
        }

        if let Ok(level) = std::env::var("CHIPSTAKE_LOG_LEVEL") {
            self.logging.level = LogLevel::parse(&level);
        }

        if let Ok(level) = std::env::var("CHIPSTAKE_LEDGER_LOG_LEVEL") {
            self.logging.ledger_level = Some(LogLevel::parse(&level));
        }

        if std::env::var("CHIPSTAKE_LOG_JSON").is_ok() {
            self.logging.json = true;
        }
    }

    pub fn validate(&self) -> ChipstakeResult<()> {
        self.protocol
            .validate()
            .map_err(|e| ChipstakeError::Config(format!("Invalid protocol section: {}", e)))?;

        if self.api.enabled && self.api.port == 0 {
            return Err(ChipstakeError::Config("API port cannot be 0".into()));
        }

        if self.api.max_body_size < 1024 {
            return Err(ChipstakeError::Config(
                "Max body size must be at least 1024 bytes".into(),
            ));
        }

        if self.api.default_event_page == 0 || self.api.default_event_page > self.api.max_event_page {
            return Err(ChipstakeError::Config(format!(
                "api.default_event_page must be within 1..={}",
                self.api.max_event_page
            )));
        }

        if self.api.max_node_page == 0 || self.api.stream_keep_alive_secs == 0 {
            return Err(ChipstakeError::Config(
                "api.max_node_page and api.stream_keep_alive_secs must be positive".into(),
            ));
        }

        if self.api.request_timeout_secs == 0 {
            return Err(ChipstakeError::Config("Request timeout cannot be 0".into()));
        }

        if self.storage.cache_capacity_mb == 0 {
            return Err(ChipstakeError::Config("Storage cache capacity cannot be 0".into()));
        }

        if self.api.submit_enabled && !self.api_is_localhost_only() {
            warn!("POST /tx is reachable from {}; restrict access at the network layer", self.api.bind_address);
        }

        Ok(())
    }

    /// Checks the parts of `genesis` that only matter when a new ledger is created.
    pub fn validate_genesis(&self) -> ChipstakeResult<()> {
        if self.genesis.admin.is_zero() {
            return Err(ChipstakeError::Config("genesis.admin must be set".into()));
        }
        if self.genesis.treasury.is_zero() {
            return Err(ChipstakeError::Config("genesis.treasury must be set".into()));
        }
        let rate = self.genesis.public_pool_tax_rate();
        if !rate.is_valid() || rate.0 < self.protocol.min_tax_rate_basis_points {
            return Err(ChipstakeError::Config(format!(
                "genesis.public_pool_tax_rate_basis_points {} outside {}..=10000",
                rate, self.protocol.min_tax_rate_basis_points
            )));
        }
        Ok(())
    }

    pub fn api_socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.api.bind_address, self.api.port)
    }

    pub fn api_is_localhost_only(&self) -> bool {
        match self.api.bind_address {
            IpAddr::V4(addr) => addr.is_loopback(),
            IpAddr::V6(addr) => addr.is_loopback(),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_DIR_NAME)
    }

    pub fn storage_config(&self) -> StorageConfig {
        StorageConfig {
            path: self.store_path(),
            cache_capacity_bytes: self.storage.cache_capacity_mb * 1024 * 1024,
            flush_every_ms: self.storage.flush_every_ms,
            sync_on_commit: self.storage.sync_on_commit,
        }
    }
}
