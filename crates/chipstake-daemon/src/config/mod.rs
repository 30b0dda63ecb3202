mod api;
mod constants;
mod daemon;
mod logging;
mod storage;
mod types;

pub use api::ApiConfig;
pub use constants::*;
pub use daemon::{default_data_dir, DaemonConfig};
pub use logging::LoggingConfig;
pub use storage::StorageSettings;
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chipstake_ledger::GenesisBalance;
    use chipstake_types::EthAddress;
    use std::net::{IpAddr, Ipv4Addr};

    fn temp_config_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("chipstake-config-{}-{}", name, std::process::id()))
            .join(CONFIG_FILE_NAME)
    }

    #[test]
    fn test_default_config_validation() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_defaults_to_localhost() {
        let config = DaemonConfig::default();
        assert!(config.api_is_localhost_only());
        assert_eq!(config.api.bind_address, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.api_socket_addr().port(), DEFAULT_API_PORT);
    }

    #[test]
    fn test_invalid_api_port() {
        let mut config = DaemonConfig::default();
        config.api.port = 0;
        assert!(config.validate().is_err());

        config.api.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_protocol_section() {
        let mut config = DaemonConfig::default();
        config.protocol.stake_ratio = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_genesis_is_incomplete() {
        let mut config = DaemonConfig::default();
        assert!(config.validate_genesis().is_err());

        config.genesis.admin = EthAddress::from_low_u64(0xa0);
        assert!(config.validate_genesis().is_err());

        config.genesis.treasury = EthAddress::from_low_u64(0xa3);
        assert!(config.validate_genesis().is_ok());

        config.genesis.public_pool_tax_rate_basis_points = Some(10_001);
        assert!(config.validate_genesis().is_err());
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("DEBUG"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("nonsense"), LogLevel::Info);
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = DaemonConfig::default();
        config.genesis.admin = EthAddress::from_low_u64(0xa0);
        config.genesis.balances.push(GenesisBalance {
            account: EthAddress::from_low_u64(0x200),
            amount: 5_000 * chipstake_types::ONE_TOKEN,
        });

        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");
        let parsed: DaemonConfig = toml::from_str(&toml_str).expect("Failed to parse");
        assert_eq!(parsed.api.port, config.api.port);
        assert_eq!(parsed.protocol, config.protocol);
        assert_eq!(parsed.genesis.admin, config.genesis.admin);
        assert_eq!(parsed.genesis.balances[0].amount, 5_000 * chipstake_types::ONE_TOKEN);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let parsed: DaemonConfig = toml::from_str("[api]\nport = 9000\n").expect("Failed to parse");
        assert_eq!(parsed.api.port, 9000);
        assert!(parsed.api.enabled);
        assert_eq!(parsed.protocol, chipstake_ledger::ProtocolParams::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_config_path("roundtrip");
        let mut config = DaemonConfig::default();
        config.api.port = 9123;
        config.save(&path).unwrap();

        let loaded = DaemonConfig::load(&path).unwrap();
        assert_eq!(loaded.api.port, 9123);

        if let Some(dir) = path.parent() {
            let _ = std::fs::remove_dir_all(dir);
        }
    }

    #[test]
    fn test_storage_config_lives_under_data_dir() {
        let mut config = DaemonConfig::default();
        config.data_dir = std::path::PathBuf::from("/tmp/chipstake-x");
        let storage = config.storage_config();
        assert_eq!(storage.path, std::path::PathBuf::from("/tmp/chipstake-x").join(STORE_DIR_NAME));
        assert_eq!(storage.cache_capacity_bytes, 64 * 1024 * 1024);
    }

    #[test]
    fn test_event_and_node_page_bounds() {
        let api = ApiConfig::default();
        assert_eq!(api.event_page(None), DEFAULT_EVENT_PAGE);
        assert_eq!(api.event_page(Some(0)), 1);
        assert_eq!(api.event_page(Some(usize::MAX)), MAX_EVENT_PAGE);
        assert_eq!(api.node_page(Some(3)), 3);
        assert_eq!(api.node_page(None), MAX_NODE_PAGE);
    }

    #[test]
    fn test_rejects_default_page_above_max() {
        let mut config = DaemonConfig::default();
        config.api.default_event_page = config.api.max_event_page + 1;
        assert!(config.validate().is_err());
    }
}
