use chipstake_daemon::{DaemonConfig, LedgerService, LedgerStore};
use chipstake_ledger::GenesisBalance;
use chipstake_types::{ChipstakeError, ChipstakeResult, EthAddress, TokenAmount};
use std::path::Path;
use tracing::info;

/// Genesis values given on the command line.
#[derive(Default)]
pub struct GenesisOverrides {
    pub admin: Option<EthAddress>,
    pub treasury: Option<EthAddress>,
    pub oracles: Vec<EthAddress>,
    pub pausers: Vec<EthAddress>,
    pub public_pool_tax_rate: Option<u64>,
    pub balances: Vec<String>,
}

impl GenesisOverrides {
    fn is_empty(&self) -> bool {
        self.admin.is_none()
            && self.treasury.is_none()
            && self.oracles.is_empty()
            && self.pausers.is_empty()
            && self.public_pool_tax_rate.is_none()
            && self.balances.is_empty()
    }

    fn apply(self, config: &mut DaemonConfig) -> ChipstakeResult<()> {
        let genesis = &mut config.genesis;
        if let Some(admin) = self.admin {
            genesis.admin = admin;
        }
        if let Some(treasury) = self.treasury {
            genesis.treasury = treasury;
        }
        if !self.oracles.is_empty() {
            genesis.oracles = self.oracles;
        }
        if !self.pausers.is_empty() {
            genesis.pausers = self.pausers;
        }
        if self.public_pool_tax_rate.is_some() {
            genesis.public_pool_tax_rate_basis_points = self.public_pool_tax_rate;
        }
        for entry in &self.balances {
            genesis.balances.push(parse_balance(entry)?);
        }
        Ok(())
    }
}

/// Parses `0xADDRESS=TOKENS`, where TOKENS is a decimal token amount.
pub fn parse_balance(entry: &str) -> ChipstakeResult<GenesisBalance> {
    let (account, amount) = entry.split_once('=').ok_or_else(|| {
        ChipstakeError::Config(format!("Invalid balance '{}', expected ADDRESS=TOKENS", entry))
    })?;
    Ok(GenesisBalance {
        account: account.trim().parse()?,
        amount: TokenAmount::tokens(amount)?.raw,
    })
}

pub fn init_ledger(
    config_path: &Path,
    mut config: DaemonConfig,
    force: bool,
    overrides: GenesisOverrides,
) -> ChipstakeResult<()> {
    println!("\x1b[38;5;214mInitializing CHIPSTAKE ledger...\x1b[0m");
    println!();

    let config_exists = config_path.exists();
    if config_exists && !force && !overrides.is_empty() {
        println!("\x1b[38;5;226mConfiguration already exists at {:?}\x1b[0m", config_path);
        println!("Use --force to rewrite its genesis section");
        return Ok(());
    }

    overrides.apply(&mut config)?;
    config.validate()?;
    config.validate_genesis()?;

    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| ChipstakeError::Config(format!("Failed to create data directory: {}", e)))?;

    let store = LedgerStore::open(config.storage_config())?;
    if store.has_snapshot()? {
        return Err(ChipstakeError::Config(format!(
            "Ledger already initialized at {:?}",
            config.store_path()
        )));
    }

    if !config_exists || force {
        config.save(config_path)?;
    }

    let service = LedgerService::initialize(&config, store)?;
    service.store().flush()?;
    info!("Genesis written to {:?}", config.store_path());

    let minted: u128 = config.genesis.balances.iter().map(|b| b.amount).sum();
    println!();
    println!("\x1b[38;5;214m╔══════════════════════════════════════════════════════════════╗\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  \x1b[1;38;5;214mCHIPSTAKE Ledger Initialized\x1b[0m                                \x1b[38;5;214m║\x1b[0m");
    println!("\x1b[38;5;214m╠══════════════════════════════════════════════════════════════╣\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  Config:   \x1b[38;5;51m{:48}\x1b[0m  \x1b[38;5;214m║\x1b[0m", format!("{:?}", config_path));
    println!("\x1b[38;5;214m║\x1b[0m  Store:    \x1b[38;5;51m{:48}\x1b[0m  \x1b[38;5;214m║\x1b[0m", format!("{:?}", config.store_path()));
    println!("\x1b[38;5;214m║\x1b[0m  Admin:    \x1b[38;5;51m{:48}\x1b[0m  \x1b[38;5;214m║\x1b[0m", config.genesis.admin.to_string());
    println!("\x1b[38;5;214m║\x1b[0m  Treasury: \x1b[38;5;51m{:48}\x1b[0m  \x1b[38;5;214m║\x1b[0m", config.genesis.treasury.to_string());
    println!("\x1b[38;5;214m║\x1b[0m  Supply:   \x1b[38;5;51m{:48}\x1b[0m  \x1b[38;5;214m║\x1b[0m", TokenAmount::wei(minted).to_string());
    println!("\x1b[38;5;214m╠══════════════════════════════════════════════════════════════╣\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  \x1b[38;5;226mNext steps:\x1b[0m                                                 \x1b[38;5;214m║\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  1. Register nodes: \x1b[38;5;51mchipstake apply --file nodes.json\x1b[0m         \x1b[38;5;214m║\x1b[0m");
    println!("\x1b[38;5;214m║\x1b[0m  2. Serve the API:  \x1b[38;5;51mchipstake serve\x1b[0m                           \x1b[38;5;214m║\x1b[0m");
    println!("\x1b[38;5;214m╚══════════════════════════════════════════════════════════════╝\x1b[0m");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chipstake_types::ONE_TOKEN;

    #[test]
    fn test_parse_balance() {
        let balance = parse_balance("0x0000000000000000000000000000000000000200=12.5").unwrap();
        assert_eq!(balance.account, EthAddress::from_low_u64(0x200));
        assert_eq!(balance.amount, 12 * ONE_TOKEN + ONE_TOKEN / 2);
    }

    #[test]
    fn test_parse_balance_rejects_missing_separator() {
        assert!(parse_balance("0x0000000000000000000000000000000000000200").is_err());
        assert!(parse_balance("nope=1").is_err());
    }

    #[test]
    fn test_overrides_replace_genesis_roles() {
        let mut config = DaemonConfig::default();
        config.genesis.oracles = vec![EthAddress::from_low_u64(1)];
        let overrides = GenesisOverrides {
            admin: Some(EthAddress::from_low_u64(0xa0)),
            oracles: vec![EthAddress::from_low_u64(2)],
            balances: vec!["0x00000000000000000000000000000000000000a0=1".into()],
            ..Default::default()
        };
        overrides.apply(&mut config).unwrap();
        assert_eq!(config.genesis.admin, EthAddress::from_low_u64(0xa0));
        assert_eq!(config.genesis.oracles, vec![EthAddress::from_low_u64(2)]);
        assert_eq!(config.genesis.balances.len(), 1);
    }
}
