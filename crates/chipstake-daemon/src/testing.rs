//! Fixtures shared by the daemon's unit tests.

use crate::config::DaemonConfig;
use crate::service::LedgerService;
use crate::storage::LedgerStore;
use chipstake_ledger::{Command, GenesisBalance, NewNode, Transaction};
use chipstake_types::{EthAddress, ONE_TOKEN};
use std::sync::Arc;

pub const ADMIN: u64 = 0xa0;
pub const ORACLE: u64 = 0xa1;
pub const PAUSER: u64 = 0xa2;
pub const TREASURY: u64 = 0xa3;
pub const OPERATOR: u64 = 0x100;
pub const ALICE: u64 = 0x200;
pub const BOB: u64 = 0x201;

pub fn addr(n: u64) -> EthAddress {
    EthAddress::from_low_u64(n)
}

pub fn config() -> DaemonConfig {
    let mut config = DaemonConfig::default();
    config.genesis.admin = addr(ADMIN);
    config.genesis.oracles = vec![addr(ORACLE)];
    config.genesis.pausers = vec![addr(PAUSER)];
    config.genesis.treasury = addr(TREASURY);
    config.genesis.balances = [OPERATOR, ALICE, BOB]
        .into_iter()
        .map(|n| GenesisBalance {
            account: addr(n),
            amount: 1_000_000 * ONE_TOKEN,
        })
        .collect();
    config
}

pub fn service() -> Arc<LedgerService> {
    let store = LedgerStore::in_memory().expect("in-memory store");
    Arc::new(LedgerService::initialize(&config(), store).expect("initialize ledger"))
}

pub fn tx(sender: u64, timestamp: u64, command: Command) -> Transaction {
    Transaction {
        sender: addr(sender),
        timestamp,
        command,
    }
}

pub fn create_node(account: u64, tax_rate_basis_points: u64) -> Command {
    Command::CreateNode(NewNode {
        account: addr(account),
        name: format!("node-{:x}", account),
        description: String::new(),
        tax_rate_basis_points,
        public_good: false,
        alpha: false,
    })
}
