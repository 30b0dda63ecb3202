//! The running ledger: in-memory state behind a tokio `RwLock`, persisted to
//! a [`LedgerStore`] after every accepted transaction.

use crate::config::DaemonConfig;
use crate::storage::LedgerStore;
use chipstake_ledger::{Ledger, Receipt, Transaction};
use chipstake_types::{ChipstakeError, ChipstakeResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock, RwLockReadGuard};
use tracing::{error, info};

pub struct LedgerService {
    ledger: Arc<RwLock<Ledger>>,
    store: LedgerStore,
    head: watch::Sender<u64>,
    halted: AtomicBool,
}

/// Outcome of one entry of a transaction batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub index: usize,
    pub command: &'static str,
    pub result: ChipstakeResult<Receipt>,
}

impl LedgerService {
    pub fn new(ledger: Ledger, store: LedgerStore) -> Self {
        let (head, _) = watch::channel(ledger.events().next_seq());
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            store,
            head,
            halted: AtomicBool::new(false),
        }
    }

    /// Creates a ledger from the config's genesis and protocol sections.
    pub fn initialize(config: &DaemonConfig, store: LedgerStore) -> ChipstakeResult<Self> {
        config.validate_genesis()?;
        let ledger = Ledger::new(config.protocol.clone(), &config.genesis)?;
        store.initialize(&ledger)?;
        Ok(Self::new(ledger, store))
    }

    pub fn open(store: LedgerStore) -> ChipstakeResult<Self> {
        let ledger = store.load_ledger()?.ok_or_else(|| {
            ChipstakeError::Config("Ledger store is empty. Run `chipstake init` first.".into())
        })?;
        Ok(Self::new(ledger, store))
    }

    pub fn ledger(&self) -> Arc<RwLock<Ledger>> {
        Arc::clone(&self.ledger)
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.ledger.read().await
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// True once a failed commit could not be rolled back. Every later
    /// write is refused until the daemon restarts from disk.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Next event sequence number, updated after each commit.
    pub fn subscribe_head(&self) -> watch::Receiver<u64> {
        self.head.subscribe()
    }

    /// Applies and persists one transaction. A rejected transaction leaves
    /// both memory and disk untouched. If persisting fails the last snapshot
    /// is reloaded; if that fails too the service halts.
    pub async fn submit(&self, tx: Transaction) -> ChipstakeResult<Receipt> {
        let mut ledger = self.ledger.write().await;
        if self.is_halted() {
            return Err(ChipstakeError::Storage(
                "Ledger halted after a failed rollback; restart required".into(),
            ));
        }
        let receipt = ledger.apply_transaction(tx)?;

        if let Err(e) = self.store.commit(&ledger, &receipt.events) {
            error!("Persisting {} failed, restoring last snapshot: {}", receipt.command, e);
            match self.store.load_ledger() {
                Ok(Some(restored)) => *ledger = restored,
                Ok(None) => {
                    self.halted.store(true, Ordering::SeqCst);
                    error!("No snapshot to restore, halting writes");
                }
                Err(restore_err) => {
                    self.halted.store(true, Ordering::SeqCst);
                    error!("Restoring snapshot failed, halting writes: {}", restore_err);
                }
            }
            return Err(e);
        }

        let next = ledger.events().next_seq();
        self.head.send_replace(next);
        Ok(receipt)
    }

    /// Applies transactions in order. Stops at the first failure unless
    /// `keep_going` is set.
    pub async fn submit_batch(&self, txs: Vec<Transaction>, keep_going: bool) -> Vec<BatchEntry> {
        let mut entries = Vec::with_capacity(txs.len());
        for (index, tx) in txs.into_iter().enumerate() {
            let command = tx.command.name();
            let result = self.submit(tx).await;
            let failed = result.is_err();
            entries.push(BatchEntry { index, command, result });
            if failed && !keep_going {
                break;
            }
        }
        let accepted = entries.iter().filter(|e| e.result.is_ok()).count();
        info!("Batch applied: {} accepted, {} rejected", accepted, entries.len() - accepted);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use chipstake_ledger::{Command, NewNode};
    use chipstake_types::{LedgerError, ONE_TOKEN};

    #[tokio::test]
    async fn test_submit_persists_snapshot_and_events() {
        let service = service();
        let receipt = service
            .submit(tx(ADMIN, 10, create_node(OPERATOR, 500)))
            .await
            .unwrap();
        assert_eq!(receipt.command, "create_node");
        assert_eq!(*service.subscribe_head().borrow(), 1);

        let reloaded = service.store().load_ledger().unwrap().unwrap();
        assert_eq!(reloaded.get_node_count(), 1);
        assert_eq!(reloaded.events().len(), 1);
        assert_eq!(reloaded.last_timestamp(), 10);
    }

    #[tokio::test]
    async fn test_rejected_transaction_is_not_persisted() {
        let service = service();
        let err = service
            .submit(tx(ALICE, 10, Command::Pause))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChipstakeError::Ledger(LedgerError::AccessControlUnauthorizedAccount { .. })
        ));
        assert_eq!(service.store().event_count(), 0);
        assert!(!service.read().await.is_paused());
    }

    #[tokio::test]
    async fn test_batch_stops_at_first_failure() {
        let service = service();
        let txs = vec![
            tx(ADMIN, 1, create_node(OPERATOR, 500)),
            tx(ADMIN, 2, create_node(OPERATOR, 500)),
            tx(ALICE, 3, Command::Stake { node: addr(OPERATOR), amount: 1_000 * ONE_TOKEN }),
        ];

        let entries = service.submit_batch(txs.clone(), false).await;
        assert_eq!(entries.len(), 2);
        assert!(entries[0].result.is_ok());
        assert!(matches!(
            entries[1].result,
            Err(ChipstakeError::Ledger(LedgerError::NodeExists(_)))
        ));

        let entries = service.submit_batch(txs[1..].to_vec(), true).await;
        assert_eq!(entries.len(), 2);
        assert!(entries[1].result.is_ok());
    }

    #[tokio::test]
    async fn test_failed_commit_restores_last_snapshot() {
        let service = service();
        service.submit(tx(ADMIN, 1, create_node(OPERATOR, 500))).await.unwrap();

        service.store().faults.commits.store(1, Ordering::SeqCst);
        let err = service
            .submit(tx(ALICE, 2, Command::Stake { node: addr(OPERATOR), amount: 1_000 * ONE_TOKEN }))
            .await
            .unwrap_err();
        assert!(matches!(err, ChipstakeError::Storage(_)));
        assert!(!service.is_halted());

        {
            let ledger = service.read().await;
            assert_eq!(ledger.events().len(), 1);
            assert_eq!(ledger.get_node(&addr(OPERATOR)).unwrap().staking_pool_tokens, 0);
        }
        assert_eq!(*service.subscribe_head().borrow(), 1);

        service
            .submit(tx(ALICE, 3, Command::Stake { node: addr(OPERATOR), amount: 1_000 * ONE_TOKEN }))
            .await
            .unwrap();
        assert_eq!(service.store().event_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_rollback_halts_writes() {
        let service = service();
        service.submit(tx(ADMIN, 1, create_node(OPERATOR, 500))).await.unwrap();

        service.store().faults.commits.store(1, Ordering::SeqCst);
        service.store().faults.loads.store(1, Ordering::SeqCst);
        let stake = Command::Stake { node: addr(OPERATOR), amount: 1_000 * ONE_TOKEN };
        assert!(service.submit(tx(ALICE, 2, stake.clone())).await.is_err());
        assert!(service.is_halted());

        let err = service.submit(tx(ALICE, 3, stake)).await.unwrap_err();
        assert!(matches!(err, ChipstakeError::Storage(_)));
        assert_eq!(service.store().event_count(), 1);

        let on_disk = service.store().load_ledger().unwrap().unwrap();
        assert_eq!(on_disk.get_node(&addr(OPERATOR)).unwrap().staking_pool_tokens, 0);
    }

    #[tokio::test]
    async fn test_open_requires_initialized_store() {
        let store = LedgerStore::in_memory().unwrap();
        assert!(matches!(LedgerService::open(store), Err(ChipstakeError::Config(_))));
    }

    #[tokio::test]
    async fn test_initialize_rejects_missing_admin() {
        let mut config = config();
        config.genesis.admin = chipstake_types::EthAddress::zero();
        let store = LedgerStore::in_memory().unwrap();
        assert!(LedgerService::initialize(&config, store).is_err());
    }

    #[tokio::test]
    async fn test_initialize_then_reopen() {
        let service = service();
        service
            .submit(tx(ADMIN, 5, Command::CreateNode(NewNode {
                account: addr(OPERATOR),
                name: "op".into(),
                description: String::new(),
                tax_rate_basis_points: 700,
                public_good: false,
                alpha: true,
            })))
            .await
            .unwrap();

        let ledger = service.store().load_ledger().unwrap().unwrap();
        let node = ledger.get_node(&addr(OPERATOR)).unwrap();
        assert!(node.alpha);
        assert_eq!(node.tax_rate_basis_points, 700);
    }
}
