use super::{LedgerStore, SnapshotHead};
use chipstake_ledger::{EventRecord, Ledger};
use chipstake_types::{ChipstakeError, ChipstakeResult};
use sled::transaction::{ConflictableTransactionResult, TransactionError};
use sled::Transactional;
use std::sync::atomic::Ordering;
use tracing::{debug, info};

const SNAPSHOT_KEY: &[u8] = b"ledger";
const HEAD_KEY: &[u8] = b"head";

impl LedgerStore {
    pub fn has_snapshot(&self) -> ChipstakeResult<bool> {
        self.snapshot
            .contains_key(SNAPSHOT_KEY)
            .map_err(|e| ChipstakeError::Storage(format!("Failed to check snapshot: {}", e)))
    }

    /// Writes the ledger snapshot and the events it produced in one sled
    /// transaction, so a crash never leaves a snapshot ahead of its log.
    pub fn commit(&self, ledger: &Ledger, new_events: &[EventRecord]) -> ChipstakeResult<()> {
        #[cfg(test)]
        if self.faults.commit_fails() {
            return Err(ChipstakeError::Storage("Failed to commit ledger: scripted fault".into()));
        }
        let state = bincode::serialize(ledger)
            .map_err(|e| ChipstakeError::Serialization(format!("Failed to serialize ledger: {}", e)))?;
        let head = SnapshotHead {
            next_event_seq: ledger.events().next_seq(),
            last_timestamp: ledger.last_timestamp(),
            committed_at: chrono::Utc::now().timestamp(),
        };
        let head_bytes = bincode::serialize(&head)
            .map_err(|e| ChipstakeError::Serialization(format!("Failed to serialize head: {}", e)))?;

        let mut encoded = Vec::with_capacity(new_events.len());
        for record in new_events {
            let value = bincode::serialize(record)
                .map_err(|e| ChipstakeError::Serialization(format!("Failed to serialize event: {}", e)))?;
            encoded.push((record.seq.to_be_bytes(), value));
        }

        let written = state.len() + encoded.iter().map(|(_, v)| v.len()).sum::<usize>();

        let result: Result<(), TransactionError<()>> =
            (&self.snapshot, &self.events).transaction(|(snapshot, events)| -> ConflictableTransactionResult<(), ()> {
                snapshot.insert(SNAPSHOT_KEY, state.as_slice())?;
                snapshot.insert(HEAD_KEY, head_bytes.as_slice())?;
                for (key, value) in &encoded {
                    events.insert(&key[..], value.as_slice())?;
                }
                Ok(())
            });

        result.map_err(|e| {
            self.metrics.record_error();
            ChipstakeError::Storage(format!("Failed to commit ledger: {:?}", e))
        })?;

        self.metrics.record_write(written);
        self.metrics.commits.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .events_written
            .fetch_add(new_events.len() as u64, Ordering::Relaxed);

        if self.storage_config.sync_on_commit {
            self.flush()?;
        }

        debug!(
            "Committed snapshot ({} bytes, {} new events, next seq {})",
            state.len(),
            new_events.len(),
            head.next_event_seq
        );
        Ok(())
    }

    pub fn snapshot_head(&self) -> ChipstakeResult<Option<SnapshotHead>> {
        match self
            .snapshot
            .get(HEAD_KEY)
            .map_err(|e| ChipstakeError::Storage(format!("Failed to read snapshot head: {}", e)))?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(|e| {
                ChipstakeError::Storage(format!("Failed to deserialize snapshot head: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    /// Restores the last committed ledger with its event log re-attached.
    pub fn load_ledger(&self) -> ChipstakeResult<Option<Ledger>> {
        #[cfg(test)]
        if self.faults.load_fails() {
            return Err(ChipstakeError::Storage("Failed to read snapshot: scripted fault".into()));
        }
        let bytes = match self
            .snapshot
            .get(SNAPSHOT_KEY)
            .map_err(|e| ChipstakeError::Storage(format!("Failed to read snapshot: {}", e)))?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        self.metrics.record_read(bytes.len());

        let mut ledger: Ledger = bincode::deserialize(&bytes).map_err(|e| {
            self.metrics.record_error();
            ChipstakeError::Storage(format!("Failed to deserialize snapshot: {}", e))
        })?;

        let records = self.load_events()?;
        ledger.attach_events(records)?;

        if let Some(head) = self.snapshot_head()? {
            if head.next_event_seq != ledger.events().next_seq() {
                return Err(ChipstakeError::Storage(format!(
                    "Snapshot expects next event {} but log ends at {}",
                    head.next_event_seq,
                    ledger.events().next_seq()
                )));
            }
        }

        info!(
            "Loaded ledger snapshot: epoch {}, {} nodes, {} events",
            ledger.current_epoch(),
            ledger.get_node_count(),
            ledger.events().len()
        );
        Ok(Some(ledger))
    }

    /// Stores a freshly constructed ledger. Refuses to overwrite an existing one.
    pub fn initialize(&self, ledger: &Ledger) -> ChipstakeResult<()> {
        if self.has_snapshot()? {
            return Err(ChipstakeError::Storage("Ledger store is already initialized".into()));
        }
        self.commit(ledger, &[])?;
        self.log_audit("snapshot", "initialize", None)?;
        info!("Ledger store initialized");
        Ok(())
    }
}
