mod config;
mod events;
mod metrics;
mod snapshot;
mod types;

pub use config::*;
pub use metrics::*;
pub use types::*;

use chipstake_types::{ChipstakeError, ChipstakeResult};
use sled::{Db, Tree};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

const CURRENT_SCHEMA_VERSION: u32 = 1;
const SCHEMA_KEY: &[u8] = b"__schema_version__";

/// sled-backed persistence for one ledger: the latest bincode snapshot plus
/// the append-only event log keyed by big-endian sequence number.
pub struct LedgerStore {
    db: Db,
    schema: Tree,
    snapshot: Tree,
    events: Tree,
    audit_log: Tree,
    storage_config: StorageConfig,
    metrics: Arc<StorageMetrics>,
    #[cfg(test)]
    pub(crate) faults: FaultPlan,
}

/// Scripted storage failures for exercising recovery paths.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct FaultPlan {
    pub commits: std::sync::atomic::AtomicU32,
    pub loads: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl FaultPlan {
    fn trip(counter: &std::sync::atomic::AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    pub(crate) fn commit_fails(&self) -> bool {
        Self::trip(&self.commits)
    }

    pub(crate) fn load_fails(&self) -> bool {
        Self::trip(&self.loads)
    }
}

impl LedgerStore {
    pub fn open(config: StorageConfig) -> ChipstakeResult<Self> {
        let path = &config.path;
        info!("Opening ledger store at {:?}", path);

        let sled_config = sled::Config::new()
            .path(path)
            .cache_capacity(config.cache_capacity_bytes)
            .mode(sled::Mode::HighThroughput)
            .flush_every_ms(config.flush_every_ms);

        let db = sled_config
            .open()
            .map_err(|e| ChipstakeError::Storage(format!("Failed to open database: {}", e)))?;

        let store = Self::create_from_db(db, config)?;
        store.ensure_schema()?;

        info!("Ledger store opened (schema version {})", CURRENT_SCHEMA_VERSION);
        Ok(store)
    }

    pub fn in_memory() -> ChipstakeResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| ChipstakeError::Storage(format!("Failed to open temp database: {}", e)))?;

        let config = StorageConfig {
            path: std::path::PathBuf::new(),
            ..Default::default()
        };

        let store = Self::create_from_db(db, config)?;
        store.ensure_schema()?;
        Ok(store)
    }

    fn create_from_db(db: Db, config: StorageConfig) -> ChipstakeResult<Self> {
        let schema = Self::open_tree(&db, "schema")?;
        let snapshot = Self::open_tree(&db, "snapshot")?;
        let events = Self::open_tree(&db, "events")?;
        let audit_log = Self::open_tree(&db, "audit_log")?;

        Ok(Self {
            db,
            schema,
            snapshot,
            events,
            audit_log,
            storage_config: config,
            metrics: Arc::new(StorageMetrics::new()),
            #[cfg(test)]
            faults: FaultPlan::default(),
        })
    }

    fn open_tree(db: &Db, name: &str) -> ChipstakeResult<Tree> {
        db.open_tree(name)
            .map_err(|e| ChipstakeError::Storage(format!("Failed to open {} tree: {}", name, e)))
    }

    fn ensure_schema(&self) -> ChipstakeResult<()> {
        match self.schema_info()? {
            None => self.initialize_schema(),
            Some(info) if info.version > CURRENT_SCHEMA_VERSION => Err(ChipstakeError::Storage(format!(
                "Database schema version {} is newer than supported {}",
                info.version, CURRENT_SCHEMA_VERSION
            ))),
            Some(info) if info.version < CURRENT_SCHEMA_VERSION => Err(ChipstakeError::Storage(format!(
                "Database schema version {} has no migration path to {}",
                info.version, CURRENT_SCHEMA_VERSION
            ))),
            Some(_) => Ok(()),
        }
    }

    fn initialize_schema(&self) -> ChipstakeResult<()> {
        info!("Initializing new ledger store with schema version {}", CURRENT_SCHEMA_VERSION);

        let info = SchemaInfo {
            version: CURRENT_SCHEMA_VERSION,
            created_at: chrono::Utc::now().timestamp(),
        };

        let bytes = bincode::serialize(&info)
            .map_err(|e| ChipstakeError::Storage(format!("Failed to serialize schema: {}", e)))?;

        self.schema
            .insert(SCHEMA_KEY, bytes)
            .map_err(|e| ChipstakeError::Storage(format!("Failed to store schema: {}", e)))?;

        self.flush()
    }

    pub fn schema_info(&self) -> ChipstakeResult<Option<SchemaInfo>> {
        match self
            .schema
            .get(SCHEMA_KEY)
            .map_err(|e| ChipstakeError::Storage(format!("Schema read error: {}", e)))?
        {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes).map_err(|e| {
                ChipstakeError::Storage(format!("Schema deserialize error: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    pub fn schema_version(&self) -> ChipstakeResult<u32> {
        self.schema_info().map(|info| info.map(|i| i.version).unwrap_or(0))
    }

    pub(crate) fn log_audit(&self, tree: &str, operation: &str, details: Option<&str>) -> ChipstakeResult<()> {
        let entry = AuditLogEntry {
            timestamp: chrono::Utc::now().timestamp_millis(),
            tree: tree.to_string(),
            operation: operation.to_string(),
            details: details.map(String::from),
        };

        let id = self
            .db
            .generate_id()
            .map_err(|e| ChipstakeError::Storage(format!("Audit id error: {}", e)))?;
        let value = bincode::serialize(&entry)
            .map_err(|e| ChipstakeError::Storage(format!("Audit serialize error: {}", e)))?;

        self.audit_log
            .insert(id.to_be_bytes(), value)
            .map_err(|e| ChipstakeError::Storage(format!("Audit write error: {}", e)))?;

        debug!("Audit {}::{} {:?}", tree, operation, details);
        Ok(())
    }

    pub fn audit_entries(&self, limit: usize) -> ChipstakeResult<Vec<AuditLogEntry>> {
        let mut entries = Vec::new();
        for result in self.audit_log.iter().rev().take(limit) {
            let (_, value) = result
                .map_err(|e| ChipstakeError::Storage(format!("Failed to iterate audit log: {}", e)))?;
            let entry: AuditLogEntry = bincode::deserialize(&value)
                .map_err(|e| ChipstakeError::Storage(format!("Audit deserialize error: {}", e)))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    pub fn tree_sizes(&self) -> TreeSizes {
        TreeSizes {
            snapshot: self.snapshot.len(),
            events: self.events.len(),
            audit_log: self.audit_log.len(),
        }
    }

    pub fn flush(&self) -> ChipstakeResult<()> {
        self.metrics.flushes.fetch_add(1, Ordering::Relaxed);
        self.db
            .flush()
            .map_err(|e| ChipstakeError::Storage(format!("Flush error: {}", e)))?;
        Ok(())
    }

    pub async fn flush_async(&self) -> ChipstakeResult<()> {
        self.metrics.flushes.fetch_add(1, Ordering::Relaxed);
        self.db
            .flush_async()
            .await
            .map_err(|e| ChipstakeError::Storage(format!("Flush error: {}", e)))?;
        Ok(())
    }

    pub fn size_on_disk(&self) -> ChipstakeResult<u64> {
        self.db
            .size_on_disk()
            .map_err(|e| ChipstakeError::Storage(format!("Size error: {}", e)))
    }

    pub fn storage_metrics(&self) -> Arc<StorageMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn config(&self) -> &StorageConfig {
        &self.storage_config
    }

    pub fn is_in_memory(&self) -> bool {
        self.storage_config.path.as_os_str().is_empty()
    }
}
