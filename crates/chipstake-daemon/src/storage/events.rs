use super::LedgerStore;
use chipstake_ledger::EventRecord;
use chipstake_types::{ChipstakeError, ChipstakeResult};

impl LedgerStore {
    fn decode_event(&self, value: &[u8]) -> ChipstakeResult<EventRecord> {
        self.metrics.record_read(value.len());
        bincode::deserialize(value).map_err(|e| {
            self.metrics.record_error();
            ChipstakeError::Storage(format!("Failed to deserialize event: {}", e))
        })
    }

    pub fn load_events(&self) -> ChipstakeResult<Vec<EventRecord>> {
        let mut records = Vec::with_capacity(self.events.len());
        for result in self.events.iter() {
            let (_, value) = result.map_err(|e| {
                self.metrics.record_error();
                ChipstakeError::Storage(format!("Failed to iterate events: {}", e))
            })?;
            records.push(self.decode_event(&value)?);
        }
        Ok(records)
    }

    pub fn events_since(&self, from: u64, limit: usize) -> ChipstakeResult<Vec<EventRecord>> {
        let mut records = Vec::new();
        for result in self.events.range(from.to_be_bytes()..).take(limit) {
            let (_, value) = result.map_err(|e| {
                self.metrics.record_error();
                ChipstakeError::Storage(format!("Failed to iterate events: {}", e))
            })?;
            records.push(self.decode_event(&value)?);
        }
        Ok(records)
    }

    pub fn last_event_seq(&self) -> ChipstakeResult<Option<u64>> {
        match self
            .events
            .last()
            .map_err(|e| ChipstakeError::Storage(format!("Failed to get last event: {}", e)))?
        {
            Some((key, _)) => {
                let seq = u64::from_be_bytes(
                    key.as_ref()
                        .try_into()
                        .map_err(|_| ChipstakeError::Storage("Invalid event key".into()))?,
                );
                Ok(Some(seq))
            }
            None => Ok(None),
        }
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}
