use std::collections::HashSet;

use crate::error::StoreError;
use crate::ledger::TransactionRecord;
use crate::persistence::{load_or_quarantine, LedgerPersistence};
use crate::sync::source::api::OfflineSource;

/// Global transaction feed.
///
/// Receives every record the builder produces (and, in offline mode, is the
/// only place they go). This is the emergency buffer the sync engine
/// reconciles into the ledger.
pub struct TransactionFeed {
    records: Vec<TransactionRecord>,
    hashes: HashSet<String>,
    persistence: Box<dyn LedgerPersistence>,
}

impl TransactionFeed {
    pub fn open(persistence: Box<dyn LedgerPersistence>) -> Self {
        let records = load_or_quarantine(persistence.as_ref(), "FEED");
        let hashes = records.iter().map(|r| r.hash.clone()).collect();

        Self {
            records,
            hashes,
            persistence,
        }
    }

    /// Records a transaction; repeated hashes are ignored.
    pub fn record(&mut self, record: TransactionRecord) -> Result<bool, StoreError> {
        if !self.hashes.insert(record.hash.clone()) {
            return Ok(false);
        }
        log::debug!("[FEED] recorded {}", record.hash);
        self.records.push(record);
        self.persistence.save(&self.records)?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl OfflineSource for TransactionFeed {
    fn fetch_known_transactions(&self) -> Vec<TransactionRecord> {
        self.records.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn feed_dedups_and_persists() {
        let mem = MemoryStore::new();
        let mut feed = TransactionFeed::open(Box::new(mem.clone()));

        assert!(feed.record(TransactionRecord::new("a", "1", "t", "h1")).unwrap());
        assert!(!feed.record(TransactionRecord::new("b", "1", "t", "h1")).unwrap());

        let reopened = TransactionFeed::open(Box::new(mem));
        assert_eq!(reopened.fetch_known_transactions().len(), 1);
    }

    #[test]
    fn damaged_feed_is_set_aside_before_recording() {
        let mem = MemoryStore::with_raw("not json");
        let mut feed = TransactionFeed::open(Box::new(mem.clone()));

        feed.record(TransactionRecord::new("a", "1", "t", "h1")).unwrap();

        assert_eq!(mem.quarantined(), vec!["not json".to_string()]);
        assert_eq!(feed.len(), 1);
    }
}
