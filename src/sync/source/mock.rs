use crate::ledger::TransactionRecord;
use crate::sync::source::api::OfflineSource;

/// Pure in-memory offline source for tests
#[derive(Debug, Default, Clone)]
pub struct MockSource {
    pub records: Vec<TransactionRecord>,
}

impl MockSource {
    pub fn new(records: Vec<TransactionRecord>) -> Self {
        Self { records }
    }

    pub fn push(&mut self, record: TransactionRecord) {
        self.records.push(record);
    }
}

impl OfflineSource for MockSource {
    fn fetch_known_transactions(&self) -> Vec<TransactionRecord> {
        self.records.clone()
    }
}
