use crate::ledger::TransactionRecord;

/// Minimal interface to the pool of transactions captured outside the ledger.
/// Always locally available: there is no failure mode.
pub trait OfflineSource {
    /// Every transaction the source knows about, oldest first.
    fn fetch_known_transactions(&self) -> Vec<TransactionRecord>;
}
