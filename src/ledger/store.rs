use std::collections::HashSet;

use crate::error::StoreError;
use crate::ledger::record::{filter_unseen, TransactionRecord};
use crate::persistence::{load_or_quarantine, LedgerPersistence};

/// Result of a ledger mutation.
///
/// The in-memory ledger is updated even when the snapshot write fails;
/// the failure comes back as `warning` for the caller to surface.
#[derive(Debug, Default)]
pub struct Commit {
    pub added: Vec<TransactionRecord>,
    pub warning: Option<StoreError>,
}

impl Commit {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
    }
}

/// Append-only, hash-deduplicated transaction history.
///
/// Invariants:
/// * no two records share a hash
/// * records are never edited or removed
/// * every mutation re-persists the full contents
pub struct LedgerStore {
    records: Vec<TransactionRecord>,
    hashes: HashSet<String>,
    persistence: Box<dyn LedgerPersistence>,
}

impl LedgerStore {
    /// Loads the last snapshot. An unreadable snapshot is quarantined and
    /// yields an empty ledger.
    pub fn open(persistence: Box<dyn LedgerPersistence>) -> Self {
        let loaded = load_or_quarantine(persistence.as_ref(), "LEDGER");

        let mut store = Self {
            records: Vec::with_capacity(loaded.len()),
            hashes: HashSet::new(),
            persistence,
        };
        // A hand-edited snapshot may carry duplicates; keep the first.
        for r in loaded {
            store.insert(r);
        }
        store
    }

    /// Adds one record unless its hash is already present.
    pub fn append(&mut self, record: TransactionRecord) -> Commit {
        if !self.insert(record.clone()) {
            log::debug!("[LEDGER] append ignored, hash {} already stored", record.hash);
            return Commit::default();
        }

        log::info!("[LEDGER] appended {}", record.hash);
        let warning = self.persist();
        Commit {
            added: vec![record],
            warning,
        }
    }

    /// Adds every record whose hash is new, in order, with a single persist.
    ///
    /// Equivalent to folding `append` over `records`. The fresh set is computed
    /// before the ledger is touched, so observers never see a partial batch.
    pub fn merge_batch(&mut self, records: &[TransactionRecord]) -> Commit {
        let mut batch_seen = HashSet::new();
        let fresh: Vec<TransactionRecord> = filter_unseen(&self.records, records)
            .into_iter()
            .filter(|r| batch_seen.insert(r.hash.clone()))
            .collect();

        if fresh.is_empty() {
            log::debug!("[LEDGER] merge of {} records added nothing", records.len());
            return Commit::default();
        }

        for r in &fresh {
            self.insert(r.clone());
        }

        log::info!(
            "[LEDGER] merged {} of {} records (total {})",
            fresh.len(),
            records.len(),
            self.records.len()
        );
        let warning = self.persist();
        Commit {
            added: fresh,
            warning,
        }
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[TransactionRecord] {
        &self.records
    }

    pub fn search(&self, term: &str) -> Vec<TransactionRecord> {
        self.records
            .iter()
            .filter(|r| r.recipient_matches(term))
            .cloned()
            .collect()
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.hashes.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&mut self, record: TransactionRecord) -> bool {
        if !self.hashes.insert(record.hash.clone()) {
            return false;
        }
        self.records.push(record);
        true
    }

    fn persist(&self) -> Option<StoreError> {
        match self.persistence.save(&self.records) {
            Ok(()) => None,
            Err(e) => {
                log::warn!("[LEDGER] failed to persist snapshot: {}", e);
                Some(e)
            }
        }
    }
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore")
            .field("records", &self.records.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::persistence::{JsonFileStore, MemoryStore};

    fn rec(recipient: &str, hash: &str) -> TransactionRecord {
        TransactionRecord::new(recipient, "1", "t", hash)
    }

    fn store() -> (LedgerStore, MemoryStore) {
        let mem = MemoryStore::new();
        (LedgerStore::open(Box::new(mem.clone())), mem)
    }

    #[test]
    fn append_to_empty_store_lists_one_record() {
        let (mut ledger, _) = store();
        let r = TransactionRecord::new("0xAB", "2", "t1", "h1");

        ledger.append(r.clone());

        assert_eq!(ledger.all(), &[r]);
    }

    #[test]
    fn append_is_idempotent_per_hash() {
        let (mut ledger, mem) = store();

        let first = ledger.append(rec("a", "h1"));
        let second = ledger.append(rec("b", "h1"));
        ledger.append(rec("c", "h2"));
        ledger.append(rec("d", "h2"));

        assert_eq!(first.added.len(), 1);
        assert!(second.is_noop());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.all()[0].recipient, "a");
        // no-op appends do not touch the snapshot
        assert_eq!(mem.save_count(), 2);
    }

    #[test]
    fn merge_batch_matches_folded_append() {
        let seed = vec![rec("a", "h1")];
        let batch = vec![
            rec("x", "h2"),
            rec("y", "h1"),
            rec("z", "h3"),
            rec("w", "h2"),
        ];

        let (mut bulk, _) = store();
        let (mut single, _) = store();
        for r in &seed {
            bulk.append(r.clone());
            single.append(r.clone());
        }

        bulk.merge_batch(&batch);
        for r in &batch {
            single.append(r.clone());
        }

        assert_eq!(bulk.all(), single.all());
        let hashes: Vec<_> = bulk.all().iter().map(|r| r.hash.as_str()).collect();
        assert_eq!(hashes, vec!["h1", "h2", "h3"]);
    }

    #[test]
    fn merge_batch_persists_once() {
        let (mut ledger, mem) = store();

        let commit = ledger.merge_batch(&[rec("a", "h1"), rec("b", "h2")]);

        assert_eq!(commit.added.len(), 2);
        assert_eq!(mem.save_count(), 1);
    }

    #[test]
    fn search_is_case_insensitive_and_pure() {
        let (mut ledger, _) = store();
        ledger.append(rec("0xABcd", "h1"));
        ledger.append(rec("0x1234", "h2"));
        ledger.append(rec("0xffAB", "h3"));

        let found = ledger.search("ab");

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].hash, "h1");
        assert_eq!(found[1].hash, "h3");
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn reopen_restores_last_snapshot() {
        let (mut ledger, mem) = store();
        ledger.append(rec("a", "h1"));
        ledger.merge_batch(&[rec("b", "h2")]);
        let before = ledger.all().to_vec();

        let reopened = LedgerStore::open(Box::new(mem));

        assert_eq!(reopened.all(), before.as_slice());
    }

    #[test]
    fn corrupt_snapshot_starts_empty() {
        let mem = MemoryStore::with_raw("[{\"recipient\": 12");

        let ledger = LedgerStore::open(Box::new(mem.clone()));

        assert!(ledger.is_empty());
        assert_eq!(mem.quarantined(), vec!["[{\"recipient\": 12".to_string()]);
    }

    #[test]
    fn corrupt_file_is_kept_after_first_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(crate::persistence::LEDGER_FILE);
        let damaged = r#"[{"recipient":"0xAB","amount":"1","date":"t","hash":"h1"},]"#;
        std::fs::write(&path, damaged).unwrap();

        let mut ledger = LedgerStore::open(Box::new(JsonFileStore::new(&path)));
        ledger.append(rec("b", "h2"));

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        let aside = names
            .iter()
            .find(|n| n.starts_with("ledger.json.corrupt-"))
            .expect("damaged snapshot moved aside");
        assert_eq!(std::fs::read_to_string(dir.path().join(aside)).unwrap(), damaged);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn write_failure_is_a_warning_not_a_loss() {
        let (mut ledger, mem) = store();
        mem.set_fail_writes(true);

        let commit = ledger.append(rec("a", "h1"));

        assert!(commit.warning.is_some());
        assert!(ledger.contains("h1"));
    }

    #[test]
    fn snapshot_growth_is_monotonic() {
        let (mut ledger, mem) = store();
        let mut previous: Vec<String> = Vec::new();

        for batch in [
            vec![rec("a", "h1")],
            vec![rec("b", "h2"), rec("a", "h1")],
            vec![rec("c", "h3")],
        ] {
            ledger.merge_batch(&batch);
            let now: Vec<String> = mem.load().unwrap().into_iter().map(|r| r.hash).collect();
            assert!(previous.iter().all(|h| now.contains(h)));
            previous = now;
        }
        assert_eq!(previous.len(), 3);
    }

    // --- Randomized sequences ---

    fn random_batch(rng: &mut StdRng, pool: u32) -> Vec<TransactionRecord> {
        let len = rng.gen_range(0..12);
        (0..len)
            .map(|i| rec(&format!("r{}", i), &format!("h{}", rng.gen_range(0..pool))))
            .collect()
    }

    #[test]
    fn random_appends_keep_one_record_per_hash() {
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..50 {
            let (mut ledger, _) = store();
            let mut distinct = HashSet::new();

            for r in random_batch(&mut rng, 8).into_iter().chain(random_batch(&mut rng, 8)) {
                distinct.insert(r.hash.clone());
                ledger.append(r);
            }

            assert_eq!(ledger.len(), distinct.len());
            let stored: HashSet<&str> = ledger.all().iter().map(|r| r.hash.as_str()).collect();
            assert_eq!(stored.len(), ledger.len());
        }
    }

    #[test]
    fn random_merges_match_folded_appends() {
        let mut rng = StdRng::seed_from_u64(23);

        for _ in 0..50 {
            let (mut bulk, _) = store();
            let (mut single, _) = store();

            for _ in 0..rng.gen_range(1..5) {
                let batch = random_batch(&mut rng, 10);
                bulk.merge_batch(&batch);
                for r in &batch {
                    single.append(r.clone());
                }
                assert_eq!(bulk.all(), single.all());
            }
        }
    }
}
