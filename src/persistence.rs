use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreError;
use crate::ledger::TransactionRecord;

pub const LEDGER_FILE: &str = "ledger.json";
pub const FEED_FILE: &str = "transactions.json";
pub const SETTINGS_FILE: &str = "settings.json";

/// Snapshot storage for a sequence of records.
///
/// `load` returns `Ok(vec![])` when nothing was ever saved.
pub trait LedgerPersistence {
    fn load(&self) -> Result<Vec<TransactionRecord>, StoreError>;
    fn save(&self, records: &[TransactionRecord]) -> Result<(), StoreError>;

    /// Moves an unreadable snapshot out of the way so the next `save`
    /// cannot overwrite it. Returns where it went, if anywhere.
    fn quarantine(&self) -> Result<Option<String>, StoreError> {
        Ok(None)
    }
}

/// Loads a snapshot for a store that is about to start writing to it.
///
/// An unreadable snapshot yields an empty list and is quarantined first,
/// so persisted history is never replaced by a shorter one.
pub fn load_or_quarantine(persistence: &dyn LedgerPersistence, tag: &str) -> Vec<TransactionRecord> {
    let err = match persistence.load() {
        Ok(records) => {
            log::info!("[{}] Loaded {} records from persistence.", tag, records.len());
            return records;
        }
        Err(e) => e,
    };

    log::warn!("[{}] Snapshot unreadable, starting empty: {}", tag, err);
    match persistence.quarantine() {
        Ok(Some(moved)) => log::warn!("[{}] unreadable snapshot kept at {}", tag, moved),
        Ok(None) => {}
        Err(e) => log::error!("[{}] could not move unreadable snapshot aside: {}", tag, e),
    }
    Vec::new()
}

/// JSON snapshot on disk.
///
/// Writes go to a sibling temp file which is then renamed over the snapshot,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerPersistence for JsonFileStore {
    fn load(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        read_json(&self.path).map(Option::unwrap_or_default)
    }

    fn save(&self, records: &[TransactionRecord]) -> Result<(), StoreError> {
        write_json(&self.path, &records)
    }

    /// Renames the snapshot to `<name>.corrupt-<unix-ts>`.
    fn quarantine(&self) -> Result<Option<String>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut target = self.path.as_os_str().to_owned();
        target.push(format!(".corrupt-{}", chrono::Utc::now().timestamp()));
        let target = PathBuf::from(target);

        fs::rename(&self.path, &target)?;
        Ok(Some(target.display().to_string()))
    }
}

/// In-memory snapshot. Clones share the same backing vector.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    snapshot: Option<String>,
    quarantined: Vec<String>,
    saves: usize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with raw snapshot text (may be garbage).
    pub fn with_raw(raw: impl Into<String>) -> Self {
        let store = Self::default();
        if let Ok(mut g) = store.inner.lock() {
            g.snapshot = Some(raw.into());
        }
        store
    }

    pub fn save_count(&self) -> usize {
        self.inner.lock().map(|g| g.saves).unwrap_or(0)
    }

    /// Raw snapshots moved aside by `quarantine`, oldest first.
    pub fn quarantined(&self) -> Vec<String> {
        self.inner.lock().map(|g| g.quarantined.clone()).unwrap_or_default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        if let Ok(mut g) = self.inner.lock() {
            g.fail_writes = fail;
        }
    }
}

impl LedgerPersistence for MemoryStore {
    fn load(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let raw = self
            .inner
            .lock()
            .ok()
            .and_then(|g| g.snapshot.clone());

        match raw {
            Some(text) => Ok(serde_json::from_str(&text)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, records: &[TransactionRecord]) -> Result<(), StoreError> {
        let text = serde_json::to_string(records)?;
        let mut g = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("memory store poisoned"))?;

        if g.fail_writes {
            return Err(std::io::Error::other("simulated write failure").into());
        }
        g.snapshot = Some(text);
        g.saves += 1;
        Ok(())
    }

    fn quarantine(&self) -> Result<Option<String>, StoreError> {
        let mut g = self
            .inner
            .lock()
            .map_err(|_| std::io::Error::other("memory store poisoned"))?;

        let Some(raw) = g.snapshot.take() else {
            return Ok(None);
        };
        g.quarantined.push(raw);
        Ok(Some(format!("memory#{}", g.quarantined.len())))
    }
}

/// Reads a JSON document, `Ok(None)` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    {
        let mut f = fs::File::create(&tmp)?;
        serde_json::to_writer_pretty(&mut f, value)?;
        f.write_all(b"\n")?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;

    log::trace!("[STORE] wrote {}", path.display());
    Ok(())
}
