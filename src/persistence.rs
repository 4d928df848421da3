//! Persisted contributor order and reconciliation against it.
//!
//! Only the ranked identifier list is stored, one JSON array per
//! repository key. A failed load is treated as a first run; a store is only
//! issued by the pipeline after the artifact has been written.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::error::PersistenceError;
use crate::ranker::RankedList;
use crate::types::RepoIdentity;

/// Load/store of an ordered identifier list by key.
pub trait OrderStore: Send + Sync {
    /// Read the saved order, `Ok(None)` if nothing was ever saved.
    fn load(&self, key: &str) -> Result<Option<Vec<String>>, PersistenceError>;

    /// Replace the saved order.
    fn store(&self, key: &str, order: &[String]) -> Result<(), PersistenceError>;
}

/// Order store writing `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileOrderStore {
    dir: PathBuf,
}

impl FileOrderStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn unavailable(key: &str, message: impl ToString) -> PersistenceError {
    PersistenceError::Unavailable {
        key: key.to_string(),
        message: message.to_string(),
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

impl OrderStore for FileOrderStore {
    fn load(&self, key: &str) -> Result<Option<Vec<String>>, PersistenceError> {
        let path = self.path_for(key);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(unavailable(key, format!("{}: {e}", path.display()))),
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| unavailable(key, format!("{}: {e}", path.display())))
    }

    fn store(&self, key: &str, order: &[String]) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| unavailable(key, e))?;

        let path = self.path_for(key);
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        let body = serde_json::to_string_pretty(order).map_err(|e| unavailable(key, e))?;

        write_synced(&tmp, body.as_bytes()).map_err(|e| unavailable(key, e))?;
        fs::rename(&tmp, &path).map_err(|e| unavailable(key, e))?;
        debug!(path = %path.display(), entries = order.len(), "stored contributor order");
        Ok(())
    }
}

/// Order store kept in memory, for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryOrderStore {
    orders: Arc<Mutex<HashMap<String, Vec<String>>>>,
    fail_loads: bool,
    fail_stores: bool,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `load` fail.
    #[must_use]
    pub fn failing_loads(mut self) -> Self {
        self.fail_loads = true;
        self
    }

    /// Make every `store` fail.
    #[must_use]
    pub fn failing_stores(mut self) -> Self {
        self.fail_stores = true;
        self
    }

    /// Seed a saved order.
    pub fn insert(&self, key: &str, order: Vec<String>) {
        self.orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), order);
    }

    /// Current saved order, bypassing failure injection.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Vec<String>> {
        self.orders
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl OrderStore for MemoryOrderStore {
    fn load(&self, key: &str) -> Result<Option<Vec<String>>, PersistenceError> {
        if self.fail_loads {
            return Err(unavailable(key, "load disabled"));
        }
        Ok(self.get(key))
    }

    fn store(&self, key: &str, order: &[String]) -> Result<(), PersistenceError> {
        if self.fail_stores {
            return Err(unavailable(key, "store disabled"));
        }
        self.insert(key, order.to_vec());
        Ok(())
    }
}

/// A previously saved ranking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedOrder {
    identifiers: Vec<String>,
}

impl PersistedOrder {
    #[must_use]
    pub fn new(identifiers: Vec<String>) -> Self {
        Self { identifiers }
    }

    #[must_use]
    pub fn identifiers(&self) -> &[String] {
        &self.identifiers
    }

    #[must_use]
    pub fn position(&self, identifier: &str) -> Option<usize> {
        self.identifiers.iter().position(|id| id == identifier)
    }
}

/// A contributor whose position changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub identifier: String,
    pub from: usize,
    pub to: usize,
}

/// Difference between the persisted order and a fresh ranking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub first_run: bool,
    /// In the new ranking but not the saved one, in ranked order
    pub added: Vec<String>,
    /// In the saved ranking but not the new one, in saved order
    pub removed: Vec<String>,
    /// In both, at a different position
    pub moved: Vec<Move>,
}

impl Reconciliation {
    #[must_use]
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    /// Whether the new ranking is identical to the saved one.
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        !self.first_run && self.added.is_empty() && self.removed.is_empty() && self.moved.is_empty()
    }
}

/// Loads, diffs and commits the persisted order for a repository.
pub struct Reconciler {
    store: Arc<dyn OrderStore>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    /// Read the saved order.
    ///
    /// A store failure is logged and reported as absent, so a damaged state
    /// file degrades to a first run instead of failing.
    pub fn load(&self, repo: &RepoIdentity) -> Option<PersistedOrder> {
        match self.store.load(&repo.key()) {
            Ok(order) => order.map(PersistedOrder::new),
            Err(e) => {
                warn!(repo = %repo, error = %e, "persisted order unavailable, treating as first run");
                None
            }
        }
    }

    /// Compare `ranked` against `previous` and annotate each entry with its
    /// previous position.
    pub fn reconcile(&self, previous: Option<&PersistedOrder>, ranked: &mut RankedList) -> Reconciliation {
        let Some(previous) = previous else {
            return Reconciliation {
                first_run: true,
                added: ranked.identifiers(),
                ..Default::default()
            };
        };

        let old_positions: HashMap<&str, usize> = previous
            .identifiers()
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let mut reconciliation = Reconciliation::default();
        for (to, entry) in ranked.iter_mut().enumerate() {
            entry.previous_position = old_positions.get(entry.identifier.as_str()).copied();
            match entry.previous_position {
                None => reconciliation.added.push(entry.identifier.clone()),
                Some(from) if from != to => reconciliation.moved.push(Move {
                    identifier: entry.identifier.clone(),
                    from,
                    to,
                }),
                Some(_) => {}
            }
        }

        let current: std::collections::HashSet<&str> =
            ranked.iter().map(|e| e.identifier.as_str()).collect();
        reconciliation.removed = previous
            .identifiers()
            .iter()
            .filter(|id| !current.contains(id.as_str()))
            .cloned()
            .collect();

        reconciliation
    }

    /// Replace the saved order with `ranked`.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Unavailable` if the store rejects the write.
    pub fn commit(&self, repo: &RepoIdentity, ranked: &RankedList) -> Result<(), PersistenceError> {
        self.store.store(&repo.key(), &ranked.identifiers())?;
        info!(repo = %repo, contributors = ranked.len(), "persisted contributor order");
        Ok(())
    }
}
