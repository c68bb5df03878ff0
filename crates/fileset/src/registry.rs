//! FileSetRegistry - open filesets keyed by identifier.

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use fnv::FnvHashMap;
use parking_lot::Mutex;

use crate::config::FilesetConfig;
use crate::error::{FilesetError, Result};
use crate::index::FileSet;

#[derive(Debug)]
struct RegistryEntry {
    fileset: Arc<FileSet>,
    leases: usize,
    last_released: Instant,
}

/// Registry of open filesets.
///
/// Callers borrow a fileset through a `FileSetLease`; entries without
/// outstanding leases can be evicted once idle for longer than the TTL.
#[derive(Debug)]
pub struct FileSetRegistry {
    entries: Mutex<FnvHashMap<String, RegistryEntry>>,
    open_lane: Mutex<()>,
    idle_ttl: Duration,
}

impl FileSetRegistry {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(FnvHashMap::default()),
            open_lane: Mutex::new(()),
            idle_ttl,
        }
    }

    /// Adds an already opened fileset under `id`.
    pub fn register(&self, id: &str, fileset: Arc<FileSet>) -> Result<()> {
        let mut entries = self.entries.lock();
        if entries.contains_key(id) {
            return Err(FilesetError::InvalidInput(format!(
                "fileset already registered: {id}"
            )));
        }
        entries.insert(
            id.to_string(),
            RegistryEntry {
                fileset,
                leases: 0,
                last_released: Instant::now(),
            },
        );
        Ok(())
    }

    /// Leases the fileset registered under `id`, opening it from `config`
    /// first when it is not registered yet.
    pub fn open(&self, id: &str, config: &FilesetConfig) -> Result<FileSetLease<'_>> {
        let _open_lane = self.open_lane.lock();
        if let Ok(lease) = self.acquire(id) {
            return Ok(lease);
        }

        let fileset = Arc::new(FileSet::open(config)?);
        log::info!(
            "fileset registry open id={} root={}",
            id,
            fileset.root().display()
        );
        self.register(id, fileset)?;
        self.acquire(id)
    }

    /// Leases the fileset registered under `id`.
    pub fn acquire(&self, id: &str) -> Result<FileSetLease<'_>> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(id)
            .ok_or_else(|| FilesetError::NotRegistered(id.to_string()))?;
        entry.leases += 1;
        Ok(FileSetLease {
            registry: self,
            id: id.to_string(),
            fileset: entry.fileset.clone(),
        })
    }

    fn release(&self, id: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(id) {
            entry.leases = entry.leases.saturating_sub(1);
            entry.last_released = Instant::now();
        }
    }

    /// Removes unleased entries idle for longer than the TTL at `now`.
    ///
    /// Returns the evicted identifiers.
    pub fn evict_idle(&self, now: Instant) -> Vec<String> {
        let mut entries = self.entries.lock();
        let mut evicted = Vec::new();
        entries.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.last_released);
            let keep = entry.leases > 0 || idle <= self.idle_ttl;
            if !keep {
                evicted.push(id.clone());
            }
            keep
        });
        if !evicted.is_empty() {
            log::info!("fileset registry evicted ids={}", evicted.join(","));
        }
        evicted
    }

    /// Drops the entry for `id`. Outstanding leases keep their fileset
    /// alive until they are dropped.
    pub fn remove(&self, id: &str) -> Result<()> {
        self.entries
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| FilesetError::NotRegistered(id.to_string()))
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Outstanding leases for `id`.
    pub fn active_leases(&self, id: &str) -> Result<usize> {
        self.entries
            .lock()
            .get(id)
            .map(|entry| entry.leases)
            .ok_or_else(|| FilesetError::NotRegistered(id.to_string()))
    }
}

impl Default for FileSetRegistry {
    fn default() -> Self {
        Self::new(FilesetConfig::default().idle_ttl())
    }
}

/// Scoped access to a registered fileset. Dropping the lease releases it.
#[derive(Debug)]
pub struct FileSetLease<'a> {
    registry: &'a FileSetRegistry,
    id: String,
    fileset: Arc<FileSet>,
}

impl FileSetLease<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Deref for FileSetLease<'_> {
    type Target = FileSet;

    fn deref(&self) -> &Self::Target {
        &self.fileset
    }
}

impl Drop for FileSetLease<'_> {
    fn drop(&mut self) {
        self.registry.release(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unknown_id_is_not_registered() {
        let registry = FileSetRegistry::new(Duration::from_secs(60));
        assert!(matches!(
            registry.acquire("missing"),
            Err(FilesetError::NotRegistered(_))
        ));
        assert!(matches!(
            registry.remove("missing"),
            Err(FilesetError::NotRegistered(_))
        ));
    }

    #[test]
    fn open_reuses_existing_entry() {
        let temp = TempDir::new().unwrap();
        let registry = FileSetRegistry::new(Duration::from_secs(60));
        let config = FilesetConfig::new(temp.path());

        let first = registry.open("main", &config).unwrap();
        let second = registry.open("main", &config).unwrap();
        assert!(std::ptr::eq(&*first, &*second));
        assert_eq!(registry.active_leases("main").unwrap(), 2);

        drop(first);
        drop(second);
        assert_eq!(registry.active_leases("main").unwrap(), 0);
        assert_eq!(registry.ids(), vec!["main".to_string()]);
    }

    #[test]
    fn duplicate_register_fails() {
        let temp = TempDir::new().unwrap();
        let registry = FileSetRegistry::new(Duration::from_secs(60));
        let fileset = Arc::new(FileSet::open(&FilesetConfig::new(temp.path())).unwrap());

        registry.register("main", fileset.clone()).unwrap();
        assert!(registry.register("main", fileset).is_err());
    }
}
