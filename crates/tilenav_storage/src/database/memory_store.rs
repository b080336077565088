use super::KeyValueStore;

use crate::{SmallKeyHashMap, StoreError, StoreResult};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// An in-process `KeyValueStore`. Share it between several `TileStore`s with an `Arc` to simulate several processes using
/// the same backend.
///
/// The store can be switched offline, in which case every operation fails with `StoreError::Unreachable`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<SmallKeyHashMap<Vec<u8>, Vec<u8>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, online: bool) {
        self.offline.store(!online, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unreachable)
        } else {
            Ok(())
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        self.check_online()?;
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.check_online()?;
        self.entries.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn add(&self, key: &[u8], value: &[u8]) -> StoreResult<bool> {
        self.check_online()?;
        let mut entries = self.entries.lock();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_vec(), value.to_vec());
        Ok(true)
    }

    fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        self.check_online()?;
        Ok(self.entries.lock().remove(key).is_some())
    }

    fn append(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.check_online()?;
        self.entries
            .lock()
            .entry(key.to_vec())
            .or_default()
            .extend_from_slice(value);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.check_online()?;
        self.entries.lock().clear();
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<Vec<u8>>> {
        self.check_online()?;
        Ok(self.entries.lock().keys().cloned().collect())
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
