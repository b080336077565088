use super::KeyValueStore;

use crate::{StoreError, StoreResult};

use sled::{IVec, Tree};
use std::path::Path;

/// A `KeyValueStore` backed by a `sled` tree. Every process (or thread) that opens a handle to the same tree shares the map.
#[derive(Clone)]
pub struct SledStore {
    tree: Tree,
}

impl SledStore {
    pub const TREE_NAME: &'static str = "map";

    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    /// Opens (or creates) the database at `path` and uses its map tree.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;

        Ok(Self::new(db.open_tree(Self::TREE_NAME)?))
    }

    /// A database that is deleted when the last handle is dropped.
    pub fn temporary() -> StoreResult<Self> {
        let db = sled::Config::default()
            .temporary(true)
            .use_compression(false)
            .mode(sled::Mode::LowSpace)
            .open()?;

        Ok(Self::new(db.open_tree(Self::TREE_NAME)?))
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn flush(&self) -> StoreResult<usize> {
        Ok(self.tree.flush()?)
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.tree.insert(key, value)?;
        Ok(())
    }

    fn add(&self, key: &[u8], value: &[u8]) -> StoreResult<bool> {
        let swapped = self
            .tree
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?;
        Ok(swapped.is_ok())
    }

    fn delete(&self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.tree.remove(key)?.is_some())
    }

    fn append(&self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.tree.fetch_and_update(key, |old| {
            let mut new = old.map(<[u8]>::to_vec).unwrap_or_default();
            new.extend_from_slice(value);
            Some(IVec::from(new))
        })?;
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.tree.clear()?;
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<Vec<u8>>> {
        self.tree
            .iter()
            .keys()
            .map(|k| k.map(|k| k.to_vec()).map_err(StoreError::from))
            .collect()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_only_creates_missing_keys() -> StoreResult<()> {
        let store = SledStore::temporary()?;

        assert!(store.add(b"lock", b"L")?);
        assert!(!store.add(b"lock", b"L")?);
        assert!(store.delete(b"lock")?);
        assert!(!store.delete(b"lock")?);
        assert!(store.add(b"lock", b"L")?);

        Ok(())
    }

    #[test]
    fn append_concatenates() -> StoreResult<()> {
        let store = SledStore::temporary()?;

        store.append(b"list", b"ab")?;
        store.append(b"list", b"cd")?;
        assert_eq!(store.get(b"list")?, Some(b"abcd".to_vec()));

        store.clear()?;
        assert_eq!(store.get(b"list")?, None);
        assert!(store.keys()?.is_empty());

        Ok(())
    }
}
