//! Raw key-value engines that a map can live in.
//!
//! The engine only has to provide five primitives: get, set, delete, append, and an atomic "create only if absent" (`add`).
//! `add` is what makes the per-tile commit lock safe across processes sharing the same engine.

mod key;
mod memory_store;
mod sled_store;

pub use key::{BackendKey, KeyType, KEY_NAMESPACE};
pub use memory_store::MemoryStore;
pub use sled_store::SledStore;

use crate::StoreResult;

use auto_impl::auto_impl;

#[auto_impl(&, Box, Arc)]
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> StoreResult<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Atomically stores `value` iff `key` does not exist yet. Returns `false` if the key already existed.
    fn add(&self, key: &[u8], value: &[u8]) -> StoreResult<bool>;

    /// Returns `false` if the key did not exist.
    fn delete(&self, key: &[u8]) -> StoreResult<bool>;

    /// Appends `value` to the value at `key`, creating it if necessary.
    fn append(&self, key: &[u8], value: &[u8]) -> StoreResult<()>;

    /// Removes every key.
    fn clear(&self) -> StoreResult<()>;

    /// All keys currently stored, in unspecified order.
    fn keys(&self) -> StoreResult<Vec<Vec<u8>>>;
}
