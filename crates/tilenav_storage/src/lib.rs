#![allow(clippy::type_complexity, clippy::too_many_arguments)]

//! Storage for navigation maps that are shared between processes.
//!
//! A map is a set of fixed-size tiles of `f32` cells, one set per `Channel`. Tiles live in a key-value backend and every
//! process keeps its own `TileStore`: an LRU cache of the tiles it touched plus the updates it has not committed yet.
//!
//! The layers, bottom up:
//!   - `KeyValueStore`: the raw key-value engine (`SledStore` on disk, `MemoryStore` in process)
//!   - `TileBackend`: the map key space on top of an engine (info, manifest, tile data, revisions and per-tile locks)
//!   - `TileStore`: the cache, with delta accumulation and the commit-time lock/merge protocol
//!
//! `MapSnapshot` moves a whole map between a backend and a single file.

pub mod backend;
pub mod caching;
pub mod database;
pub mod error;
pub mod snapshot;
pub mod tile;
pub mod tile_store;

pub use backend::{KvTileBackend, LoadedTile, TileBackend, LOCK_POLL_INTERVAL};
pub use caching::*;
pub use database::*;
pub use error::{StoreError, StoreResult};
pub use snapshot::{MapSnapshot, TileRow};
pub use tile::{compose, CachedTile, PendingDelta};
pub use tile_store::{TileStore, DEFAULT_PAGES};

pub use sled;
pub use tilenav_core;

// Hash types to use for small keys like `TileId`.
pub type SmallKeyHashMap<K, V> = ahash::AHashMap<K, V>;
pub type SmallKeyBuildHasher = ahash::RandomState;

pub mod prelude {
    pub use super::{
        KeyValueStore, KvTileBackend, MapSnapshot, MemoryStore, SledStore, StoreError, StoreResult,
        TileBackend, TileStore,
    };
}
