use crate::{BackendKey, KeyType, KeyValueStore, StoreError, StoreResult};

use tilenav_core::{MapInfo, TileId, TILE_ID_SIZE};

use auto_impl::auto_impl;
use bytemuck::Zeroable;
use std::time::Duration;
use tracing::{debug, warn};

/// How long to wait before retrying to acquire a tile lock that somebody else holds.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// A tile fetched from the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadedTile {
    pub data: Vec<f32>,
    pub revision: u32,
}

/// The operations a `TileStore` needs from the shared map.
#[auto_impl(&, Box, Arc)]
pub trait TileBackend: Send + Sync {
    /// Reads the map geometry.
    fn info(&self) -> StoreResult<MapInfo>;

    /// Writes the map geometry. Only used when creating or restoring a map.
    fn init(&self, info: &MapInfo) -> StoreResult<()>;

    /// Loads the tile iff the backend holds a revision newer than `known_revision`. Returns `Ok(None)` if the tile doesn't
    /// exist or isn't newer.
    fn load(&self, id: &TileId, tile_len: usize, known_revision: u32)
        -> StoreResult<Option<LoadedTile>>;

    /// Saves the tile, returning its new revision. The first save of a tile also adds it to the manifest.
    fn save(&self, id: &TileId, data: &[f32], known_revision: u32) -> StoreResult<u32>;

    /// Blocks until this caller holds the lock of tile `id`.
    fn lock(&self, id: &TileId) -> StoreResult<()>;

    fn unlock(&self, id: &TileId) -> StoreResult<()>;

    /// Every tile in the manifest.
    fn list(&self) -> StoreResult<Vec<TileId>>;

    /// Writes a tile with an exact revision, bypassing the revision protocol. Only used when restoring a map.
    fn restore(&self, id: &TileId, data: &[f32], revision: u32) -> StoreResult<()>;

    /// Deletes the whole map, including the geometry.
    fn flush_all(&self) -> StoreResult<()>;
}

/// Implements the map key space on top of any `KeyValueStore`.
///
/// Tile cells and `TileId`s are stored in native byte order, so the values are only portable between machines with the same
/// endianness.
#[derive(Clone, Debug, Default)]
pub struct KvTileBackend<S> {
    store: S,
}

impl<S> KvTileBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> KvTileBackend<S>
where
    S: KeyValueStore,
{
    fn read_revision(&self, id: &TileId) -> StoreResult<Option<u32>> {
        let bytes = match self.store.get(BackendKey::tile_revision(id).as_ref())? {
            Some(b) => b,
            None => return Ok(None),
        };
        if bytes.len() != 4 {
            return Err(StoreError::Corrupt {
                what: "tile revision",
                expected: 4,
                actual: bytes.len(),
            });
        }
        let mut rev = [0; 4];
        rev.copy_from_slice(&bytes);

        Ok(Some(u32::from_le_bytes(rev)))
    }

    /// Tiles whose lock key exists right now. A lock that stays around is most likely held by a process that died mid-commit.
    ///
    /// Keys that don't parse are skipped.
    pub fn locked_tiles(&self) -> StoreResult<Vec<TileId>> {
        let mut locked = Vec::new();
        for key in self.store.keys()? {
            match BackendKey::parse(&key) {
                Ok(Some((KeyType::TileLock, Some(id)))) => locked.push(id),
                Ok(_) => (),
                Err(e) => warn!("{}", e),
            }
        }
        locked.sort();

        Ok(locked)
    }

    fn write_tile(&self, id: &TileId, data: &[f32], revision: u32) -> StoreResult<()> {
        self.store
            .set(BackendKey::tile_data(id).as_ref(), bytemuck::cast_slice(data))?;
        self.store.set(
            BackendKey::tile_revision(id).as_ref(),
            &revision.to_le_bytes(),
        )
    }
}

impl<S> TileBackend for KvTileBackend<S>
where
    S: KeyValueStore,
{
    fn info(&self) -> StoreResult<MapInfo> {
        let bytes = self
            .store
            .get(BackendKey::info().as_ref())?
            .ok_or(StoreError::MissingInfo)?;
        let info: MapInfo = bincode::deserialize(&bytes)?;
        if !info.is_valid() {
            return Err(StoreError::InvalidInfo(info));
        }

        Ok(info)
    }

    fn init(&self, info: &MapInfo) -> StoreResult<()> {
        if !info.is_valid() {
            return Err(StoreError::InvalidInfo(*info));
        }
        self.store
            .set(BackendKey::info().as_ref(), &bincode::serialize(info)?)
    }

    fn load(
        &self,
        id: &TileId,
        tile_len: usize,
        known_revision: u32,
    ) -> StoreResult<Option<LoadedTile>> {
        let revision = match self.read_revision(id)? {
            Some(r) => r,
            None => return Ok(None),
        };
        if revision <= known_revision {
            return Ok(None);
        }

        let expected = tile_len * std::mem::size_of::<f32>();
        // A revision without data means somebody wrote half a tile.
        let bytes = self
            .store
            .get(BackendKey::tile_data(id).as_ref())?
            .unwrap_or_default();
        if bytes.len() != expected {
            return Err(StoreError::Corrupt {
                what: "tile data",
                expected,
                actual: bytes.len(),
            });
        }
        let mut data = vec![0.0f32; tile_len];
        bytemuck::cast_slice_mut::<f32, u8>(&mut data).copy_from_slice(&bytes);

        Ok(Some(LoadedTile { data, revision }))
    }

    fn save(&self, id: &TileId, data: &[f32], known_revision: u32) -> StoreResult<u32> {
        let current = self.read_revision(id)?.unwrap_or(0);
        if current != known_revision {
            warn!(
                "saving tile {} at revision {} over backend revision {}",
                id, known_revision, current
            );
        }

        let revision = current + 1;
        self.write_tile(id, data, revision)?;

        if revision == 1 {
            self.store
                .append(BackendKey::list().as_ref(), id.as_bytes())?;
        }
        debug!("saved tile {} at revision {}", id, revision);

        Ok(revision)
    }

    fn lock(&self, id: &TileId) -> StoreResult<()> {
        let key = BackendKey::tile_lock(id);
        // There is no lease on the lock. If the holder dies, this spins forever.
        while !self.store.add(key.as_ref(), b"L")? {
            std::thread::sleep(LOCK_POLL_INTERVAL);
        }

        Ok(())
    }

    fn unlock(&self, id: &TileId) -> StoreResult<()> {
        if !self.store.delete(BackendKey::tile_lock(id).as_ref())? {
            warn!("unlocked tile {} that was not locked", id);
        }

        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<TileId>> {
        let bytes = match self.store.get(BackendKey::list().as_ref())? {
            Some(b) => b,
            // No tile was ever saved.
            None => return Ok(Vec::new()),
        };
        if bytes.len() % TILE_ID_SIZE != 0 {
            return Err(StoreError::Corrupt {
                what: "tile list",
                expected: bytes.len() - bytes.len() % TILE_ID_SIZE,
                actual: bytes.len(),
            });
        }
        let mut ids = vec![TileId::zeroed(); bytes.len() / TILE_ID_SIZE];
        bytemuck::cast_slice_mut::<TileId, u8>(&mut ids).copy_from_slice(&bytes);

        Ok(ids)
    }

    fn restore(&self, id: &TileId, data: &[f32], revision: u32) -> StoreResult<()> {
        let listed = self.read_revision(id)?.is_some();
        self.write_tile(id, data, revision)?;
        if !listed {
            self.store
                .append(BackendKey::list().as_ref(), id.as_bytes())?;
        }

        Ok(())
    }

    fn flush_all(&self) -> StoreResult<()> {
        self.store.clear()
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
