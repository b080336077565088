//! The per-process cache of a shared map.
//!
//! Every cell access goes through a bounded LRU cache of tiles. Writes are applied to the cached tile immediately and also
//! folded into a `PendingDelta`. A tile with a delta is dirty; it is written back by `TileStore::commit` or when it falls
//! off the end of the LRU list.
//!
//! Writing back is a small merge protocol: lock the tile in the backend, reload it if somebody committed a newer revision,
//! replay our delta on top of the newer base, save (which bumps the revision), unlock. Because of the replay, concurrent
//! updates like `update(1.0, x)` from different processes accumulate rather than overwrite each other.
//!
//! The store degrades instead of failing: when the backend can't be reached or returns garbage, reads fall back to the
//! channel defaults (or whatever is cached) and the failure is logged.

use crate::{
    tile::{CachedTile, PendingDelta},
    SmallKeyLruCache, StoreError, StoreResult, TileBackend,
};

use tilenav_core::{GridPoint3, MapInfo, TileId};

use std::collections::BTreeSet;
use std::fmt;
use tracing::{debug, error, warn};

/// The number of tiles a store keeps resident unless configured otherwise.
pub const DEFAULT_PAGES: usize = 500;

pub struct TileStore<B> {
    backend: B,
    info: MapInfo,
    tile_len: usize,
    pages: usize,
    tiles: SmallKeyLruCache<TileId, CachedTile>,
    known: BTreeSet<TileId>,
}

impl<B> TileStore<B>
where
    B: TileBackend,
{
    /// Opens the map held by `backend`, keeping at most `pages` tiles resident.
    ///
    /// This is the only fallible operation: a store can't do anything without valid map geometry.
    pub fn open(backend: B, pages: usize) -> StoreResult<Self> {
        let info = backend.info()?;
        debug!("opened map {:?} with {} pages", info, pages);

        Ok(Self {
            backend,
            tile_len: info.tile_len(),
            info,
            pages: pages.max(1),
            tiles: SmallKeyLruCache::default(),
            known: BTreeSet::new(),
        })
    }

    pub fn info(&self) -> &MapInfo {
        &self.info
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Number of tiles currently in the cache.
    pub fn resident_len(&self) -> usize {
        self.tiles.len()
    }

    /// Whether the tile has updates that were not committed yet.
    pub fn is_dirty(&self, id: &TileId) -> bool {
        self.tiles.get(id).map_or(false, CachedTile::is_dirty)
    }

    /// Reads the cell containing the real-world point `(x, y, z)`.
    pub fn get(&mut self, channel: impl Into<u32>, x: f64, y: f64, z: f64) -> f32 {
        let cell = self.info.cell_containing(x, y, z);

        self.get_cell(channel, cell)
    }

    pub fn get_cell(&mut self, channel: impl Into<u32>, cell: GridPoint3) -> f32 {
        let (id, index) = self.info.locate(channel.into(), cell);

        self.get_indexed(id, index)
    }

    pub fn get_indexed(&mut self, id: TileId, index: usize) -> f32 {
        let default = id.default_value();

        self.access(id)
            .data
            .as_ref()
            .map_or(default, |data| data[index])
    }

    /// Equivalent to `update(channel, x, y, z, 0.0, value)`.
    pub fn set(&mut self, channel: impl Into<u32>, x: f64, y: f64, z: f64, value: f32) {
        self.update(channel, x, y, z, 0.0, value)
    }

    pub fn set_cell(&mut self, channel: impl Into<u32>, cell: GridPoint3, value: f32) {
        self.update_cell(channel, cell, 0.0, value)
    }

    pub fn set_indexed(&mut self, id: TileId, index: usize, value: f32) {
        self.update_indexed(id, index, 0.0, value)
    }

    /// Replaces the value `v` of the cell containing `(x, y, z)` with `v * multiply + add`.
    ///
    /// A zero `multiply` applied to an infinite value yields `add` instead of NaN.
    pub fn update(
        &mut self,
        channel: impl Into<u32>,
        x: f64,
        y: f64,
        z: f64,
        multiply: f32,
        add: f32,
    ) {
        let cell = self.info.cell_containing(x, y, z);

        self.update_cell(channel, cell, multiply, add)
    }

    pub fn update_cell(
        &mut self,
        channel: impl Into<u32>,
        cell: GridPoint3,
        multiply: f32,
        add: f32,
    ) {
        let (id, index) = self.info.locate(channel.into(), cell);

        self.update_indexed(id, index, multiply, add)
    }

    pub fn update_indexed(&mut self, id: TileId, index: usize, multiply: f32, add: f32) {
        let (len, default) = (self.tile_len, id.default_value());

        self.access(id).update(len, default, index, multiply, add)
    }

    /// The whole tile and the last revision seen in the backend, or `None` if the tile has no data anywhere.
    pub fn get_tile(&mut self, id: TileId) -> Option<(&[f32], u32)> {
        let tile = self.access(id);
        let revision = tile.revision;

        tile.data.as_deref().map(|data| (data, revision))
    }

    /// Overwrites every cell of the tile. On commit this wins over whatever is in the backend.
    pub fn set_tile(&mut self, id: TileId, data: &[f32]) {
        if data.len() != self.tile_len {
            warn!(
                "ignoring set_tile({}) with {} cells, expected {}",
                id,
                data.len(),
                self.tile_len
            );
            return;
        }

        let tile = self.access(id);
        tile.data = Some(data.to_vec());
        tile.delta = Some(PendingDelta::overwrite(data));
    }

    /// `update` for every cell of the tile at once.
    pub fn update_tile(&mut self, id: TileId, multiply: &[f32], add: &[f32]) {
        let len = self.tile_len;
        if multiply.len() != len || add.len() != len {
            warn!(
                "ignoring update_tile({}) with {}/{} cells, expected {}",
                id,
                multiply.len(),
                add.len(),
                len
            );
            return;
        }

        let default = id.default_value();
        let tile = self.access(id);
        for (index, (m, a)) in multiply.iter().zip(add.iter()).enumerate() {
            tile.update(len, default, index, *m, *a);
        }
    }

    /// Writes every dirty tile back to the backend, most recently used first.
    ///
    /// A tile that fails to save keeps its delta and is retried by the next commit. Failures are logged and never stop the
    /// remaining tiles from being committed.
    pub fn commit(&mut self) {
        let Self {
            backend,
            tile_len,
            tiles,
            ..
        } = self;

        let dirty: Vec<TileId> = tiles
            .keys()
            .filter(|id| tiles.get(id).map_or(false, CachedTile::is_dirty))
            .copied()
            .collect();

        let mut num_saved = 0;
        for id in dirty.iter() {
            if let Some(tile) = tiles.get_mut(id) {
                match flush_tile(&*backend, *tile_len, id, tile) {
                    Ok(()) => num_saved += 1,
                    Err(e) => log_failure("commit", id, &e),
                }
            }
        }
        debug!("committed {} of {} dirty tiles", num_saved, dirty.len());
    }

    /// Marks every resident tile stale, so the next access to it checks the backend for a newer revision.
    pub fn refresh(&mut self) {
        for tile in self.tiles.values_mut() {
            tile.stale = true;
        }
    }

    /// The set of tiles that have data. Without `refresh`, this is the set computed by the last refreshing call.
    pub fn list(&mut self, refresh: bool) -> &BTreeSet<TileId> {
        if refresh {
            let mut known: BTreeSet<TileId> = match self.backend.list() {
                Ok(ids) => ids.into_iter().collect(),
                Err(e) => {
                    log_failure("list", "manifest", &e);
                    BTreeSet::new()
                }
            };
            known.extend(
                self.tiles
                    .iter()
                    .filter(|(_, tile)| tile.data.is_some())
                    .map(|(id, _)| *id),
            );
            self.known = known;
        }

        &self.known
    }

    fn access(&mut self, id: TileId) -> &mut CachedTile {
        let Self {
            backend,
            tile_len,
            pages,
            tiles,
            ..
        } = self;

        if tiles.touch(&id) {
            if let Some(tile) = tiles.get_mut(&id) {
                if tile.stale {
                    reload(&*backend, *tile_len, &id, tile);
                }
            }
        } else {
            while tiles.len() >= *pages {
                let (victim_id, mut victim) = match tiles.remove_lru() {
                    Some(lru) => lru,
                    None => break,
                };
                if let Err(e) = flush_tile(&*backend, *tile_len, &victim_id, &mut victim) {
                    log_failure("evict", &victim_id, &e);
                    warn!("dropped uncommitted updates of evicted tile {}", victim_id);
                }
            }

            let mut tile = CachedTile::default();
            reload(&*backend, *tile_len, &id, &mut tile);
            tiles.insert(id, tile);
        }

        tiles.get_mut_or_insert_with(id, CachedTile::default)
    }
}

/// Pulls a newer revision of the tile if there is one. Failing to reach the backend leaves the tile as it was.
fn reload<B: TileBackend>(backend: &B, tile_len: usize, id: &TileId, tile: &mut CachedTile) {
    match backend.load(id, tile_len, tile.revision) {
        Ok(Some(loaded)) => tile.rebase(loaded.data, loaded.revision),
        Ok(None) => (),
        Err(e) => log_failure("load", id, &e),
    }
    tile.stale = false;
}

/// Saves a dirty tile under the tile lock, merging with any newer revision first. Clean tiles are never saved.
fn flush_tile<B: TileBackend>(
    backend: &B,
    tile_len: usize,
    id: &TileId,
    tile: &mut CachedTile,
) -> StoreResult<()> {
    if !tile.is_dirty() {
        return Ok(());
    }

    backend.lock(id)?;
    let result = merge_and_save(backend, tile_len, id, tile);
    if let Err(e) = backend.unlock(id) {
        log_failure("unlock", id, &e);
    }

    result
}

fn merge_and_save<B: TileBackend>(
    backend: &B,
    tile_len: usize,
    id: &TileId,
    tile: &mut CachedTile,
) -> StoreResult<()> {
    match backend.load(id, tile_len, tile.revision) {
        Ok(Some(loaded)) => tile.rebase(loaded.data, loaded.revision),
        Ok(None) => (),
        // Our copy replaces the unreadable one.
        Err(e) if e.is_corruption() => log_failure("load", id, &e),
        Err(e) => return Err(e),
    }

    if let Some(data) = tile.data.as_ref() {
        tile.revision = backend.save(id, data, tile.revision)?;
    }
    tile.delta = None;
    tile.stale = false;

    Ok(())
}

fn log_failure(operation: &str, subject: impl fmt::Display, e: &StoreError) {
    if e.is_corruption() {
        error!("{} {}: {}", operation, subject, e);
    } else if let StoreError::Unreachable = e {
        debug!("{} {}: {}", operation, subject, e);
    } else {
        warn!("{} {}: {}", operation, subject, e);
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

    use crate::{tile::compose, KvTileBackend, MemoryStore};

    use tilenav_core::Channel;

    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::sync::Arc;

    type SharedBackend = Arc<KvTileBackend<MemoryStore>>;

    const INFO: MapInfo = MapInfo::new(1.0, 4, 4, 1);

    fn shared_backend() -> SharedBackend {
        let backend = Arc::new(KvTileBackend::new(MemoryStore::new()));
        backend.init(&INFO).unwrap();
        backend
    }

    fn store(backend: &SharedBackend, pages: usize) -> TileStore<SharedBackend> {
        TileStore::open(Arc::clone(backend), pages).unwrap()
    }

    #[test]
    fn open_requires_map_info() {
        let backend = KvTileBackend::new(MemoryStore::new());
        assert!(matches!(
            TileStore::open(&backend, 10),
            Err(StoreError::MissingInfo)
        ));
    }

    #[test]
    fn unwritten_cells_read_channel_defaults() {
        let backend = shared_backend();
        let mut store = store(&backend, 10);

        assert_eq!(store.get(Channel::Probability, 0.5, 0.5, 0.0), 0.5);
        assert_eq!(store.get(Channel::CostSpace, -10.0, 3.0, 0.0), 0.5);
        assert_eq!(store.get(Channel::ElevationMean, 2.0, 2.0, 0.0), 0.0);
        assert_eq!(store.get(Channel::Blue, 2.0, 2.0, 0.0), 0.0);
        assert_eq!(store.get_tile(TileId::new(0, 0, 0, 0)), None);
    }

    fn same_value(a: f32, b: f32) -> bool {
        a == b || (a.is_nan() && b.is_nan())
    }

    #[test]
    fn reads_reflect_every_update() {
        let backend = shared_backend();
        let mut store = store(&backend, 10);
        let mut rng = StdRng::seed_from_u64(7);
        let multipliers = [0.0, 0.5, 1.0, 2.0];
        let cells: Vec<GridPoint3> = (0..8).map(|i| GridPoint3::new(i - 3, 5, 0)).collect();

        let mut expected = vec![Channel::Probability.default_value(); cells.len()];
        let mut infinities_cleared = 0;
        for _ in 0..100 {
            for (cell, expected) in cells.iter().zip(expected.iter_mut()) {
                let m = multipliers[rng.gen_range(0..multipliers.len())];
                let a = match rng.gen_range(0..20) {
                    0 => f32::INFINITY,
                    1 => f32::NEG_INFINITY,
                    _ => rng.gen_range(-1.0..1.0),
                };
                if m == 0.0 && expected.is_infinite() {
                    infinities_cleared += 1;
                }

                *expected = compose(*expected, m, a);
                store.update_cell(Channel::Probability, *cell, m, a);
                let actual = store.get_cell(Channel::Probability, *cell);
                assert!(same_value(actual, *expected), "{} != {}", actual, expected);
            }
        }
        assert!(infinities_cleared > 0);

        store.commit();
        let mut other = self::store(&backend, 10);
        for (cell, expected) in cells.iter().zip(expected.iter()) {
            let committed = other.get_cell(Channel::Probability, *cell);
            assert!(same_value(committed, *expected), "{} != {}", committed, expected);
        }
    }

    #[test]
    fn commit_bumps_revision_once_per_dirty_tile() {
        let backend = shared_backend();
        let mut store = store(&backend, 10);
        let id = TileId::new(0, 0, 0, 0);

        store.set_indexed(id, 3, 0.25);
        assert!(store.is_dirty(&id));
        store.commit();
        assert!(!store.is_dirty(&id));
        assert_eq!(store.get_tile(id).map(|(_, rev)| rev), Some(1));

        store.set_indexed(id, 3, 0.75);
        store.commit();
        assert_eq!(store.get_tile(id).map(|(_, rev)| rev), Some(2));

        // Clean tiles are not saved again.
        store.commit();
        assert_eq!(store.get_tile(id).map(|(_, rev)| rev), Some(2));
        assert_eq!(backend.load(&id, 16, 0).unwrap().unwrap().revision, 2);
    }

    #[test]
    fn eviction_flushes_dirty_tiles() {
        let backend = shared_backend();
        let mut store = store(&backend, 2);
        let a = TileId::new(1, 0, 0, 0);
        let b = TileId::new(1, 1, 0, 0);
        let c = TileId::new(1, 2, 0, 0);

        store.set_indexed(a, 0, 0.9);
        store.get_indexed(b, 0);
        assert_eq!(backend.load(&a, 16, 0).unwrap(), None);

        store.get_indexed(c, 0);
        assert_eq!(store.resident_len(), 2);
        let saved = backend.load(&a, 16, 0).unwrap().unwrap();
        assert_eq!(saved.revision, 1);
        assert_eq!(saved.data[0], 0.9);

        // Reading it again brings the saved copy back.
        assert_eq!(store.get_indexed(a, 0), 0.9);
    }

    #[test]
    fn lru_order_decides_the_victim() {
        let backend = shared_backend();
        let mut store = store(&backend, 2);
        let a = TileId::new(2, 0, 0, 0);
        let b = TileId::new(2, 0, 1, 0);
        let c = TileId::new(2, 0, 2, 0);

        store.set_indexed(a, 0, 1.0);
        store.set_indexed(b, 0, 2.0);
        // Touch `a` so `b` becomes the least recently used.
        store.get_indexed(a, 0);
        store.get_indexed(c, 0);

        assert_eq!(backend.load(&a, 16, 0).unwrap(), None);
        assert_eq!(backend.load(&b, 16, 0).unwrap().unwrap().data[0], 2.0);
        assert!(store.is_dirty(&a));
    }

    #[test]
    fn concurrent_updates_accumulate() {
        let backend = shared_backend();
        let mut first = store(&backend, 10);
        let mut second = store(&backend, 10);
        let cell = GridPoint3::new(1, 1, 0);

        // Both stores cache the tile before either writes.
        assert_eq!(first.get_cell(Channel::ElevationMean, cell), 0.0);
        assert_eq!(second.get_cell(Channel::ElevationMean, cell), 0.0);

        first.update_cell(Channel::ElevationMean, cell, 1.0, 1.0);
        second.update_cell(Channel::ElevationMean, cell, 1.0, 2.0);
        first.commit();
        second.commit();
        assert_eq!(second.get_cell(Channel::ElevationMean, cell), 3.0);

        first.refresh();
        assert_eq!(first.get_cell(Channel::ElevationMean, cell), 3.0);
    }

    #[test]
    fn contending_committers_serialize_on_the_tile_lock() {
        let backend = shared_backend();
        let cell = GridPoint3::new(0, 0, 0);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let backend = Arc::clone(&backend);
                std::thread::spawn(move || {
                    let mut store = TileStore::open(backend, 10).unwrap();
                    for _ in 0..10 {
                        store.update_cell(Channel::ElevationMean, cell, 1.0, 1.0);
                        store.commit();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let mut reader = store(&backend, 10);
        assert_eq!(reader.get_cell(Channel::ElevationMean, cell), 40.0);
        let id = TileId::in_channel(Channel::ElevationMean, 0, 0, 0);
        assert_eq!(reader.get_tile(id).map(|(_, rev)| rev), Some(40));
    }

    #[test]
    fn refresh_pulls_newer_revisions() {
        let backend = shared_backend();
        let mut reader = store(&backend, 10);
        let mut writer = store(&backend, 10);
        let cell = GridPoint3::new(2, 3, 0);

        assert_eq!(reader.get_cell(Channel::CostSpace, cell), 0.5);
        writer.set_cell(Channel::CostSpace, cell, 1.0);
        writer.commit();

        // Cached copy is served until the reader refreshes.
        assert_eq!(reader.get_cell(Channel::CostSpace, cell), 0.5);
        reader.refresh();
        assert_eq!(reader.get_cell(Channel::CostSpace, cell), 1.0);
    }

    #[test]
    fn stale_reload_replays_pending_updates() {
        let backend = shared_backend();
        let mut first = store(&backend, 10);
        let mut second = store(&backend, 10);
        let cell = GridPoint3::new(0, 0, 0);

        first.update_cell(Channel::ElevationMean, cell, 2.0, 1.0);
        second.set_cell(Channel::ElevationMean, cell, 5.0);
        second.commit();

        first.refresh();
        assert_eq!(first.get_cell(Channel::ElevationMean, cell), 11.0);
        assert!(first.is_dirty(&TileId::in_channel(Channel::ElevationMean, 0, 0, 0)));
    }

    #[test]
    fn unreachable_backend_degrades_and_retries() {
        let backend = shared_backend();
        let mut store = store(&backend, 10);
        let id = TileId::new(0, 0, 0, 0);

        backend.store().set_online(false);
        assert_eq!(store.get_indexed(id, 0), 0.5);
        store.set_indexed(id, 0, 0.1);
        assert_eq!(store.get_indexed(id, 0), 0.1);
        store.commit();
        assert!(store.is_dirty(&id));
        assert!(store.list(true).contains(&id));

        backend.store().set_online(true);
        store.commit();
        assert!(!store.is_dirty(&id));
        assert_eq!(backend.load(&id, 16, 0).unwrap().unwrap().data[0], 0.1);
    }

    #[test]
    fn corrupt_tiles_are_treated_as_absent() {
        let backend = shared_backend();
        let id = TileId::new(0, 0, 0, 0);
        backend.save(&id, &[1.0; 3], 0).unwrap();

        let mut store = store(&backend, 10);
        assert_eq!(store.get_indexed(id, 0), 0.5);

        // Committing replaces the corrupt copy.
        store.set_indexed(id, 0, 0.2);
        store.commit();
        let saved = backend.load(&id, 16, 0).unwrap().unwrap();
        assert_eq!(saved.revision, 2);
        assert_eq!(saved.data[0], 0.2);
        assert_eq!(saved.data[1], 0.5);
    }

    #[test]
    fn list_merges_manifest_and_resident_tiles() {
        let backend = shared_backend();
        let mut store = store(&backend, 10);
        let committed = TileId::new(0, 0, 0, 0);
        let pending = TileId::new(0, 1, 0, 0);
        let read_only = TileId::new(0, 2, 0, 0);

        store.set_indexed(committed, 0, 1.0);
        store.commit();
        store.set_indexed(pending, 0, 1.0);
        store.get_indexed(read_only, 0);

        assert!(store.list(false).is_empty());
        let listed: Vec<TileId> = store.list(true).iter().copied().collect();
        assert_eq!(listed, vec![committed, pending]);
        assert_eq!(store.list(false).len(), 2);
    }

    #[test]
    fn set_tile_overwrites_concurrent_commits() {
        let backend = shared_backend();
        let mut first = store(&backend, 10);
        let mut second = store(&backend, 10);
        let id = TileId::new(3, 0, 0, 0);
        let tile: Vec<f32> = (0..16).map(|i| i as f32).collect();

        first.set_tile(id, &tile);
        second.update_indexed(id, 5, 1.0, 100.0);
        second.commit();
        first.commit();

        let (data, revision) = first.get_tile(id).unwrap();
        assert_eq!(data, &tile[..]);
        assert_eq!(revision, 2);

        // Wrong sizes are ignored.
        first.set_tile(id, &[1.0]);
        assert!(!first.is_dirty(&id));
    }

    #[test]
    fn update_tile_applies_per_cell() {
        let backend = shared_backend();
        let mut store = store(&backend, 10);
        let id = TileId::new(2, 0, 0, 0);

        store.update_tile(id, &[1.0; 16], &[0.5; 16]);
        store.update_tile(id, &[2.0; 16], &[0.0; 16]);
        let (data, _) = store.get_tile(id).unwrap();
        assert!(data.iter().all(|v| *v == 1.0));
    }

    #[test]
    fn zero_multiplier_resets_infinite_base_on_commit() {
        let backend = shared_backend();
        let mut first = store(&backend, 10);
        let mut second = store(&backend, 10);
        let cell = GridPoint3::new(0, 0, 0);

        first.set_cell(Channel::ElevationVariance, cell, 2.0);
        second.set_cell(Channel::ElevationVariance, cell, f32::INFINITY);
        second.commit();
        first.commit();
        assert_eq!(first.get_cell(Channel::ElevationVariance, cell), 2.0);

        // The live value gets the same treatment.
        second.refresh();
        second.update_cell(Channel::ElevationVariance, cell, 1.0, f32::INFINITY);
        second.update_cell(Channel::ElevationVariance, cell, 0.0, 1.0);
        assert_eq!(second.get_cell(Channel::ElevationVariance, cell), 1.0);
    }
}
