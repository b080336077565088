use tilenav_core::prelude::*;
use tilenav_storage::{KvTileBackend, MemoryStore, TileBackend, TileStore};

use std::sync::Arc;

/// A backend that lives in this process and can be shared between stores (and threads) with `Arc::clone`.
pub type SharedMemoryBackend = Arc<KvTileBackend<MemoryStore>>;

/// A fresh, empty map held in memory.
pub fn memory_map(info: MapInfo) -> SharedMemoryBackend {
    let backend = Arc::new(KvTileBackend::new(MemoryStore::new()));
    backend
        .init(&info)
        .expect("memory backends are always reachable");

    backend
}

pub fn open_store(backend: &SharedMemoryBackend, pages: usize) -> TileStore<SharedMemoryBackend> {
    TileStore::open(Arc::clone(backend), pages).expect("map was initialized")
}

/// Paints the configuration space channel from a picture and commits it. Row `i` of the picture is `y == i`, column `j` is
/// `x == j`, both starting at the origin cell.
///
/// `#` is an obstacle (probability 1), `.` is free space (probability 0), and a digit `d` is probability `d / 10`. Any
/// other character leaves the cell at its default.
pub fn paint_cost_grid(backend: &SharedMemoryBackend, rows: &[&str]) {
    let mut store = open_store(backend, 64);
    for (y, row) in rows.iter().enumerate() {
        for (x, c) in row.chars().enumerate() {
            let p = match c {
                '#' => 1.0,
                '.' => 0.0,
                d if d.is_ascii_digit() => d.to_digit(10).map_or(0.0, |d| d as f32 / 10.0),
                _ => continue,
            };
            store.set_cell(
                Channel::CostSpace,
                GridPoint3::new(x as i32, y as i32, 0),
                p,
            );
        }
    }
    store.commit();
}

/// A square map of free space with the given side length (in cells), at 1 meter per cell.
pub fn open_field(side: usize) -> SharedMemoryBackend {
    let backend = memory_map(MapInfo::new(1.0, 16, 16, 1));
    let row = ".".repeat(side);
    let rows: Vec<&str> = (0..side).map(|_| row.as_str()).collect();
    paint_cost_grid(&backend, &rows);

    backend
}
