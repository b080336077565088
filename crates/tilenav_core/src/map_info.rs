use crate::{GridPoint3, TileId};

use num::Integer;
use serde::{Deserialize, Serialize};

/// The geometry of a map: the real-world size of a cell and the shape of a tile in cells.
///
/// This is written once when a map is created and never changes for the lifetime of the map.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct MapInfo {
    /// Meters per cell.
    pub scale: f64,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tile_depth: u32,
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            scale: 0.05,
            tile_width: 256,
            tile_height: 256,
            tile_depth: 1,
        }
    }
}

impl MapInfo {
    pub const fn new(scale: f64, tile_width: u32, tile_height: u32, tile_depth: u32) -> Self {
        Self {
            scale,
            tile_width,
            tile_height,
            tile_depth,
        }
    }

    /// A map is usable iff the scale is strictly positive and every tile dimension is non-zero.
    pub fn is_valid(&self) -> bool {
        self.scale > 0.0 && self.tile_width > 0 && self.tile_height > 0 && self.tile_depth > 0
    }

    /// Number of cells in one tile.
    #[inline]
    pub fn tile_len(&self) -> usize {
        self.tile_width as usize * self.tile_height as usize * self.tile_depth as usize
    }

    /// Number of bytes in one serialized tile.
    #[inline]
    pub fn tile_size(&self) -> usize {
        self.tile_len() * std::mem::size_of::<f32>()
    }

    /// Discretizes one real-world coordinate into a cell coordinate.
    #[inline]
    pub fn cell_coordinate(&self, v: f64) -> i32 {
        (v / self.scale).floor() as i32
    }

    /// The cell containing the real-world point `(x, y, z)`.
    #[inline]
    pub fn cell_containing(&self, x: f64, y: f64, z: f64) -> GridPoint3 {
        GridPoint3::new(
            self.cell_coordinate(x),
            self.cell_coordinate(y),
            self.cell_coordinate(z),
        )
    }

    /// Real-world coordinate of the center of cell coordinate `c`.
    #[inline]
    pub fn cell_center(&self, c: i32) -> f64 {
        c as f64 * self.scale + 0.5 * self.scale
    }

    /// Splits a cell into the `TileId` of its tile (in `channel`) and its linear index inside that tile. The index is laid out
    /// with X varying fastest, then Y, then Z.
    pub fn locate(&self, channel: u32, cell: GridPoint3) -> (TileId, usize) {
        let (w, h, d) = (
            self.tile_width as i32,
            self.tile_height as i32,
            self.tile_depth as i32,
        );
        let id = TileId::new(
            channel,
            cell.x.div_floor(&w),
            cell.y.div_floor(&h),
            cell.z.div_floor(&d),
        );
        let index = cell.z.mod_floor(&d) as usize * (h as usize) * (w as usize)
            + cell.y.mod_floor(&h) as usize * (w as usize)
            + cell.x.mod_floor(&w) as usize;

        (id, index)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
