use tilenav_core::{Channel, GridPoint2, MapInfo};
use tilenav_storage::{TileBackend, TileStore};

use auto_impl::auto_impl;

/// A 2D grid of obstacle probabilities that the searches read from.
#[auto_impl(&mut, Box)]
pub trait CostMap {
    fn info(&self) -> &MapInfo;

    /// The obstacle probability of `cell`, where anything at or above `MAX_PROBABILITY` is impassable.
    fn cost(&mut self, cell: GridPoint2) -> f32;

    /// Lets the next reads observe changes made by others since the last refresh.
    fn refresh(&mut self);
}

/// Reads the configuration space channel of the ground layer (`z == 0`).
impl<B> CostMap for TileStore<B>
where
    B: TileBackend,
{
    fn info(&self) -> &MapInfo {
        TileStore::info(self)
    }

    #[inline]
    fn cost(&mut self, cell: GridPoint2) -> f32 {
        self.get_cell(Channel::CostSpace, cell.into())
    }

    fn refresh(&mut self) {
        TileStore::refresh(self)
    }
}
