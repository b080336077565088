//! The core data types shared by every part of the navigation stack:
//! - `TileId`: the address of one tile of one map channel
//! - `MapInfo`: immutable map geometry (cell scale and tile shape)
//! - `Channel`: the named layers of the map and their default values
//! - `Pose2`, `GridPoint2`, `GridPoint3`: real-world poses and their discretized cells

pub mod channel;
pub mod map_info;
pub mod pose;
pub mod tile_id;

pub use channel::{Channel, MAX_PROBABILITY, MIN_PROBABILITY, OBSTACLE_THRESHOLD};
pub use map_info::MapInfo;
pub use pose::{GridPoint2, GridPoint3, Pose2};
pub use tile_id::{TileId, TILE_ID_SIZE};

pub use num;

pub mod prelude {
    pub use super::{Channel, GridPoint2, GridPoint3, MapInfo, Pose2, TileId};
}
