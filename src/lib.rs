//! A navigation map shared between processes, and the navigation built on it.
//!
//! This library is organized into several crates. The most fundamental are:
//! - **core**: tile ids, map geometry, channels and poses
//! - **storage**: the tile cache (`TileStore`) and the backends it synchronizes through
//!
//! Then you get extra bits of functionality from the others:
//! - **search**: A* over the configuration space channel, and waypoint ordering
//! - **nav**: the waypoint-following planner, background workers and missions
//!
//! The `maptool` binary manages maps in sled databases and snapshot files.

pub use tilenav_core as core;
pub use tilenav_storage as storage;

pub mod prelude {
    pub use super::core::prelude::*;
    pub use super::storage::prelude::*;

    #[cfg(feature = "search")]
    pub use super::search::prelude::*;

    #[cfg(feature = "nav")]
    pub use super::nav::prelude::*;
}

#[cfg(feature = "nav")]
pub use tilenav_nav as nav;

#[cfg(feature = "search")]
pub use tilenav_search as search;
