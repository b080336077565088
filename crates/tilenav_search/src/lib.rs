#![allow(clippy::type_complexity, clippy::needless_collect)]

//! Searches over the configuration space channel of a tile map.
//!
//! - `astar_search` finds the cheapest 8-connected path between two poses
//! - `RouteOptimizer` orders a list of waypoints to minimize the summed path cost

pub mod cost_map;
pub mod pathfinding;
pub mod route;

pub use cost_map::CostMap;
pub use pathfinding::{astar_search, astar_search_with_limit, SearchResult, MAX_EXPANSIONS};
pub use route::{LegCost, LegCostCache, Route, RouteOptimizer, SearchLegs};

pub mod prelude {
    pub use super::{astar_search, CostMap, Route, RouteOptimizer, SearchResult};
}
