//! Navigation on top of shared tile maps.
//!
//! - `Planner` turns a goal into nearby waypoints for a motion controller
//! - `SearchWorker` and `RouteWorker` run path searches and waypoint ordering in background threads
//! - `Navigator` runs a `Planner` over a `SearchWorker` at the configured period
//! - `Mission` visits a list of goals in the cheapest order and returns home
//!
//! Each worker owns its own `TileStore`, usually opened over an `Arc` of the same backend as the foreground.

pub mod config;
pub mod error;
pub mod mission;
pub mod navigator;
pub mod planner;
pub mod route_worker;
pub mod search_worker;
pub mod worker;

pub use config::{MissionConfig, NavConfig, PlannerConfig, RouteConfig, StoreConfig, WorkerConfig};
pub use error::{NavError, NavResult};
pub use mission::{Mission, MissionStep};
pub use navigator::Navigator;
pub use planner::{MotionCommand, PathSource, Planner, PlannerState, PlannerStatus};
pub use route_worker::{RouteSource, RouteWorker};
pub use search_worker::{SearchRequest, SearchWorker};
pub use worker::{Task, Worker};

pub use tilenav_search;

pub mod prelude {
    pub use super::{
        Mission, MissionStep, MotionCommand, NavConfig, NavError, NavResult, Navigator, Planner, PlannerState,
        PlannerStatus, RouteWorker, SearchWorker,
    };
}
