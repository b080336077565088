//! Tuning for the planner, the background workers and missions.
//!
//! Every field has a default, so a config file only needs to name what it changes:
//!
//! ```text
//! (
//!     planner: (goal_distance: 0.5),
//!     route: (accuracy: 2.0),
//! )
//! ```

use tilenav_storage::DEFAULT_PAGES;

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use crate::NavResult;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct NavConfig {
    pub store: StoreConfig,
    pub planner: PlannerConfig,
    pub search: WorkerConfig,
    pub route: RouteConfig,
    pub mission: MissionConfig,
}

impl NavConfig {
    pub fn from_ron_str(s: &str) -> NavResult<Self> {
        Ok(ron::de::from_str(s)?)
    }

    pub fn read_from(reader: impl Read) -> NavResult<Self> {
        Ok(ron::de::from_reader(reader)?)
    }

    pub fn read_file(path: impl AsRef<Path>) -> NavResult<Self> {
        let reader = std::fs::File::open(path)?;

        Self::read_from(reader)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Tiles each `TileStore` keeps resident.
    pub pages: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Meters from the goal at which it counts as reached.
    pub goal_distance: f64,
    /// Meters the vehicle may stray from the path before the planner stops following it.
    pub path_deviation_limit: f64,
    /// Lookahead distance in meters. Also the accuracy of the background search.
    pub next_waypoint_distance: f64,
    pub period_ms: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            goal_distance: 0.75,
            path_deviation_limit: 3.0,
            next_waypoint_distance: 1.5,
            period_ms: 10,
        }
    }
}

impl PlannerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub period_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { period_ms: 50 }
    }
}

impl WorkerConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    pub period_ms: u64,
    /// Search accuracy used for leg costs.
    pub accuracy: f64,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            period_ms: 100,
            accuracy: 1.0,
        }
    }
}

impl RouteConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Meters from a goal at which it counts as visited.
    pub waypoint_distance: f64,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            waypoint_distance: 0.9,
        }
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

    use pretty_assertions::assert_eq;

    #[test]
    fn empty_config_is_default() {
        let config = NavConfig::from_ron_str("()").unwrap();

        assert_eq!(config, NavConfig::default());
        assert_eq!(config.store.pages, 500);
        assert_eq!(config.planner.goal_distance, 0.75);
        assert_eq!(config.planner.path_deviation_limit, 3.0);
        assert_eq!(config.planner.next_waypoint_distance, 1.5);
        assert_eq!(config.planner.period(), Duration::from_millis(10));
        assert_eq!(config.search.period(), Duration::from_millis(50));
        assert_eq!(config.route.period(), Duration::from_millis(100));
        assert_eq!(config.route.accuracy, 1.0);
        assert_eq!(config.mission.waypoint_distance, 0.9);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = NavConfig::from_ron_str(
            "(
                planner: (goal_distance: 0.5),
                route: (accuracy: 2.0),
            )",
        )
        .unwrap();

        assert_eq!(config.planner.goal_distance, 0.5);
        assert_eq!(config.planner.path_deviation_limit, 3.0);
        assert_eq!(config.route.accuracy, 2.0);
        assert_eq!(config.route.period_ms, 100);
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(NavConfig::from_ron_str("(planner: 3)").is_err());
        assert!(NavConfig::read_from("(store: (pages: 8))".as_bytes()).is_ok());
    }
}
