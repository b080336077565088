//! The planner wired to a background search over a map of its own, ticking at the planner's period.

use crate::{MotionCommand, NavConfig, NavResult, Planner, PlannerState, SearchWorker};

use tilenav_core::Pose2;
use tilenav_storage::{TileBackend, TileStore};

use std::thread;
use std::time::Duration;
use tracing::info;

pub struct Navigator {
    planner: Planner<SearchWorker>,
    period: Duration,
}

impl Navigator {
    /// Opens a `TileStore` over `backend` for the search thread and starts a disabled planner on top of it.
    pub fn spawn<B>(backend: B, config: &NavConfig) -> NavResult<Self>
    where
        B: TileBackend + 'static,
    {
        let map = TileStore::open(backend, config.store.pages)?;
        let scale = map.info().scale;
        let search = SearchWorker::spawn(map, config.planner.next_waypoint_distance, &config.search)?;
        info!(
            "navigator on a {} m map, planning every {} ms",
            scale, config.planner.period_ms
        );

        Ok(Self {
            planner: Planner::new(search, scale, config.planner),
            period: config.planner.period(),
        })
    }

    pub fn planner(&self) -> &Planner<SearchWorker> {
        &self.planner
    }

    pub fn planner_mut(&mut self) -> &mut Planner<SearchWorker> {
        &mut self.planner
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One plan cycle from `pose`.
    pub fn step(&mut self, pose: Pose2) -> MotionCommand {
        self.planner.set_pose(pose);
        self.planner.plan();

        self.planner.motion_command()
    }

    /// Runs a plan cycle every period, starting at `pose`. `drive` receives each command with the state that produced it and
    /// returns the next pose, or `None` to stop.
    pub fn run<F>(&mut self, mut pose: Pose2, mut drive: F)
    where
        F: FnMut(&MotionCommand, &PlannerState) -> Option<Pose2>,
    {
        loop {
            let command = self.step(pose);
            match drive(&command, self.planner.state()) {
                Some(next) => pose = next,
                None => return,
            }
            thread::sleep(self.period);
        }
    }

    pub fn stop(&mut self) {
        self.planner.search_mut().stop();
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
    use crate::{PlannerStatus, StoreConfig, WorkerConfig};

    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use utilities::data_sets::open_field;

    fn fast_config() -> NavConfig {
        let mut config = NavConfig {
            store: StoreConfig { pages: 16 },
            search: WorkerConfig { period_ms: 1 },
            ..Default::default()
        };
        config.planner.period_ms = 1;

        config
    }

    #[test]
    fn takes_the_period_from_the_planner_config() {
        let backend = open_field(4);
        let mut navigator = Navigator::spawn(Arc::clone(&backend), &fast_config()).unwrap();

        assert_eq!(navigator.period(), Duration::from_millis(1));
        assert_eq!(navigator.planner().state().status, PlannerStatus::Disabled);
        assert!(!navigator.step(Pose2::at(0.5, 0.5)).active);

        navigator.stop();
    }

    #[test]
    fn drives_to_the_goal() {
        let backend = open_field(16);
        let mut navigator = Navigator::spawn(Arc::clone(&backend), &fast_config()).unwrap();
        navigator.planner_mut().set_goal(Pose2::at(12.5, 0.5));
        navigator.planner_mut().set_enabled(true);

        let mut cycles = 0;
        let mut last_status = PlannerStatus::Searching;
        navigator.run(Pose2::at(0.5, 0.5), |command, state| {
            cycles += 1;
            last_status = state.status;
            if state.status == PlannerStatus::Arrived || cycles > 5000 {
                None
            } else {
                // The vehicle reaches every waypoint within one cycle.
                Some(command.target)
            }
        });

        assert_eq!(last_status, PlannerStatus::Arrived);
        assert!(navigator.planner().state().done);
        assert!(!navigator.step(Pose2::at(12.5, 0.5)).active);

        navigator.stop();
    }
}
