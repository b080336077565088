//! Turns a goal into a stream of nearby waypoints for a motion controller.
//!
//! Every `plan` cycle asks the path source for a path from the current pose to the goal, finds the path point nearest to the
//! vehicle, and looks ahead along the path by `next_waypoint_distance` to pick the waypoint to drive to.

use crate::PlannerConfig;

use tilenav_core::Pose2;

use auto_impl::auto_impl;
use tracing::{debug, warn};

/// Something that finds paths, usually in the background. `set` may return before the path is ready, and `path` returns
/// the newest result, which is empty until one exists.
#[auto_impl(&mut, Box)]
pub trait PathSource {
    fn set(&mut self, begin: Pose2, end: Pose2);

    fn path(&self) -> Vec<Pose2>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlannerStatus {
    /// Not planning. The vehicle should hold still.
    Disabled,
    /// Waiting for a path, or too far from the one we have.
    Searching,
    /// Driving to a waypoint on the path.
    Following,
    /// Close enough to the goal.
    Arrived,
}

/// The outcome of the last `plan` cycle.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerState {
    pub status: PlannerStatus,
    pub pose: Pose2,
    pub goal: Pose2,
    /// The waypoint to drive to. The current pose unless `valid`.
    pub waypoint: Pose2,
    /// Index of `waypoint` in the path; when deviated, the index of the nearest path point.
    pub waypoint_index: Option<usize>,
    /// Length of the path.
    pub waypoint_count: usize,
    pub valid: bool,
    pub done: bool,
    /// The vehicle is further than `path_deviation_limit` from every point of the path.
    pub deviated: bool,
}

impl PlannerState {
    fn reset(pose: Pose2, goal: Pose2) -> Self {
        Self {
            status: PlannerStatus::Searching,
            pose,
            goal,
            waypoint: pose,
            waypoint_index: None,
            waypoint_count: 0,
            valid: false,
            done: false,
            deviated: false,
        }
    }
}

/// What the motion controller should do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionCommand {
    pub target: Pose2,
    /// `false` means stop at `target`, which is then the current pose.
    pub active: bool,
}

pub struct Planner<S> {
    search: S,
    config: PlannerConfig,
    /// Meters per map cell.
    scale: f64,
    enabled: bool,
    pose: Pose2,
    goal: Pose2,
    path: Vec<Pose2>,
    state: PlannerState,
}

impl<S> Planner<S>
where
    S: PathSource,
{
    /// A disabled planner. `scale` is the cell size of the map that `search` plans on.
    pub fn new(search: S, scale: f64, config: PlannerConfig) -> Self {
        Self {
            search,
            config,
            scale,
            enabled: false,
            pose: Pose2::default(),
            goal: Pose2::default(),
            path: Vec::new(),
            state: PlannerState {
                status: PlannerStatus::Disabled,
                ..PlannerState::reset(Pose2::default(), Pose2::default())
            },
        }
    }

    pub fn set_pose(&mut self, pose: Pose2) {
        self.pose = pose;
    }

    pub fn set_goal(&mut self, goal: Pose2) {
        self.goal = goal;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    /// The path the last cycle followed, starting near the vehicle.
    pub fn waypoints(&self) -> &[Pose2] {
        &self.path
    }

    pub fn search(&self) -> &S {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut S {
        &mut self.search
    }

    pub fn into_search(self) -> S {
        self.search
    }

    /// Runs one planning cycle.
    pub fn plan(&mut self) -> &PlannerState {
        let (pose, goal) = (self.pose, self.goal);
        self.state = PlannerState::reset(pose, goal);

        if !self.enabled {
            self.search.set(pose, pose);
            self.path.clear();
            self.state.status = PlannerStatus::Disabled;

            return &self.state;
        }

        if pose.distance(&goal) < self.config.goal_distance {
            self.search.set(pose, pose);
            self.path.clear();
            self.state.done = true;
            self.state.status = PlannerStatus::Arrived;

            return &self.state;
        }

        self.search.set(pose, goal);
        self.path = self.search.path();
        self.state.waypoint_count = self.path.len();

        let (nearest, distance) = match nearest_point(&self.path, &pose) {
            Some(n) => n,
            None => return &self.state,
        };
        self.state.waypoint_index = Some(nearest);

        if distance > self.config.path_deviation_limit {
            warn!(
                "path deviation: ({}, {}) is {} from the path",
                pose.x, pose.y, distance
            );
            self.state.deviated = true;

            return &self.state;
        }

        let lookahead = (self.config.next_waypoint_distance / self.scale).ceil() as usize;
        let index = (nearest + lookahead).min(self.path.len() - 1);
        self.state.waypoint = self.path[index];
        self.state.waypoint_index = Some(index);
        self.state.valid = true;
        self.state.status = PlannerStatus::Following;
        debug!(
            "waypoint {}/{} at ({}, {})",
            index, self.state.waypoint_count, self.state.waypoint.x, self.state.waypoint.y
        );

        &self.state
    }

    pub fn motion_command(&self) -> MotionCommand {
        if self.state.valid && !self.state.done {
            MotionCommand {
                target: self.state.waypoint,
                active: true,
            }
        } else {
            MotionCommand {
                target: self.state.pose,
                active: false,
            }
        }
    }
}

/// The index of the path point nearest to `pose` and its distance. The first of equally near points wins.
fn nearest_point(path: &[Pose2], pose: &Pose2) -> Option<(usize, f64)> {
    let mut nearest = None;
    for (i, p) in path.iter().enumerate() {
        let d = p.distance(pose);
        match nearest {
            Some((_, min)) if d >= min => {}
            _ => nearest = Some((i, d)),
        }
    }

    nearest
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
