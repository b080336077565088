//! Visiting a list of goals in the cheapest order and returning to where we started.

use crate::{MissionConfig, NavError, NavResult, RouteSource};

use tilenav_core::Pose2;

use std::io::Read;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MissionStep {
    /// The visiting order is not known yet. The planner should be disabled.
    Waiting,
    /// Drive to this goal.
    Goal(Pose2),
    /// Every goal was visited and we are back at the start.
    Complete,
}

pub struct Mission {
    /// Goals left to visit. The last one is the start pose.
    goals: Vec<Pose2>,
    /// Where the route to the remaining goals starts. Reset whenever a goal is visited, so the route is only recomputed then.
    route_start: Option<Pose2>,
    waypoint_distance: f64,
}

impl Mission {
    /// A mission visiting `goals` in any order, then returning to `start`.
    pub fn new(goals: Vec<Pose2>, start: Pose2, config: &MissionConfig) -> Self {
        let mut goals = goals;
        goals.push(start);

        Self {
            goals,
            route_start: None,
            waypoint_distance: config.waypoint_distance,
        }
    }

    /// Reads whitespace-separated `x y` coordinate pairs, one goal per pair.
    pub fn load_waypoints(mut reader: impl Read) -> NavResult<Vec<Pose2>> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;

        let mut coordinates = Vec::new();
        for token in text.split_whitespace() {
            let value: f64 = token
                .parse()
                .map_err(|_| NavError::InvalidWaypoint(token.to_string()))?;
            coordinates.push(value);
        }
        if coordinates.len() % 2 != 0 {
            warn!("ignoring unpaired coordinate {:?}", coordinates.last());
        }

        let goals: Vec<Pose2> = coordinates
            .chunks_exact(2)
            .map(|pair| Pose2::at(pair[0], pair[1]))
            .collect();
        if goals.is_empty() {
            return Err(NavError::NoWaypoints);
        }
        for goal in goals.iter() {
            info!("waypoint ({}, {})", goal.x, goal.y);
        }

        Ok(goals)
    }

    /// Goals left to visit, ending with the start pose.
    pub fn goals(&self) -> &[Pose2] {
        &self.goals
    }

    pub fn is_complete(&self) -> bool {
        self.goals.is_empty()
    }

    /// Checks off a reached goal and picks the next one to drive to. `route` orders the remaining goals.
    pub fn step(&mut self, pose: &Pose2, route: &mut impl RouteSource) -> MissionStep {
        if self.goals.len() > 1 {
            // At most one goal is reached per step.
            let last = self.goals.len() - 1;
            if let Some(i) = self.goals[..last]
                .iter()
                .position(|g| g.distance(pose) < self.waypoint_distance)
            {
                self.goals.remove(i);
                self.route_start = None;
                info!("reached a waypoint, {} left", self.goals.len());
            }
        } else if let Some(home) = self.goals.first() {
            if home.distance(pose) < self.waypoint_distance {
                self.goals.clear();
                route.set(Vec::new());
                info!("reached the last waypoint");
            }
        }

        match self.goals.len() {
            0 => MissionStep::Complete,
            1 => {
                route.set(Vec::new());
                MissionStep::Goal(self.goals[0])
            }
            _ => self.next_on_route(pose, route),
        }
    }

    fn next_on_route(&mut self, pose: &Pose2, route: &mut impl RouteSource) -> MissionStep {
        let start = *self.route_start.get_or_insert(*pose);
        let mut waypoints = Vec::with_capacity(self.goals.len() + 1);
        waypoints.push(start);
        waypoints.extend_from_slice(&self.goals);
        route.set(waypoints);

        let route = match route.route() {
            Some(r) => r,
            None => return MissionStep::Waiting,
        };

        // Skip the start and anything already visited.
        let last = self.goals.len() - 1;
        let pending = &self.goals[..last];
        let next = route.waypoints[1..]
            .iter()
            .find(|w| pending.iter().any(|g| g.same_position(w)))
            .copied()
            .unwrap_or(self.goals[last]);

        MissionStep::Goal(next)
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
    use tilenav_search::Route;

    /// Orders waypoints by `x`, as soon as they are set.
    #[derive(Default)]
    struct SortByX {
        current: Vec<Pose2>,
        ready: bool,
        sets: usize,
    }

    impl RouteSource for SortByX {
        fn set(&mut self, waypoints: Vec<Pose2>) {
            if waypoints != self.current {
                self.sets += 1;
            }
            self.current = waypoints;
        }

        fn route(&self) -> Option<Route> {
            if !self.ready || self.current.len() < 2 {
                return None;
            }
            let mut interior = self.current[1..self.current.len() - 1].to_vec();
            interior.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap());

            let mut waypoints = vec![self.current[0]];
            waypoints.extend(interior);
            waypoints.push(self.current[self.current.len() - 1]);

            Some(Route {
                waypoints,
                cost: 0.0,
            })
        }
    }

    #[test]
    fn loads_coordinate_pairs() {
        let goals = Mission::load_waypoints("1.5 2\n-3 4.25\n\n10 0 7".as_bytes()).unwrap();

        assert_eq!(
            goals,
            vec![Pose2::at(1.5, 2.0), Pose2::at(-3.0, 4.25), Pose2::at(10.0, 0.0)]
        );
        assert!(matches!(
            Mission::load_waypoints("1 north".as_bytes()),
            Err(NavError::InvalidWaypoint(t)) if t == "north"
        ));
        assert!(matches!(
            Mission::load_waypoints("  \n".as_bytes()),
            Err(NavError::NoWaypoints)
        ));
    }

    #[test]
    fn visits_goals_in_route_order_then_returns() {
        let home = Pose2::at(0.0, 0.0);
        let a = Pose2::at(5.0, 0.0);
        let b = Pose2::at(2.0, 0.0);
        let mut mission = Mission::new(vec![a, b], home, &MissionConfig::default());
        let mut route = SortByX::default();

        assert_eq!(mission.goals(), &[a, b, home]);
        assert_eq!(mission.step(&home, &mut route), MissionStep::Waiting);
        assert_eq!(route.current, vec![home, a, b, home]);

        route.ready = true;
        assert_eq!(mission.step(&home, &mut route), MissionStep::Goal(b));

        // Moving doesn't ask for a new order.
        let sets = route.sets;
        assert_eq!(
            mission.step(&Pose2::at(1.0, 0.0), &mut route),
            MissionStep::Goal(b)
        );
        assert_eq!(route.sets, sets);

        // Reaching `b` leaves `a` and the way home, ordered from where `b` was reached.
        let near_b = Pose2::at(2.5, 0.0);
        assert_eq!(mission.step(&near_b, &mut route), MissionStep::Goal(a));
        assert_eq!(mission.goals(), &[a, home]);
        assert_eq!(route.current, vec![near_b, a, home]);

        // Only the way home is left, so the route source goes idle.
        assert_eq!(
            mission.step(&Pose2::at(4.5, 0.0), &mut route),
            MissionStep::Goal(home)
        );
        assert!(route.current.is_empty());
        assert!(!mission.is_complete());

        assert_eq!(
            mission.step(&Pose2::at(0.3, 0.2), &mut route),
            MissionStep::Complete
        );
        assert!(mission.is_complete());
        assert_eq!(mission.step(&home, &mut route), MissionStep::Complete);
    }

    #[test]
    fn one_goal_is_checked_off_per_step() {
        let home = Pose2::at(0.0, 0.0);
        let a = Pose2::at(1.0, 0.0);
        let b = Pose2::at(1.2, 0.0);
        let mut mission = Mission::new(vec![a, b], home, &MissionConfig::default());
        let mut route = SortByX {
            ready: true,
            ..Default::default()
        };

        let between = Pose2::at(1.1, 0.0);
        assert_eq!(mission.step(&between, &mut route), MissionStep::Goal(b));
        assert_eq!(mission.goals(), &[b, home]);
        assert_eq!(mission.step(&between, &mut route), MissionStep::Goal(home));
        assert_eq!(mission.goals(), &[home]);
    }
}
