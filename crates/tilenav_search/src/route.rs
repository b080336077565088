//! Orders waypoints to minimize the total path cost of visiting them.
//!
//! This is a brute force search over every order of the interior waypoints, so it is only practical for a handful of them.

use crate::{astar_search, CostMap};

use tilenav_core::Pose2;
use tilenav_storage::SmallKeyHashMap;

use float_ord::FloatOrd;
use tracing::{debug, info};

/// The cost of travelling between two waypoints. `None` means there is no way to get there.
pub trait LegCost {
    fn leg_cost(&mut self, from: &Pose2, to: &Pose2) -> Option<f64>;

    /// Called before every optimization pass.
    fn refresh(&mut self) {}
}

/// Leg costs from `astar_search` over a `CostMap`.
pub struct SearchLegs<M> {
    pub map: M,
    pub accuracy: f64,
}

impl<M> LegCost for SearchLegs<M>
where
    M: CostMap,
{
    fn leg_cost(&mut self, from: &Pose2, to: &Pose2) -> Option<f64> {
        let result = astar_search(&mut self.map, from, to, false, self.accuracy);

        if result.found {
            Some(result.cost)
        } else {
            None
        }
    }

    fn refresh(&mut self) {
        self.map.refresh()
    }
}

/// The bit patterns of a position, so poses can be hashed.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
struct PositionKey(u64, u64);

impl From<&Pose2> for PositionKey {
    fn from(p: &Pose2) -> Self {
        Self(p.x.to_bits(), p.y.to_bits())
    }
}

/// Memoized leg costs, keyed by the unordered pair of endpoints. The cost of `a -> b` is assumed to be the cost of `b -> a`.
#[derive(Debug, Default)]
pub struct LegCostCache {
    costs: SmallKeyHashMap<(PositionKey, PositionKey), Option<f64>>,
}

impl LegCostCache {
    pub fn get_or_compute(
        &mut self,
        from: &Pose2,
        to: &Pose2,
        legs: &mut impl LegCost,
    ) -> Option<f64> {
        let (a, b) = (PositionKey::from(from), PositionKey::from(to));
        let key = if a < b { (a, b) } else { (b, a) };

        *self.costs.entry(key).or_insert_with(|| {
            let cost = legs.leg_cost(from, to);
            debug!(
                "leg ({}, {}) -> ({}, {}) costs {:?}",
                from.x, from.y, to.x, to.y, cost
            );

            cost
        })
    }

    pub fn len(&self) -> usize {
        self.costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.costs.is_empty()
    }

    pub fn clear(&mut self) {
        self.costs.clear();
    }
}

/// A waypoint order and its summed leg costs.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub waypoints: Vec<Pose2>,
    pub cost: f64,
}

#[derive(Debug, Default)]
pub struct RouteOptimizer {
    cache: LegCostCache,
}

impl RouteOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds the cheapest order of `waypoints` by path cost on `map`, keeping the first and last waypoints in place.
    pub fn optimize(
        &mut self,
        map: &mut impl CostMap,
        waypoints: &[Pose2],
        accuracy: f64,
    ) -> Option<Route> {
        self.optimize_with(&mut SearchLegs { map, accuracy }, waypoints)
    }

    /// One full optimization pass with any leg cost. The first and last waypoints stay fixed, the interior waypoints are
    /// tried in every order.
    ///
    /// Returns `None` if there are fewer than 2 waypoints or no order is feasible.
    pub fn optimize_with(&mut self, legs: &mut impl LegCost, waypoints: &[Pose2]) -> Option<Route> {
        if waypoints.len() < 2 {
            return None;
        }

        legs.refresh();
        self.cache.clear();

        let first = waypoints[0];
        let last = waypoints[waypoints.len() - 1];
        let mut interior = waypoints[1..waypoints.len() - 1].to_vec();
        interior.sort_by_key(|p| (FloatOrd(p.x), FloatOrd(p.y)));

        let mut order: Vec<usize> = (0..interior.len()).collect();
        let mut candidate = Vec::with_capacity(waypoints.len());
        let mut best: Option<Route> = None;
        loop {
            candidate.clear();
            candidate.push(first);
            candidate.extend(order.iter().map(|&i| interior[i]));
            candidate.push(last);

            let best_cost = best.as_ref().map_or(f64::INFINITY, |r| r.cost);
            if let Some(cost) = self.route_cost(legs, &candidate, best_cost) {
                if cost < best_cost {
                    best = Some(Route {
                        waypoints: candidate.clone(),
                        cost,
                    });
                }
            }

            if !next_permutation(&mut order) {
                break;
            }
        }

        match &best {
            Some(route) => info!(
                "best order of {} waypoints costs {}",
                waypoints.len(),
                route.cost
            ),
            None => info!("no feasible order of {} waypoints", waypoints.len()),
        }

        best
    }

    /// The number of distinct legs evaluated by the last pass.
    pub fn legs_evaluated(&self) -> usize {
        self.cache.len()
    }

    /// Sums the legs of `route`, giving up as soon as a leg is infeasible or the sum reaches `bound`.
    fn route_cost(&mut self, legs: &mut impl LegCost, route: &[Pose2], bound: f64) -> Option<f64> {
        let mut total = 0.0;
        for leg in route.windows(2) {
            total += self.cache.get_or_compute(&leg[0], &leg[1], legs)?;
            if total >= bound {
                return None;
            }
        }

        Some(total)
    }
}

/// Rearranges `items` into the next lexicographically greater permutation. Returns `false` (and leaves `items` sorted) once
/// the last permutation has been passed.
fn next_permutation<T: Ord>(items: &mut [T]) -> bool {
    if items.len() < 2 {
        return false;
    }

    // Find the longest non-increasing suffix.
    let mut i = items.len() - 1;
    while i > 0 && items[i - 1] >= items[i] {
        i -= 1;
    }
    if i == 0 {
        items.reverse();
        return false;
    }

    // Swap the pivot with the rightmost element greater than it, then make the suffix ascending.
    let mut j = items.len() - 1;
    while items[j] <= items[i - 1] {
        j -= 1;
    }
    items.swap(i - 1, j);
    items[i..].reverse();

    true
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
