use crate::CostMap;

use tilenav_core::{GridPoint2, Pose2, MAX_PROBABILITY, MIN_PROBABILITY};

use core::cmp::Ordering;
use float_ord::FloatOrd;
use indexmap::map::Entry::{Occupied, Vacant};
use indexmap::IndexMap;
use std::collections::BinaryHeap;
use std::f64::consts::SQRT_2;

/// The 8-connected neighborhood and the base cost of each step.
const SUCCESSORS: [(i32, i32, f64); 8] = [
    (1, 0, 1.0),
    (-1, 0, 1.0),
    (0, 1, 1.0),
    (0, -1, 1.0),
    (1, 1, SQRT_2),
    (1, -1, SQRT_2),
    (-1, 1, SQRT_2),
    (-1, -1, SQRT_2),
];

const NO_PARENT: usize = usize::MAX;

/// How many cells `astar_search` expands before giving up, a few dozen default-sized tiles.
pub const MAX_EXPANSIONS: usize = 1 << 21;

#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    pub found: bool,
    /// Cell centers from start to goal. Empty unless a path was requested and found.
    pub path: Vec<Pose2>,
    /// Summed step costs from the start cell to the terminal cell, `f64::INFINITY` if nothing was found.
    pub cost: f64,
}

impl SearchResult {
    fn not_found() -> Self {
        Self {
            found: false,
            path: Vec::new(),
            cost: f64::INFINITY,
        }
    }
}

/// A-star search from the cell containing `start` to the cell containing `goal`, over the obstacle probabilities of `map`.
///
/// Entering a cell with probability `p` costs the base step cost if `p <= 0.5` and `base / (1 - p)` otherwise, so cells near
/// obstacles are discouraged without being forbidden. Cells with `p >= MAX_PROBABILITY` are never entered. The heuristic is
/// the straight-line grid distance to the goal.
///
/// With `accuracy > 0`, the search also succeeds on the first expanded cell within `accuracy` meters of the goal, and the
/// path then ends with the exact `goal` position.
///
/// An exact search (`accuracy == 0`) for an obstacle cell fails right away. Otherwise the map has no bounds, so the search
/// gives up after expanding `MAX_EXPANSIONS` cells.
pub fn astar_search(
    map: &mut impl CostMap,
    start: &Pose2,
    goal: &Pose2,
    want_path: bool,
    accuracy: f64,
) -> SearchResult {
    astar_search_with_limit(map, start, goal, want_path, accuracy, MAX_EXPANSIONS)
}

/// Like `astar_search`, but gives up after expanding `max_expansions` cells.
pub fn astar_search_with_limit(
    map: &mut impl CostMap,
    start: &Pose2,
    goal: &Pose2,
    want_path: bool,
    accuracy: f64,
    max_expansions: usize,
) -> SearchResult {
    debug_assert!(accuracy >= 0.0);

    let info = *map.info();
    let init = GridPoint2::containing(start, &info);
    let target = GridPoint2::containing(goal, &info);
    let goal_accuracy = accuracy / info.scale;

    if goal_accuracy <= 0.0 && map.cost(target) >= MAX_PROBABILITY {
        return SearchResult::not_found();
    }

    let mut to_see = BinaryHeap::new();
    to_see.push(CostHolder {
        estimated_cost: FloatOrd(init.distance(&target)),
        index: 0,
    });
    let mut nodes: IndexMap<u64, SearchNode> = IndexMap::new();
    nodes.insert(
        init.pack(),
        SearchNode {
            cell: init,
            parent: NO_PARENT,
            cost: 0.0,
            settled: false,
        },
    );

    let mut expansions = 0;
    while let Some(CostHolder { index, .. }) = to_see.pop() {
        let (cell, cost) = {
            let (_, node) = match nodes.get_index_mut(index) {
                Some(n) => n,
                None => continue,
            };

            let reached = node.cell == target
                || (goal_accuracy > 0.0 && node.cell.distance(&target) <= goal_accuracy);
            if reached {
                let cost = node.cost;
                let path = if want_path {
                    let mut path: Vec<Pose2> = reverse_path(&nodes, index)
                        .into_iter()
                        .map(|cell| cell.center(&info))
                        .collect();
                    if goal_accuracy > 0.0 {
                        path.push(Pose2::at(goal.x, goal.y));
                    }

                    path
                } else {
                    Vec::new()
                };

                return SearchResult {
                    found: true,
                    path,
                    cost,
                };
            }

            if node.settled {
                continue;
            }
            node.settled = true;

            expansions += 1;
            if expansions > max_expansions {
                break;
            }

            (node.cell, node.cost)
        };

        for &(dx, dy, weight) in SUCCESSORS.iter() {
            let child = cell.offset(dx, dy);
            let key = child.pack();
            if nodes.get(&key).map_or(false, |n| n.settled) {
                continue;
            }

            let p = map.cost(child);
            if p >= MAX_PROBABILITY {
                // Obstacles are settled without ever being entered.
                nodes
                    .entry(key)
                    .or_insert(SearchNode {
                        cell: child,
                        parent: NO_PARENT,
                        cost: f64::INFINITY,
                        settled: true,
                    })
                    .settled = true;
                continue;
            }
            let p = p.max(MIN_PROBABILITY) as f64;

            let child_cost = if p <= 0.5 {
                cost + weight
            } else {
                cost + weight / (1.0 - p)
            };

            let n; // index for child
            match nodes.entry(key) {
                Vacant(e) => {
                    n = e.index();
                    e.insert(SearchNode {
                        cell: child,
                        parent: index,
                        cost: child_cost,
                        settled: false,
                    });
                }
                Occupied(mut e) => {
                    if e.get().cost < child_cost {
                        continue;
                    }
                    let node = e.get_mut();
                    node.parent = index;
                    node.cost = child_cost;
                    n = e.index();
                }
            }

            to_see.push(CostHolder {
                estimated_cost: FloatOrd(child_cost + child.distance(&target)),
                index: n,
            });
        }
    }

    SearchResult::not_found()
}

struct SearchNode {
    cell: GridPoint2,
    parent: usize,
    cost: f64,
    settled: bool,
}

/// Follows parent links from `terminal` back to the start and returns the cells start first.
fn reverse_path(nodes: &IndexMap<u64, SearchNode>, terminal: usize) -> Vec<GridPoint2> {
    let path = itertools::unfold(terminal, |i| {
        nodes.get_index(*i).map(|(_, node)| {
            *i = node.parent;

            node.cell
        })
    })
    .collect::<Vec<GridPoint2>>();

    path.into_iter().rev().collect()
}

struct CostHolder<K> {
    estimated_cost: K,
    index: usize,
}

impl<K: PartialEq> PartialEq for CostHolder<K> {
    fn eq(&self, other: &Self) -> bool {
        self.estimated_cost.eq(&other.estimated_cost)
    }
}

impl<K: PartialEq> Eq for CostHolder<K> {}

impl<K: Ord> PartialOrd for CostHolder<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the `BinaryHeap` pops the lowest estimate first.
impl<K: Ord> Ord for CostHolder<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        other.estimated_cost.cmp(&self.estimated_cost)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
