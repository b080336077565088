use crate::{NavResult, PathSource, Task, Worker, WorkerConfig};

use tilenav_core::Pose2;
use tilenav_search::{astar_search, CostMap};

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchRequest {
    pub begin: Pose2,
    pub end: Pose2,
}

impl SearchRequest {
    fn is_idle(&self) -> bool {
        self.begin.same_position(&self.end)
    }
}

/// What the foreground currently asks for, and the newest path for it.
#[derive(Debug, Default)]
struct PathSlot {
    end: Pose2,
    idle: bool,
    path: Vec<Pose2>,
}

/// Searches for a path from `begin` to `end` over and over in a background thread, so the path follows changes to the map
/// and the vehicle's position.
pub struct SearchWorker {
    worker: Worker<SearchRequest>,
    slot: Arc<Mutex<PathSlot>>,
}

impl SearchWorker {
    /// Starts searching `map` with the given goal accuracy. The worker owns `map`, so it should be a `TileStore` of its own.
    pub fn spawn<M>(map: M, accuracy: f64, config: &WorkerConfig) -> NavResult<Self>
    where
        M: CostMap + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(PathSlot {
            idle: true,
            ..Default::default()
        }));
        let task = SearchTask {
            map,
            accuracy,
            slot: Arc::clone(&slot),
        };
        let worker = Worker::spawn("search", config.period(), task)?;

        Ok(Self { worker, slot })
    }

    /// Sets the endpoints to search between. Setting `begin == end` idles the worker.
    ///
    /// The published path is dropped when the goal changes, so `path` never returns a path to an old goal. A new `begin`
    /// alone keeps it, since the old path is still useful until the next search finishes.
    pub fn set(&self, begin: Pose2, end: Pose2) {
        let request = SearchRequest { begin, end };
        {
            let mut slot = self.slot.lock();
            if !slot.end.same_position(&end) || request.is_idle() {
                slot.path.clear();
            }
            slot.end = end;
            slot.idle = request.is_idle();
        }
        self.worker.send(request);
    }

    /// The newest path, from the start cell to the goal. Empty while nothing has been found.
    pub fn path(&self) -> Vec<Pose2> {
        self.slot.lock().path.clone()
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

impl PathSource for SearchWorker {
    fn set(&mut self, begin: Pose2, end: Pose2) {
        SearchWorker::set(self, begin, end)
    }

    fn path(&self) -> Vec<Pose2> {
        SearchWorker::path(self)
    }
}

struct SearchTask<M> {
    map: M,
    accuracy: f64,
    slot: Arc<Mutex<PathSlot>>,
}

impl<M> Task for SearchTask<M>
where
    M: CostMap + Send + 'static,
{
    type Request = SearchRequest;

    fn step(&mut self, request: &SearchRequest) {
        self.map.refresh();
        if request.is_idle() {
            return;
        }

        let result = astar_search(
            &mut self.map,
            &request.begin,
            &request.end,
            true,
            self.accuracy,
        );
        if result.found {
            debug!(
                "path of {} poses to ({}, {}) costs {}",
                result.path.len(),
                request.end.x,
                request.end.y,
                result.cost
            );
        } else {
            warn!(
                "no path from ({}, {}) to ({}, {})",
                request.begin.x, request.begin.y, request.end.x, request.end.y
            );
        }

        let mut slot = self.slot.lock();
        if slot.end.same_position(&request.end) && !slot.idle {
            slot.path = result.path;
        } else {
            slot.path.clear();
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

    use std::thread;
    use std::time::{Duration, Instant};
    use utilities::data_sets::{open_field, open_store, paint_cost_grid};

    const FAST: WorkerConfig = WorkerConfig { period_ms: 1 };

    fn wait_for_path(worker: &SearchWorker) -> Vec<Pose2> {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            let path = worker.path();
            if !path.is_empty() {
                return path;
            }
            thread::sleep(Duration::from_millis(1));
        }

        Vec::new()
    }

    #[test]
    fn publishes_a_path_to_the_goal() {
        let backend = open_field(16);
        let mut worker = SearchWorker::spawn(open_store(&backend, 16), 1.5, &FAST).unwrap();

        let goal = Pose2::at(10.5, 4.5);
        worker.set(Pose2::at(0.5, 0.5), goal);
        let path = wait_for_path(&worker);

        assert_eq!(path.first(), Some(&Pose2::at(0.5, 0.5)));
        assert_eq!(path.last(), Some(&goal));

        // A new start keeps the old path around.
        worker.set(Pose2::at(1.5, 0.5), goal);
        assert!(!worker.path().is_empty());

        worker.stop();
    }

    #[test]
    fn changing_or_idling_the_goal_drops_the_path() {
        let backend = open_field(16);
        let mut worker = SearchWorker::spawn(open_store(&backend, 16), 0.0, &FAST).unwrap();

        worker.set(Pose2::at(0.5, 0.5), Pose2::at(8.5, 8.5));
        assert!(!wait_for_path(&worker).is_empty());

        worker.set(Pose2::at(0.5, 0.5), Pose2::at(3.5, 9.5));
        assert_eq!(wait_for_path(&worker).last(), Some(&Pose2::at(3.5, 9.5)));

        worker.set(Pose2::at(2.5, 2.5), Pose2::at(2.5, 2.5));
        assert!(worker.path().is_empty());
        thread::sleep(Duration::from_millis(20));
        assert!(worker.path().is_empty());

        worker.stop();
    }

    #[test]
    fn new_goal_hides_the_old_path() {
        let backend = open_field(16);
        let mut worker = SearchWorker::spawn(open_store(&backend, 16), 0.0, &FAST).unwrap();

        worker.set(Pose2::at(0.5, 0.5), Pose2::at(8.5, 8.5));
        assert!(!wait_for_path(&worker).is_empty());
        worker.stop();

        // Nothing runs anymore, so only `set` touches the published path.
        worker.set(Pose2::at(1.5, 1.5), Pose2::at(8.5, 8.5));
        assert!(!worker.path().is_empty());
        worker.set(Pose2::at(1.5, 1.5), Pose2::at(2.5, 8.5));
        assert!(worker.path().is_empty());
    }

    #[test]
    fn blocked_goal_publishes_nothing_and_still_stops() {
        let backend = open_field(8);
        paint_cost_grid(&backend, &["", "", "", "   #"]);
        let mut worker = SearchWorker::spawn(open_store(&backend, 16), 0.0, &FAST).unwrap();

        worker.set(Pose2::at(0.5, 0.5), Pose2::at(3.5, 3.5));
        thread::sleep(Duration::from_millis(20));
        assert!(worker.path().is_empty());

        worker.stop();
    }
}
