use crate::{NavResult, RouteConfig, Task, Worker};

use tilenav_core::Pose2;
use tilenav_search::{CostMap, Route, RouteOptimizer};

use auto_impl::auto_impl;
use parking_lot::Mutex;
use std::sync::Arc;

/// Something that orders waypoints, usually in the background. `route` is `None` until the order for the waypoints last
/// passed to `set` is known.
#[auto_impl(&mut, Box)]
pub trait RouteSource {
    fn set(&mut self, waypoints: Vec<Pose2>);

    fn route(&self) -> Option<Route>;
}

#[derive(Debug, Default)]
struct RouteSlot {
    waypoints: Vec<Pose2>,
    route: Option<Route>,
}

/// Runs `RouteOptimizer` passes in a background thread. Passes repeat while the waypoints stay the same, so the order keeps
/// up with changes to the map.
pub struct RouteWorker {
    worker: Worker<Vec<Pose2>>,
    slot: Arc<Mutex<RouteSlot>>,
}

impl RouteWorker {
    /// The worker owns `map`, so it should be a `TileStore` of its own.
    pub fn spawn<M>(map: M, config: &RouteConfig) -> NavResult<Self>
    where
        M: CostMap + Send + 'static,
    {
        let slot = Arc::new(Mutex::new(RouteSlot::default()));
        let task = RouteTask {
            map,
            accuracy: config.accuracy,
            optimizer: RouteOptimizer::new(),
            slot: Arc::clone(&slot),
        };
        let worker = Worker::spawn("route", config.period(), task)?;

        Ok(Self { worker, slot })
    }

    /// Sets the waypoints to order. The first and last stay in place. Fewer than 2 waypoints idles the worker.
    pub fn set(&self, waypoints: Vec<Pose2>) {
        {
            let mut slot = self.slot.lock();
            if slot.waypoints == waypoints {
                return;
            }
            slot.waypoints = waypoints.clone();
            slot.route = None;
        }
        self.worker.send(waypoints);
    }

    /// The best order of the current waypoints, if a pass over them has finished and found one.
    pub fn route(&self) -> Option<Route> {
        self.slot.lock().route.clone()
    }

    pub fn stop(&mut self) {
        self.worker.stop();
    }
}

impl RouteSource for RouteWorker {
    fn set(&mut self, waypoints: Vec<Pose2>) {
        RouteWorker::set(self, waypoints)
    }

    fn route(&self) -> Option<Route> {
        RouteWorker::route(self)
    }
}

struct RouteTask<M> {
    map: M,
    accuracy: f64,
    optimizer: RouteOptimizer,
    slot: Arc<Mutex<RouteSlot>>,
}

impl<M> Task for RouteTask<M>
where
    M: CostMap + Send + 'static,
{
    type Request = Vec<Pose2>;

    fn step(&mut self, waypoints: &Vec<Pose2>) {
        if waypoints.len() < 2 {
            return;
        }

        let route = self
            .optimizer
            .optimize(&mut self.map, waypoints, self.accuracy);

        let mut slot = self.slot.lock();
        if slot.waypoints == *waypoints {
            slot.route = route;
        }
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
