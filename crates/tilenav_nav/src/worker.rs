//! A background thread that repeats a task on the latest request it was given.

use crate::{NavError, NavResult};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

/// Work done by a `Worker` once per period.
pub trait Task: Send + 'static {
    type Request: Send + 'static;

    /// Runs one iteration for the newest request. Requests are kept, so this keeps getting called with the same request
    /// until a new one arrives.
    fn step(&mut self, request: &Self::Request);
}

/// Owns the thread running a `Task`. Requests go in through a channel, and the task publishes results however it likes
/// (the workers in this crate use a shared slot).
///
/// The thread exits after `stop` or when the `Worker` is dropped. Neither interrupts a step in progress.
pub struct Worker<R> {
    name: String,
    requests: Option<Sender<R>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<R> Worker<R>
where
    R: Send + 'static,
{
    pub fn spawn<T>(name: &str, period: Duration, task: T) -> NavResult<Self>
    where
        T: Task<Request = R>,
    {
        let (tx, rx) = unbounded();
        let stop = Arc::new(AtomicBool::new(false));

        let thread_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run(task, rx, period, thread_stop))
            .map_err(|source| NavError::Spawn {
                name: name.to_string(),
                source,
            })?;
        info!("started {} worker", name);

        Ok(Self {
            name: name.to_string(),
            requests: Some(tx),
            stop,
            handle: Some(handle),
        })
    }
}

impl<R> Worker<R> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the request the task works on.
    pub fn send(&self, request: R) {
        if let Some(requests) = &self.requests {
            // Only fails once the thread is gone, and then nobody is listening anyway.
            let _ = requests.send(request);
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Asks the thread to exit and waits for it.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.requests = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("{} worker panicked", self.name);
            } else {
                info!("stopped {} worker", self.name);
            }
        }
    }
}

impl<R> Drop for Worker<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<T: Task>(mut task: T, requests: Receiver<T::Request>, period: Duration, stop: Arc<AtomicBool>) {
    let mut latest = None;
    while !stop.load(Ordering::Acquire) {
        loop {
            match requests.try_recv() {
                Ok(request) => latest = Some(request),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("request channel closed");
                    return;
                }
            }
        }

        if let Some(request) = &latest {
            task.step(request);
        }

        thread::sleep(period);
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝
