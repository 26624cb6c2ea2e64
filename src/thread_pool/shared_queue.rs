use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use tracing::{debug, error};

use super::ThreadPool;
use crate::Result;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A thread pool built on a shared job queue.
///
/// The queue is a crossbeam MPMC channel used as single producer (the pool
/// handle) and multiple consumers (the workers). A worker that panics while
/// running a job is replaced, so a misbehaving session cannot shrink the
/// pool. This is the pool the server uses unless told otherwise.
pub struct SharedQueueThreadPool {
    /// the sending half of the job queue
    job_tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self> {
        let (job_tx, job_rx) = channel::unbounded::<Job>();
        for _ in 0..threads {
            let worker = Worker(job_rx.clone());
            thread::Builder::new().spawn(move || run_jobs(worker))?;
        }
        Ok(SharedQueueThreadPool { job_tx })
    }

    /// Queues a job for the next free worker.
    ///
    /// # Panics
    /// Panics if every worker has died and could not be respawned.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.job_tx
            .send(Box::new(job))
            .expect("there are no workers left in the pool");
    }
}

/// The receiving half of the queue, owned by one worker thread.
///
/// Its `Drop` impl is the panic recovery: when a worker unwinds out of a
/// job, the receiver is dropped mid-panic and starts a replacement worker
/// with a clone of the same queue.
#[derive(Clone)]
struct Worker(Receiver<Job>);

impl Drop for Worker {
    fn drop(&mut self) {
        if thread::panicking() {
            debug!("worker panicked, spawning a replacement");
            let worker = self.clone();
            if let Err(e) = thread::Builder::new().spawn(move || run_jobs(worker)) {
                error!("failed to spawn replacement worker: {}", e);
            }
        }
    }
}

/// Pulls jobs off the queue until the pool handle is dropped.
fn run_jobs(worker: Worker) {
    while let Ok(job) = worker.0.recv() {
        job();
    }
    debug!("worker exiting, pool was dropped");
}
