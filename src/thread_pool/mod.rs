//! This module provides the thread pools that drive client sessions.
use crate::Result;

/// A trait for a pool of worker threads that jobs can be handed to.
pub trait ThreadPool {
    /// Creates a new pool with `threads` workers.
    ///
    /// # Errors
    /// Returns an error if any worker thread fails to start.
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Runs `job` on one of the pool's workers.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

mod naive;
mod rayon_pool;
mod shared_queue;

pub use self::naive::NaiveThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
