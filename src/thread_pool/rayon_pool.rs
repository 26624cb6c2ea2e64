use tracing::debug;

use super::ThreadPool;
use crate::error::StoreError;
use crate::Result;

/// A thread pool that delegates to the work-stealing pool from the
/// [`rayon`](https://docs.rs/rayon) library.
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized,
    {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .build()
            .map_err(|e| StoreError::InvalidInput(format!("could not build thread pool: {}", e)))?;
        debug!("created rayon pool with {} threads", threads);

        Ok(Self { pool })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.pool.spawn(job);
    }
}
