use std::thread;

use super::ThreadPool;
use crate::Result;

/// Not actually a pool: starts a fresh OS thread for every job. Useful as a
/// baseline when measuring the real pools.
pub struct NaiveThreadPool;

impl ThreadPool for NaiveThreadPool {
    fn new(_threads: u32) -> Result<Self> {
        Ok(NaiveThreadPool)
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        thread::spawn(job);
    }
}
