//! Store tuning knobs.

use std::time::Duration;

/// Tunable parameters for a [`Store`](crate::Store).
///
/// The defaults match the shipped server configuration: 512 shards, a
/// 64-entry cache per shard, and a compaction pass every 30 seconds.
#[derive(Debug, Clone)]
pub struct Options {
    /// number of shard files and per-shard locks; fixed once a store is created
    pub shard_count: usize,
    /// per-shard LRU cache capacity in entries
    pub cache_capacity: usize,
    /// sleep between background compaction passes
    pub compaction_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            shard_count: 512,
            cache_capacity: 64,
            compaction_interval: Duration::from_secs(30),
        }
    }
}

impl Options {
    /// Sets the number of shards.
    pub fn shard_count(mut self, shard_count: usize) -> Self {
        self.shard_count = shard_count;
        self
    }

    /// Sets the per-shard cache capacity.
    pub fn cache_capacity(mut self, cache_capacity: usize) -> Self {
        self.cache_capacity = cache_capacity;
        self
    }

    /// Sets the interval between compaction passes.
    pub fn compaction_interval(mut self, interval: Duration) -> Self {
        self.compaction_interval = interval;
        self
    }
}
