//! Hash routing of keys onto shards.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::shard::Shard;
use crate::error::Result;

/// Owns the shard array and routes every operation to `H(key) mod N`.
///
/// `DefaultHasher::new()` uses fixed SipHash keys, so a key maps to the same
/// shard for the lifetime of the process (and across restarts with the same
/// shard count). There is no cross-shard coordination of any kind.
pub(crate) struct ShardedMap {
    shards: Arc<Vec<Shard>>,
}

impl ShardedMap {
    pub(crate) fn new(shards: Arc<Vec<Shard>>) -> ShardedMap {
        ShardedMap { shards }
    }

    fn shard(&self, key: &[u8]) -> &Shard {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    pub(crate) fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.shard(key).insert(key, value)
    }

    pub(crate) fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.shard(key).get(key)
    }

    pub(crate) fn erase(&self, key: &[u8]) -> Result<bool> {
        self.shard(key).erase(key)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::*;

    fn build_map(dir: &Path, n: usize) -> ShardedMap {
        let mut shards = Vec::with_capacity(n);
        for id in 0..n {
            let path = dir.join(format!("{}.bkt", id));
            fs::File::create(&path).unwrap();
            shards.push(Shard::new(id, path, 4));
        }
        ShardedMap::new(Arc::new(shards))
    }

    #[test]
    fn routing_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let map = build_map(dir.path(), 8);
        for i in 0..64u32 {
            let key = format!("key{}", i);
            assert_eq!(
                map.shard(key.as_bytes()).id(),
                map.shard(key.as_bytes()).id()
            );
        }
    }

    #[test]
    fn operations_reach_the_owning_shard() {
        let dir = tempfile::tempdir().unwrap();
        let map = build_map(dir.path(), 8);

        map.insert(b"foo", b"bar").unwrap();
        assert_eq!(map.get(b"foo").unwrap(), Some(b"bar".to_vec()));
        assert!(map.erase(b"foo").unwrap());
        assert_eq!(map.get(b"foo").unwrap(), None);
    }

    #[test]
    fn single_shard_behaves_as_unsharded_log() {
        let dir = tempfile::tempdir().unwrap();
        let map = build_map(dir.path(), 1);

        for i in 0..32u32 {
            map.insert(format!("k{}", i).as_bytes(), &i.to_le_bytes())
                .unwrap();
        }
        for i in 0..32u32 {
            assert_eq!(
                map.get(format!("k{}", i).as_bytes()).unwrap(),
                Some(i.to_le_bytes().to_vec())
            );
        }
    }
}
