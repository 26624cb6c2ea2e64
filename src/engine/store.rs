//! The public store facade.

use std::fs::{self, File};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use super::compactor::Compactor;
use super::shard::Shard;
use super::sharded::ShardedMap;
use super::KvEngine;
use crate::config::Options;
use crate::error::{Result, StoreError};

/// How [`Store::open`] treats the data directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Wipe the directory and create a fresh set of empty shard files.
    Create,
    /// Keep existing shard files, creating missing ones and running recovery
    /// on the ones found on disk.
    Open,
}

impl FromStr for Mode {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Mode> {
        match s {
            "create" => Ok(Mode::Create),
            "open" => Ok(Mode::Open),
            other => Err(StoreError::Parsing(format!(
                "invalid mode '{}', expected 'create' or 'open'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Create => write!(f, "create"),
            Mode::Open => write!(f, "open"),
        }
    }
}

/// A disk-persistent key-value store: `N` shard files, each fronted by an
/// LRU cache, with a background compactor reclaiming tombstoned records.
///
/// `Store` is a cheap clonable handle; clones share the same shards, and the
/// compactor is stopped and joined when the last clone is dropped. All
/// internals stay private — the surface is [`Store::open`] plus the three
/// [`KvEngine`] operations.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

struct StoreInner {
    map: ShardedMap,
    compactor: Compactor,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        self.compactor.stop();
    }
}

impl Store {
    /// Opens a store rooted at `dir`.
    ///
    /// `Mode::Create` wipes `dir` and lays out `options.shard_count` empty
    /// shard files; `Mode::Open` keeps what is there, creating missing files
    /// and truncating any torn trailing record in existing ones before they
    /// serve requests.
    ///
    /// The shard count is fixed at creation; reopening a directory with a
    /// different `shard_count` leaves keys routed to the wrong files, with
    /// undefined visibility.
    pub fn open(dir: impl Into<PathBuf>, mode: Mode, options: Options) -> Result<Store> {
        let dir = dir.into();
        if options.shard_count == 0 {
            return Err(StoreError::InvalidInput(
                "shard count must be at least 1".to_string(),
            ));
        }

        fs::create_dir_all(&dir)?;
        if mode == Mode::Create {
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                if entry.file_type()?.is_dir() {
                    fs::remove_dir_all(entry.path())?;
                } else {
                    fs::remove_file(entry.path())?;
                }
            }
        }

        let mut shards = Vec::with_capacity(options.shard_count);
        for id in 0..options.shard_count {
            let path = dir.join(format!("{}.bkt", id));
            let shard = Shard::new(id, path.clone(), options.cache_capacity);
            match mode {
                Mode::Create => {
                    File::create(&path)?;
                }
                Mode::Open => {
                    if path.exists() {
                        shard.recover()?;
                    } else {
                        File::create(&path)?;
                    }
                }
            }
            shards.push(shard);
        }

        info!(
            "opened store at {:?} ({} mode, {} shards)",
            dir, mode, options.shard_count
        );

        let shards = Arc::new(shards);
        let compactor = Compactor::start(Arc::clone(&shards), options.compaction_interval)?;
        Ok(Store {
            inner: Arc::new(StoreInner {
                map: ShardedMap::new(shards),
                compactor,
            }),
        })
    }
}

impl KvEngine for Store {
    fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.map.insert(key, value)
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.inner.map.get(key)
    }

    fn erase(&self, key: &[u8]) -> Result<bool> {
        self.inner.map.erase(key)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn quick_options(n: usize) -> Options {
        Options::default()
            .shard_count(n)
            .compaction_interval(Duration::from_secs(3600))
    }

    #[test]
    fn create_lays_out_shard_files() {
        let dir = tempfile::tempdir().unwrap();
        let _store = Store::open(dir.path(), Mode::Create, quick_options(8)).unwrap();

        for id in 0..8 {
            let path = dir.path().join(format!("{}.bkt", id));
            assert!(path.exists());
            assert_eq!(fs::metadata(&path).unwrap().len(), 0);
        }
    }

    #[test]
    fn create_wipes_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("stale.txt"), b"junk").unwrap();
        fs::create_dir(dir.path().join("stale-dir")).unwrap();

        let _store = Store::open(dir.path(), Mode::Create, quick_options(2)).unwrap();
        assert!(!dir.path().join("stale.txt").exists());
        assert!(!dir.path().join("stale-dir").exists());
    }

    #[test]
    fn open_preserves_data_across_restarts() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path(), Mode::Create, quick_options(4)).unwrap();
            store.insert(b"persist", b"me").unwrap();
        }
        let store = Store::open(dir.path(), Mode::Open, quick_options(4)).unwrap();
        assert_eq!(store.get(b"persist").unwrap(), Some(b"me".to_vec()));
    }

    #[test]
    fn open_creates_missing_shard_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path(), Mode::Open, quick_options(4)).unwrap();
        for id in 0..4 {
            assert!(dir.path().join(format!("{}.bkt", id)).exists());
        }
        assert_eq!(store.get(b"nothing").unwrap(), None);
    }

    #[test]
    fn open_recovers_torn_shard_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = Store::open(dir.path(), Mode::Create, quick_options(1)).unwrap();
            store.insert(b"k", b"v").unwrap();
        }
        // simulate a crash mid-append
        let path = dir.path().join("0.bkt");
        let mut bytes = fs::read(&path).unwrap();
        let clean_len = bytes.len();
        bytes.extend_from_slice(&[7, 0, 0, 0]);
        fs::write(&path, &bytes).unwrap();

        let store = Store::open(dir.path(), Mode::Open, quick_options(1)).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len() as usize, clean_len);
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn zero_shards_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Store::open(dir.path(), Mode::Create, quick_options(0)).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn mode_parses_from_str() {
        assert_eq!("create".parse::<Mode>().unwrap(), Mode::Create);
        assert_eq!("open".parse::<Mode>().unwrap(), Mode::Open);
        assert!("CREATE".parse::<Mode>().is_err());
    }
}
