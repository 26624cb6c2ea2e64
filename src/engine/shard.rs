//! One shard: an append-only record file fronted by a bounded LRU cache.
//!
//! The readers-writer discipline lives in the type system: scanning methods
//! on [`ShardFile`] take `&self` and run under the shard's read lock, while
//! anything that mutates the file takes `&mut self` and runs under the write
//! lock. The cache sits outside the `RwLock` because it carries its own spin
//! mutex, which is what makes cache fills on the read path sound.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::sync::RwLock;

use tracing::warn;

use crate::cache::LruCache;
use crate::error::Result;
use crate::record::{RecordHeader, DELETED_OFFSET, HEADER_LEN};

/// A single partition of the key space: one log file, one cache, one lock.
pub struct Shard {
    id: usize,
    cache: LruCache,
    log: RwLock<ShardFile>,
}

impl Shard {
    pub(crate) fn new(id: usize, path: PathBuf, cache_capacity: usize) -> Shard {
        Shard {
            id,
            cache: LruCache::new(cache_capacity),
            log: RwLock::new(ShardFile { path }),
        }
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    /// Writes `key` -> `value`, tombstoning any earlier live record for the
    /// same key before appending the new one.
    pub fn insert(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let mut log = self.log.write()?;
        self.cache.put(key, value);
        log.upsert(key, value)
    }

    /// Looks `key` up in the cache, then in the log file. A disk hit is
    /// written back into the cache before returning.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let log = self.log.read()?;
        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value));
        }
        match log.find(key)? {
            Some(value) => {
                self.cache.put(key, &value);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Tombstones the live record for `key`, if any.
    ///
    /// Returns `true` iff a record was tombstoned.
    pub fn erase(&self, key: &[u8]) -> Result<bool> {
        let mut log = self.log.write()?;
        self.cache.remove(key);
        log.tombstone(key)
    }

    /// Rewrites the log file to contain only live records, preserving their
    /// order, then truncates it. Holds the shard exclusively throughout.
    pub fn compact(&self) -> Result<()> {
        let mut log = self.log.write()?;
        log.compact()
    }

    /// Truncates the log file after its longest well-formed prefix of
    /// records. Run once before a pre-existing shard serves requests.
    pub(crate) fn recover(&self) -> Result<()> {
        let mut log = self.log.write()?;
        log.recover()
    }
}

/// The on-disk half of a shard. Holds no open handle; every operation opens
/// the file, works, and drops the handle, like the flat scans it performs.
struct ShardFile {
    path: PathBuf,
}

impl ShardFile {
    /// Scans for the first live record matching `key` and returns its value.
    fn find(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        loop {
            let header = match RecordHeader::read_from(&mut reader)? {
                Some(header) => header,
                None => return Ok(None),
            };
            let (key_len, value_len) = header.lens()?;
            if header.deleted || key_len != key.len() {
                reader.seek_relative((key_len + value_len) as i64)?;
                continue;
            }

            let mut current_key = vec![0u8; key_len];
            reader.read_exact(&mut current_key)?;
            if current_key == key {
                let mut value = vec![0u8; value_len];
                reader.read_exact(&mut value)?;
                return Ok(Some(value));
            }
            reader.seek_relative(value_len as i64)?;
        }
    }

    /// Tombstones any earlier live record for `key`, then appends a fresh
    /// record at the end of the file.
    ///
    /// Scanning uses a buffered read handle; the tombstone byte and the
    /// appended record go through a separate write handle, so the two file
    /// cursors never interfere.
    fn upsert(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let header = RecordHeader::for_entry(key, value)?;

        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut writer = OpenOptions::new().write(true).open(&self.path)?;

        let mut pos: u64 = 0;
        loop {
            let current = match RecordHeader::read_from(&mut reader)? {
                Some(current) => current,
                None => break,
            };
            let (key_len, value_len) = current.lens()?;
            let body = (key_len + value_len) as u64;
            if current.deleted || key_len != key.len() {
                reader.seek_relative(body as i64)?;
                pos += HEADER_LEN + body;
                continue;
            }

            let mut current_key = vec![0u8; key_len];
            reader.read_exact(&mut current_key)?;
            if current_key == key {
                writer.seek(SeekFrom::Start(pos + DELETED_OFFSET))?;
                writer.write_all(&[1])?;
            }
            reader.seek_relative(value_len as i64)?;
            pos += HEADER_LEN + body;
        }

        let mut record = Vec::with_capacity(HEADER_LEN as usize + key.len() + value.len());
        header.write_to(&mut record)?;
        record.extend_from_slice(key);
        record.extend_from_slice(value);
        writer.seek(SeekFrom::End(0))?;
        writer.write_all(&record)?;
        Ok(())
    }

    /// Marks the live record for `key` deleted, if one exists.
    fn tombstone(&mut self, key: &[u8]) -> Result<bool> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut pos: u64 = 0;
        loop {
            let header = match RecordHeader::read_from(&mut reader)? {
                Some(header) => header,
                None => return Ok(false),
            };
            let (key_len, value_len) = header.lens()?;
            let body = (key_len + value_len) as u64;
            if header.deleted || key_len != key.len() {
                reader.seek_relative(body as i64)?;
                pos += HEADER_LEN + body;
                continue;
            }

            let mut current_key = vec![0u8; key_len];
            reader.read_exact(&mut current_key)?;
            if current_key == key {
                let mut writer = OpenOptions::new().write(true).open(&self.path)?;
                writer.seek(SeekFrom::Start(pos + DELETED_OFFSET))?;
                writer.write_all(&[1])?;
                return Ok(true);
            }
            reader.seek_relative(value_len as i64)?;
            pos += HEADER_LEN + body;
        }
    }

    /// In-place compaction: copies each live record down to `write_pos`,
    /// skips tombstoned ones, then truncates the file. `write_pos` never
    /// passes `read_pos`, so unread bytes are never overwritten.
    fn compact(&mut self) -> Result<()> {
        let mut reader = BufReader::new(File::open(&self.path)?);
        let mut writer = OpenOptions::new().write(true).open(&self.path)?;

        let mut write_pos: u64 = 0;
        loop {
            let header = match RecordHeader::read_from(&mut reader)? {
                Some(header) => header,
                None => break,
            };
            let (key_len, value_len) = header.lens()?;
            if header.deleted {
                reader.seek_relative((key_len + value_len) as i64)?;
                continue;
            }

            let mut payload = vec![0u8; key_len + value_len];
            reader.read_exact(&mut payload)?;

            let mut record = Vec::with_capacity(HEADER_LEN as usize + payload.len());
            header.write_to(&mut record)?;
            record.extend_from_slice(&payload);
            writer.seek(SeekFrom::Start(write_pos))?;
            writer.write_all(&record)?;
            write_pos += record.len() as u64;
        }

        writer.set_len(write_pos)?;
        Ok(())
    }

    /// Walks the file accepting records whose header parses, whose lengths
    /// are non-negative and whose footprint fits within the file, then
    /// truncates at the first rejected record. Idempotent.
    fn recover(&mut self) -> Result<()> {
        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        let mut pos: u64 = 0;
        let valid_prefix = loop {
            if file_size - pos < HEADER_LEN {
                break pos;
            }
            let header = match RecordHeader::read_from(&mut reader)? {
                Some(header) => header,
                None => break pos,
            };
            if header.key_len < 0 || header.value_len < 0 {
                break pos;
            }
            let body = header.key_len as u64 + header.value_len as u64;
            if pos + HEADER_LEN + body > file_size {
                break pos;
            }
            reader.seek_relative(body as i64)?;
            pos += HEADER_LEN + body;
        };

        if valid_prefix < file_size {
            warn!(
                "recovery truncating {:?} from {} to {} bytes",
                self.path, file_size, valid_prefix
            );
            let writer = OpenOptions::new().write(true).open(&self.path)?;
            writer.set_len(valid_prefix)?;
        }
        Ok(())
    }
}
