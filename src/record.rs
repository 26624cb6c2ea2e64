//! On-disk record layout for shard files.
//!
//! A shard file is a concatenation of records:
//!
//! ```text
//! [ key_len: i32 LE | value_len: i32 LE | deleted: u8 | key bytes | value bytes ]
//! ```
//!
//! The tombstone byte is the only part of a record that is ever rewritten in
//! place; everything else is append-only.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Result, StoreError};

/// Size in bytes of a record header (two i32 lengths plus the tombstone byte).
pub const HEADER_LEN: u64 = 9;

/// Byte offset of the tombstone flag within a record header.
pub const DELETED_OFFSET: u64 = 8;

/// The fixed-size header preceding every record's key and value bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    /// length of the key in bytes; negative only in corrupt files
    pub key_len: i32,
    /// length of the value in bytes; negative only in corrupt files
    pub value_len: i32,
    /// tombstone flag, nonzero means logically deleted
    pub deleted: bool,
}

impl RecordHeader {
    /// Builds a live (non-tombstoned) header for the given key and value,
    /// rejecting lengths that do not fit the on-disk i32 fields.
    pub fn for_entry(key: &[u8], value: &[u8]) -> Result<RecordHeader> {
        let key_len = i32::try_from(key.len())
            .map_err(|_| StoreError::InvalidInput(format!("key too large: {} bytes", key.len())))?;
        let value_len = i32::try_from(value.len()).map_err(|_| {
            StoreError::InvalidInput(format!("value too large: {} bytes", value.len()))
        })?;
        Ok(RecordHeader {
            key_len,
            value_len,
            deleted: false,
        })
    }

    /// Reads the next header from `reader`.
    ///
    /// Returns `Ok(None)` on a clean end of file (zero bytes available) and
    /// `StoreError::Corrupt` if the file ends partway through a header.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<RecordHeader>> {
        let mut buf = [0u8; HEADER_LEN as usize];
        let mut filled = 0;
        while filled < buf.len() {
            match reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < buf.len() {
            return Err(StoreError::Corrupt("truncated record header".to_string()));
        }

        let mut cursor = &buf[..];
        let key_len = cursor.read_i32::<LittleEndian>()?;
        let value_len = cursor.read_i32::<LittleEndian>()?;
        let deleted = cursor.read_u8()? != 0;
        Ok(Some(RecordHeader {
            key_len,
            value_len,
            deleted,
        }))
    }

    /// Serializes the header into `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.key_len)?;
        writer.write_i32::<LittleEndian>(self.value_len)?;
        writer.write_u8(self.deleted as u8)?;
        Ok(())
    }

    /// Returns the key and value lengths as usize, or `Corrupt` if either is
    /// negative. Used on every scan so a damaged header cannot drive a seek
    /// backwards.
    pub fn lens(&self) -> Result<(usize, usize)> {
        if self.key_len < 0 || self.value_len < 0 {
            return Err(StoreError::Corrupt(format!(
                "negative record length: key_len={} value_len={}",
                self.key_len, self.value_len
            )));
        }
        Ok((self.key_len as usize, self.value_len as usize))
    }
}
