//! Random access to the record table of a shapefile index (`.shx`).
//!
//! An index file locates every record of its main (`.shp`) file without scanning it. Records are
//! addressed by their zero-based position, and each lookup returns where the record starts in the
//! main file and how long its content is.
//!
//! # Format
//!
//! The file starts with the [header](crate::header) shared with the main file, followed by one
//! fixed-size [Entry] per record:
//!
//! ```text
//! +--------+-----------+-----------+-----------+-----------+-----+-------------+-------------+
//! | header | offset_0  | length_0  | offset_1  | length_1  | ... | offset_n-1  | length_n-1  |
//! +--------+-----------+-----------+-----------+-----------+-----+-------------+-------------+
//!   100 B    i32 (BE)    i32 (BE)    i32 (BE)    i32 (BE)          i32 (BE)      i32 (BE)
//!
//! n = (file_length * 2 - 100) / 8
//! ```
//!
//! Both values of an entry are stored in 16-bit words. Entry `i` always occupies bytes
//! `[100 + 8i, 108 + 8i)`, so it can be read without touching any other entry.
//!
//! # Units
//!
//! [IndexFile::offset] returns the stored offset multiplied by two and [IndexFile::offset_in_bytes]
//! multiplies that again by two. [IndexFile::content_length] returns the stored length unchanged.
//! Consumers of the main file rely on exactly this arithmetic, asymmetry included.
//!
//! # Caching
//!
//! The most recently read entry is kept in memory, and entries are read through a
//! [buffer](shapeidx_runtime::buffer::Read) of [Config::read_buffer] bytes. Looking up the same
//! record repeatedly performs no I/O, and iterating records in order reads the blob once per
//! buffer-full of entries.
//!
//! # Bounds
//!
//! Lookups at or beyond [IndexFile::record_count] fail with [Error::IndexOutOfRange] before any
//! I/O, even if the blob holds more bytes than the header declares.
//!
//! # Lifecycle
//!
//! [IndexFile::close] releases the blob. Every lookup after it fails with [Error::Closed], cached
//! entry included. Dropping an [IndexFile] releases the blob as well.
//!
//! # Concurrency
//!
//! Lookups take `&mut self` because they update the cache and the read buffer. To read one index
//! from several threads, open one [IndexFile] per thread.
//!
//! # Example
//!
//! ```rust
//! use shapeidx_runtime::{memory, Storage};
//! use shapeidx_storage::{header::Log, index::{Config, IndexFile}};
//!
//! // A header declaring 54 words (one entry), followed by that entry.
//! let mut raw = vec![0u8; 100];
//! raw[..4].copy_from_slice(&9994i32.to_be_bytes());
//! raw[24..28].copy_from_slice(&54i32.to_be_bytes());
//! raw[28..32].copy_from_slice(&1000i32.to_le_bytes());
//! raw[32..36].copy_from_slice(&1i32.to_le_bytes());
//! raw.extend_from_slice(&50i32.to_be_bytes());
//! raw.extend_from_slice(&10i32.to_be_bytes());
//!
//! let storage = memory::Storage::default();
//! storage.insert("points.shx", raw);
//!
//! let mut index = IndexFile::open(&storage, "points.shx", Config::default(), &mut Log).unwrap();
//! assert_eq!(index.record_count(), 1);
//! assert_eq!(index.offset(0).unwrap(), 100);
//! assert_eq!(index.offset_in_bytes(0).unwrap(), 200);
//! assert_eq!(index.content_length(0).unwrap(), 10);
//! index.close().unwrap();
//! ```

mod metrics;
mod storage;

pub use metrics::Metrics;
pub use storage::{Entries, IndexFile};

use bytes::Buf;
use shapeidx_runtime::{Error as RError, NZUsize};
use std::num::NonZeroUsize;
use thiserror::Error;

/// Errors that can occur when interacting with an [IndexFile].
#[derive(Debug, Error)]
pub enum Error {
    #[error("runtime error: {0}")]
    Runtime(#[from] RError),
    #[error("truncated header: only {0} bytes available")]
    TruncatedHeader(u64),
    #[error("closed")]
    Closed,
    #[error("index out of range: {index} >= {count}")]
    IndexOutOfRange { index: u32, count: u32 },
}

/// Default size of the read buffer: 128 entries.
pub const DEFAULT_READ_BUFFER: NonZeroUsize = NZUsize!(Entry::SIZE * 128);

/// Configuration for [IndexFile].
#[derive(Clone, Debug)]
pub struct Config {
    /// The size of the buffer used to read entries from the blob.
    pub read_buffer: NonZeroUsize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            read_buffer: DEFAULT_READ_BUFFER,
        }
    }
}

/// A single record-table entry, as stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Stored offset, in 16-bit words.
    pub stored_offset: i32,
    /// Stored content length, in 16-bit words.
    pub stored_length: i32,
}

impl Entry {
    /// Size of an encoded entry in bytes.
    pub const SIZE: usize = 8;

    /// Decode an entry from its big-endian representation.
    pub fn decode(raw: &[u8; Self::SIZE]) -> Self {
        let mut buf = &raw[..];
        Self {
            stored_offset: buf.get_i32(),
            stored_length: buf.get_i32(),
        }
    }

    /// Offset as returned by [IndexFile::offset]: the stored value times two.
    pub fn offset(&self) -> i64 {
        i64::from(self.stored_offset) * 2
    }

    /// Offset as returned by [IndexFile::offset_in_bytes]: the stored value times four.
    pub fn offset_in_bytes(&self) -> i64 {
        self.offset() * 2
    }

    /// Content length as returned by [IndexFile::content_length]: the stored value.
    pub fn content_length(&self) -> i32 {
        self.stored_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_entry_decode() {
        let entry = Entry::decode(&[0, 0, 0, 50, 0, 0, 0, 8]);
        assert_eq!(
            entry,
            Entry {
                stored_offset: 50,
                stored_length: 8,
            }
        );
        assert_eq!(entry.offset(), 100);
        assert_eq!(entry.offset_in_bytes(), 200);
        assert_eq!(entry.content_length(), 8);
    }

    #[test_case(0, 0, 0; "zero")]
    #[test_case(50, 100, 200; "first record")]
    #[test_case(i32::MAX, 4_294_967_294, 8_589_934_588; "max offset stays exact")]
    #[test_case(-1, -2, -4; "negative offset is scaled as stored")]
    fn test_entry_units(stored: i32, offset: i64, offset_in_bytes: i64) {
        let entry = Entry {
            stored_offset: stored,
            stored_length: stored,
        };
        assert_eq!(entry.offset(), offset);
        assert_eq!(entry.offset_in_bytes(), offset_in_bytes);
        assert_eq!(entry.content_length(), stored);
    }

    #[test]
    fn test_default_config() {
        assert_eq!(Config::default().read_buffer.get(), 1024);
    }
}
