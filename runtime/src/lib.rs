//! Read fixed-layout binary files through a blocking, positional I/O seam.
//!
//! This crate provides the [Storage] and [Blob] traits used by format readers to open files and
//! read byte ranges at arbitrary offsets. For production use, the [fs] module provides an
//! implementation backed by the local filesystem. For testing, the [memory] module provides an
//! implementation backed by named in-memory buffers.
//!
//! Readers that issue many small reads should wrap a [Blob] in a [buffer::Read], which serves
//! reads from a fixed-size window and only touches the [Blob] when a read falls outside of it.
//!
//! # Status
//!
//! `shapeidx-runtime` is **ALPHA** software and is not yet recommended for production use. Developers should
//! expect breaking changes and occasional instability.

use std::io::Error as IoError;
use thiserror::Error;

pub mod buffer;
pub mod fs;
pub mod memory;

/// Errors that can occur when interacting with the runtime.
#[derive(Error, Debug)]
pub enum Error {
    #[error("read failed")]
    ReadFailed,
    #[error("blob open failed: {0} error: {1}")]
    BlobOpenFailed(String, IoError),
    #[error("blob missing: {0}")]
    BlobMissing(String),
    #[error("blob insufficient length")]
    BlobInsufficientLength,
    #[error("offset overflow")]
    OffsetOverflow,
    #[error("io error: {0}")]
    Io(#[from] IoError),
}

/// Interface to open named [Blob]s.
pub trait Storage {
    /// The readable blob type returned by [Storage::open].
    type Blob: Blob;

    /// Open an existing blob with the given name for reading.
    ///
    /// Returns the blob and its length in bytes.
    fn open(&self, name: &str) -> Result<(Self::Blob, u64), Error>;
}

/// Interface to read a storage object at arbitrary offsets.
///
/// All calls block until they complete. Implementations perform no internal locking beyond what is
/// needed to share the underlying object; callers that need concurrent access should open one
/// [Blob] per thread.
pub trait Blob {
    /// Read from the blob at the given offset.
    ///
    /// `read_at` does not return the number of bytes read because it
    /// only returns once the entire buffer has been filled. If the blob ends
    /// before `buf` is full, [Error::BlobInsufficientLength] is returned.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error>;

    /// Release the blob.
    ///
    /// Dropping a blob also releases it, but only `close` surfaces errors.
    fn close(self) -> Result<(), Error>;
}

/// Create a [std::num::NonZeroUsize] from a literal, panicking (at compile time when used in a
/// `const`) if it is zero.
#[macro_export]
macro_rules! NZUsize {
    ($val:expr) => {
        match ::std::num::NonZeroUsize::new($val) {
            Some(value) => value,
            None => panic!("value must be non-zero"),
        }
    };
}
