//! Filesystem implementation of [crate::Storage].
//!
//! Blobs are regular files inside [Config::storage_directory], opened read-only. Reads are
//! positional (`pread` on unix) and never move a shared file cursor, so a single [Blob] can serve
//! reads in any order.

use crate::Error;
use std::{fs::File, io::ErrorKind, path::PathBuf, sync::Arc};
use tracing::debug;

/// Configuration for [Storage].
#[derive(Clone, Debug)]
pub struct Config {
    /// Directory that blob names are resolved against.
    pub storage_directory: PathBuf,
}

impl Config {
    pub fn new(storage_directory: PathBuf) -> Self {
        Self { storage_directory }
    }
}

/// Storage backed by files in a single directory.
#[derive(Clone, Debug)]
pub struct Storage {
    cfg: Config,
}

impl Storage {
    pub fn new(cfg: Config) -> Self {
        Self { cfg }
    }
}

impl crate::Storage for Storage {
    type Blob = Blob;

    fn open(&self, name: &str) -> Result<(Blob, u64), Error> {
        let path = self.cfg.storage_directory.join(name);
        let file = File::open(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => Error::BlobMissing(name.into()),
            _ => Error::BlobOpenFailed(name.into(), err),
        })?;
        let len = file
            .metadata()
            .map_err(|err| Error::BlobOpenFailed(name.into(), err))?
            .len();
        debug!(path = %path.display(), len, "opened blob");
        Ok((
            Blob {
                name: name.into(),
                file: Arc::new(file),
            },
            len,
        ))
    }
}

/// A read-only file.
///
/// Clones share the same file handle, which is released when the last clone is closed or dropped.
#[derive(Clone, Debug)]
pub struct Blob {
    name: String,
    file: Arc<File>,
}

impl Blob {
    /// Name the blob was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn map_read_error(err: std::io::Error) -> Error {
    match err.kind() {
        ErrorKind::UnexpectedEof => Error::BlobInsufficientLength,
        _ => Error::Io(err),
    }
}

impl crate::Blob for Blob {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset).map_err(map_read_error)?;
        }
        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut read = 0;
            while read < buf.len() {
                let position = offset
                    .checked_add(read as u64)
                    .ok_or(Error::OffsetOverflow)?;
                let n = self
                    .file
                    .seek_read(&mut buf[read..], position)
                    .map_err(map_read_error)?;
                if n == 0 {
                    return Err(Error::BlobInsufficientLength);
                }
                read += n;
            }
        }
        Ok(())
    }

    fn close(self) -> Result<(), Error> {
        debug!(name = %self.name, "closed blob");
        Ok(())
    }
}
