//! In-memory implementation of [crate::Storage].

use crate::Error;
use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

/// In-memory storage holding named, immutable blobs.
///
/// Cloning a [Storage] shares the same set of blobs.
#[derive(Clone, Default)]
pub struct Storage {
    blobs: Arc<RwLock<BTreeMap<String, Arc<Vec<u8>>>>>,
}

impl Storage {
    /// Store `content` under `name`, replacing any previous blob with that name.
    ///
    /// Blobs that are already open keep reading the content they were opened with.
    pub fn insert(&self, name: &str, content: impl Into<Vec<u8>>) {
        let mut blobs = self.blobs.write().unwrap();
        blobs.insert(name.into(), Arc::new(content.into()));
    }

    /// Remove the blob stored under `name`.
    pub fn remove(&self, name: &str) -> Result<(), Error> {
        let mut blobs = self.blobs.write().unwrap();
        blobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::BlobMissing(name.into()))
    }
}

impl crate::Storage for Storage {
    type Blob = Blob;

    fn open(&self, name: &str) -> Result<(Blob, u64), Error> {
        let blobs = self.blobs.read().unwrap();
        let content = blobs
            .get(name)
            .ok_or_else(|| Error::BlobMissing(name.into()))?
            .clone();
        let len = content.len() as u64;
        Ok((Blob { content }, len))
    }
}

/// A read-only view of an in-memory blob.
#[derive(Clone)]
pub struct Blob {
    content: Arc<Vec<u8>>,
}

impl crate::Blob for Blob {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        let offset: usize = offset.try_into().map_err(|_| Error::OffsetOverflow)?;
        let end = offset
            .checked_add(buf.len())
            .ok_or(Error::OffsetOverflow)?;
        if end > self.content.len() {
            return Err(Error::BlobInsufficientLength);
        }
        buf.copy_from_slice(&self.content[offset..end]);
        Ok(())
    }

    fn close(self) -> Result<(), Error> {
        Ok(())
    }
}
