use super::{Config, Entry, Error, Metrics};
use crate::header::{Header, Warnings, HEADER_SIZE};
use prometheus_client::registry::Registry;
use shapeidx_runtime::{buffer::Read, Blob, Error as RError, Storage};
use tracing::{debug, trace};

/// Implementation of shapefile index storage.
pub struct IndexFile<B: Blob> {
    header: Header,

    // `None` once closed
    reader: Option<Read<B>>,

    // Most recently read entry and its index
    cached: Option<(u32, Entry)>,

    metrics: Metrics,
}

impl<B: Blob> IndexFile<B> {
    /// Open the blob `name` from `storage` and initialize an [IndexFile] over it.
    pub fn open<S, W>(storage: &S, name: &str, cfg: Config, warnings: &mut W) -> Result<Self, Error>
    where
        S: Storage<Blob = B>,
        W: Warnings + ?Sized,
    {
        let (blob, size) = storage.open(name)?;
        Self::init(blob, size, cfg, warnings)
    }

    /// Initialize a new [IndexFile] over a blob of `size` bytes.
    ///
    /// The header is read and decoded immediately. Anomalies that do not prevent reading entries
    /// (unexpected file code or version, a declared length that disagrees with the blob) are
    /// reported to `warnings`.
    pub fn init<W: Warnings + ?Sized>(
        blob: B,
        size: u64,
        cfg: Config,
        warnings: &mut W,
    ) -> Result<Self, Error> {
        if size < HEADER_SIZE as u64 {
            return Err(Error::TruncatedHeader(size));
        }

        // Read the header
        let mut reader = Read::new(blob, size, cfg.read_buffer);
        let mut raw = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut raw) {
            Ok(()) => {}
            Err(RError::BlobInsufficientLength) => return Err(Error::TruncatedHeader(size)),
            Err(err) => return Err(Error::Runtime(err)),
        }
        let header = Header::decode(&raw, warnings);

        // Check the declared length against the record table and the blob
        let declared = header.file_length_in_bytes();
        let table = declared - HEADER_SIZE as i64;
        if table > 0 && table % Entry::SIZE as i64 != 0 {
            warnings.warn(&format!(
                "record table of {table} bytes is not a multiple of {} bytes",
                Entry::SIZE
            ));
        }
        if declared > size as i64 {
            warnings.warn(&format!(
                "declared length of {declared} bytes exceeds blob size of {size} bytes"
            ));
        }

        let index = Self {
            header,
            reader: Some(reader),
            cached: None,
            metrics: Metrics::default(),
        };
        debug!(
            size,
            declared,
            records = index.record_count(),
            shape_type = ?index.header.shape_type,
            "opened index"
        );
        Ok(index)
    }

    /// Header decoded when the index was opened.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of records declared by the header.
    ///
    /// Computed as `(file_length * 2 - 100) / 8`, or zero if the declared length does not cover
    /// the header.
    pub fn record_count(&self) -> u32 {
        let table = self.header.file_length_in_bytes() - HEADER_SIZE as i64;
        if table <= 0 {
            return 0;
        }

        // At most (i32::MAX * 2 - 100) / 8, which fits in a u32
        (table / Entry::SIZE as i64) as u32
    }

    /// Get the stored entry for the record at `index`.
    pub fn entry(&mut self, index: u32) -> Result<Entry, Error> {
        if self.reader.is_none() {
            return Err(Error::Closed);
        }
        let count = self.record_count();
        if index >= count {
            return Err(Error::IndexOutOfRange { index, count });
        }

        // Serve repeated lookups from the cache
        if let Some((cached, entry)) = self.cached {
            if cached == index {
                self.metrics.cache_hits.inc();
                return Ok(entry);
            }
        }

        // Read from the blob
        let reader = self.reader.as_mut().ok_or(Error::Closed)?;
        let position = HEADER_SIZE as u64 + u64::from(index) * Entry::SIZE as u64;
        let mut raw = [0u8; Entry::SIZE];
        reader.read_at(&mut raw, position)?;
        let entry = Entry::decode(&raw);
        self.metrics.reads.inc();
        trace!(
            index,
            offset = entry.stored_offset,
            length = entry.stored_length,
            "read entry"
        );

        self.cached = Some((index, entry));
        Ok(entry)
    }

    /// Get the offset of the record at `index`: the stored value (in 16-bit words) times two.
    pub fn offset(&mut self, index: u32) -> Result<i64, Error> {
        self.entry(index).map(|entry| entry.offset())
    }

    /// Get the offset of the record at `index` in bytes: the stored value times four.
    pub fn offset_in_bytes(&mut self, index: u32) -> Result<i64, Error> {
        self.entry(index).map(|entry| entry.offset_in_bytes())
    }

    /// Get the content length of the record at `index`, unmodified from the stored value.
    pub fn content_length(&mut self, index: u32) -> Result<i32, Error> {
        self.entry(index).map(|entry| entry.content_length())
    }

    /// Iterate over all entries in order.
    ///
    /// Iteration stops after the first error.
    pub fn entries(&mut self) -> Entries<'_, B> {
        let count = self.record_count();
        Entries {
            index: self,
            next: 0,
            count,
            failed: false,
        }
    }

    /// Metrics tracked by this index.
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Register this index's metrics with the given registry.
    pub fn register(&self, registry: &mut Registry) {
        self.metrics.register(registry);
    }

    /// Whether [IndexFile::close] has been called.
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// Close the underlying blob.
    ///
    /// Closing an already closed index does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        self.cached = None;
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        reader.close()?;
        debug!("closed index");
        Ok(())
    }
}

/// Iterator over the entries of an [IndexFile], returned by [IndexFile::entries].
pub struct Entries<'a, B: Blob> {
    index: &'a mut IndexFile<B>,
    next: u32,
    count: u32,
    failed: bool,
}

impl<B: Blob> Iterator for Entries<'_, B> {
    type Item = Result<Entry, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next >= self.count {
            return None;
        }
        match self.index.entry(self.next) {
            Ok(entry) => {
                self.next += 1;
                Some(Ok(entry))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let remaining = (self.count - self.next) as usize;
        (0, Some(remaining))
    }
}
