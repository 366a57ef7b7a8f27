//! Buffered access to a [Blob].

use crate::{Blob, Error};
use std::num::NonZeroUsize;

/// A reader that buffers content from a [Blob] to reduce the number of reads issued against it.
///
/// The buffer is a single window of at most `buffer_size` bytes. Reads that fall inside the window
/// are served from memory. Reads that fall outside of it (or run past its end) refill the window
/// starting at the current position.
///
/// # Example
///
/// ```
/// use shapeidx_runtime::{buffer::Read, memory, Storage, NZUsize};
///
/// let storage = memory::Storage::default();
/// storage.insert("my_data", b"Hello, world! This is a test.".to_vec());
/// let (blob, size) = storage.open("my_data").expect("unable to open blob");
///
/// // Create a buffer
/// let mut reader = Read::new(blob, size, NZUsize!(16));
///
/// // Read data sequentially
/// let mut greeting = [0u8; 5];
/// reader.read_exact(&mut greeting).expect("unable to read data");
/// assert_eq!(&greeting, b"Hello");
/// assert_eq!(reader.position(), 5);
///
/// // Jump anywhere
/// let mut word = [0u8; 4];
/// reader.read_at(&mut word, 24).expect("unable to read data");
/// assert_eq!(&word, b"test");
/// ```
pub struct Read<B: Blob> {
    /// The underlying blob to read from.
    blob: B,
    /// The buffer storing the data read from the blob.
    buffer: Vec<u8>,
    /// The current position in the blob from where the buffer was filled.
    blob_position: u64,
    /// The size of the blob.
    blob_size: u64,
    /// The current position within the buffer for reading.
    buffer_position: usize,
    /// The valid data length in the buffer.
    buffer_valid_len: usize,
}

impl<B: Blob> Read<B> {
    /// Creates a new `Read` that reads from the given blob with the specified buffer size.
    pub fn new(blob: B, blob_size: u64, buffer_size: NonZeroUsize) -> Self {
        Self {
            blob,
            buffer: vec![0; buffer_size.get()],
            blob_position: 0,
            blob_size,
            buffer_position: 0,
            buffer_valid_len: 0,
        }
    }

    /// Returns how many valid bytes are remaining in the buffer.
    pub fn buffer_remaining(&self) -> usize {
        self.buffer_valid_len - self.buffer_position
    }

    /// Returns how many bytes remain in the blob from the current position.
    pub fn blob_remaining(&self) -> u64 {
        self.blob_size.saturating_sub(self.position())
    }

    /// Returns the number of bytes in the blob, as provided at construction.
    pub fn blob_size(&self) -> u64 {
        self.blob_size
    }

    /// Returns the current absolute position in the blob.
    pub fn position(&self) -> u64 {
        self.blob_position + self.buffer_position as u64
    }

    /// Refills the buffer from the blob starting at the current position.
    /// Returns the number of bytes read or an error if the read failed.
    fn refill(&mut self) -> Result<usize, Error> {
        // Update blob position to account for consumed bytes
        self.blob_position += self.buffer_position as u64;
        self.buffer_position = 0;
        self.buffer_valid_len = 0;

        // Calculate how many bytes remain in the blob
        let blob_remaining = self.blob_size.saturating_sub(self.blob_position);
        if blob_remaining == 0 {
            return Err(Error::BlobInsufficientLength);
        }

        // Calculate how much to read (minimum of buffer size and remaining bytes)
        let bytes_to_read = std::cmp::min(self.buffer.len() as u64, blob_remaining) as usize;
        self.blob
            .read_at(&mut self.buffer[..bytes_to_read], self.blob_position)?;
        self.buffer_valid_len = bytes_to_read;

        Ok(bytes_to_read)
    }

    /// Fills `buf` with the bytes starting at the current position and advances past them.
    ///
    /// Returns an error if not enough bytes are available, in which case the position is unchanged.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        if buf.is_empty() {
            return Ok(());
        }

        // Quick check if we have enough bytes total before attempting reads
        if self.blob_remaining() < buf.len() as u64 {
            return Err(Error::BlobInsufficientLength);
        }

        let mut filled = 0;
        while filled < buf.len() {
            // Check if we need to refill
            if self.buffer_position >= self.buffer_valid_len {
                self.refill()?;
            }

            // Copy as much as the buffer holds
            let bytes_to_take = std::cmp::min(buf.len() - filled, self.buffer_remaining());
            buf[filled..filled + bytes_to_take].copy_from_slice(
                &self.buffer[self.buffer_position..self.buffer_position + bytes_to_take],
            );

            self.buffer_position += bytes_to_take;
            filled += bytes_to_take;
        }

        Ok(())
    }

    /// Repositions the buffer to read from the specified position in the blob.
    pub fn seek_to(&mut self, position: u64) -> Result<(), Error> {
        // Check if the seek position is valid
        if position > self.blob_size {
            return Err(Error::BlobInsufficientLength);
        }

        // Check if the position is within the current buffer
        let buffer_start = self.blob_position;
        let buffer_end = self.blob_position + self.buffer_valid_len as u64;

        if position >= buffer_start && position < buffer_end {
            // Position is within the current buffer, adjust buffer_position
            self.buffer_position = (position - self.blob_position) as usize;
        } else {
            // Position is outside the current buffer, reset buffer state
            self.blob_position = position;
            self.buffer_position = 0;
            self.buffer_valid_len = 0;
        }

        Ok(())
    }

    /// Fills `buf` with the bytes starting at `offset`, leaving the position just past them.
    pub fn read_at(&mut self, buf: &mut [u8], offset: u64) -> Result<(), Error> {
        let end = offset
            .checked_add(buf.len() as u64)
            .ok_or(Error::OffsetOverflow)?;
        if end > self.blob_size {
            return Err(Error::BlobInsufficientLength);
        }
        self.seek_to(offset)?;
        self.read_exact(buf)
    }

    /// Returns a reference to the underlying blob.
    pub fn blob(&self) -> &B {
        &self.blob
    }

    /// Drops the buffer and closes the underlying blob.
    pub fn close(self) -> Result<(), Error> {
        self.blob.close()
    }
}
