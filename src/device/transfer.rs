//! Caller-side buffers
//!
//! Reads copy out of a quantum into a [`Sink`]; writes copy from a
//! [`Source`] into a quantum. Plain slices never fail, but stream-backed
//! buffers can, and such a failure surfaces as [`ScullError::CopyFault`].

use std::io::{Read, Write};

use crate::error::{Result, ScullError};

/// Destination of a device read
pub trait Sink {
    /// Maximum number of bytes the caller asked for
    fn capacity(&self) -> usize;

    /// Copy `data` into the sink; `data.len() <= capacity()`
    fn fill(&mut self, data: &[u8]) -> Result<()>;
}

/// Origin of a device write
pub trait Source {
    /// Number of bytes the caller offers
    fn len(&self) -> usize;

    /// Whether the source offers nothing
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the first `dst.len()` offered bytes into `dst`; `dst.len() <= len()`
    fn drain_into(&mut self, dst: &mut [u8]) -> Result<()>;
}

impl Sink for [u8] {
    fn capacity(&self) -> usize {
        self.len()
    }

    fn fill(&mut self, data: &[u8]) -> Result<()> {
        let available = self.len();
        let dst = self.get_mut(..data.len()).ok_or_else(|| {
            ScullError::CopyFault(format!("{} bytes into a {} byte buffer", data.len(), available))
        })?;
        dst.copy_from_slice(data);
        Ok(())
    }
}

impl Source for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    /// Copies the prefix and advances past it
    fn drain_into(&mut self, dst: &mut [u8]) -> Result<()> {
        if dst.len() > <[u8]>::len(self) {
            return Err(ScullError::CopyFault(format!(
                "{} bytes from a {} byte buffer",
                dst.len(),
                <[u8]>::len(self)
            )));
        }
        let data = *self;
        let (head, tail) = data.split_at(dst.len());
        dst.copy_from_slice(head);
        *self = tail;
        Ok(())
    }
}

/// Sink that streams read data into a writer
pub struct WriterSink<W> {
    writer: W,
    limit: usize,
}

impl<W: Write> WriterSink<W> {
    /// Read at most `limit` bytes into `writer`
    pub fn new(writer: W, limit: usize) -> Self {
        Self { writer, limit }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for WriterSink<W> {
    fn capacity(&self) -> usize {
        self.limit
    }

    fn fill(&mut self, data: &[u8]) -> Result<()> {
        self.writer
            .write_all(data)
            .map_err(|e| ScullError::CopyFault(e.to_string()))?;
        self.limit -= data.len().min(self.limit);
        Ok(())
    }
}

/// Source that pulls write data from a reader
pub struct ReaderSource<R> {
    reader: R,
    len: usize,
}

impl<R: Read> ReaderSource<R> {
    /// Offer `len` bytes read from `reader`
    pub fn new(reader: R, len: usize) -> Self {
        Self { reader, len }
    }
}

impl<R: Read> Source for ReaderSource<R> {
    fn len(&self) -> usize {
        self.len
    }

    fn drain_into(&mut self, dst: &mut [u8]) -> Result<()> {
        self.reader
            .read_exact(dst)
            .map_err(|e| ScullError::CopyFault(e.to_string()))?;
        self.len -= dst.len().min(self.len);
        Ok(())
    }
}
