//! Open handles
//!
//! A [`Handle`] is one open of a device: it owns the file position and the
//! interrupt token used for that caller's lock waits, and borrows the
//! device through an `Arc`. Several handles on the same device share its
//! data but never its position.

use std::io;
use std::sync::Arc;

use crate::device::{DeviceStats, Interrupt, OpenMode, ScullDevice, Sink, Source, Whence};
use crate::error::{Result, ScullError};

/// One open session on a device
#[derive(Debug)]
pub struct Handle {
    device: Arc<ScullDevice>,
    mode: OpenMode,
    pos: u64,
    interrupt: Interrupt,
}

impl Handle {
    /// Open `device` with `mode`, trimming it first if the mode asks for it
    pub fn open(device: Arc<ScullDevice>, mode: OpenMode, interrupt: Interrupt) -> Result<Self> {
        device.open(mode, &interrupt)?;
        Ok(Self {
            device,
            mode,
            pos: 0,
            interrupt,
        })
    }

    /// Read one quantum's worth at most into `buf`
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.read_into(buf)
    }

    /// Read into any [`Sink`]
    pub fn read_into<S: Sink + ?Sized>(&mut self, dst: &mut S) -> Result<usize> {
        self.device.read(dst, &mut self.pos, &self.interrupt)
    }

    /// Write one quantum's worth at most from `buf`
    pub fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut src = buf;
        self.write_from(&mut src)
    }

    /// Write from any [`Source`]
    pub fn write_from<S: Source + ?Sized>(&mut self, src: &mut S) -> Result<usize> {
        self.device.write(src, &mut self.pos, &self.interrupt)
    }

    /// Keep reading until `buf` is full, the data ends, or a hole is hit
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }
        Ok(filled)
    }

    /// Keep writing until all of `buf` is stored
    pub fn write_full(&mut self, buf: &[u8]) -> Result<usize> {
        let mut written = 0;
        while written < buf.len() {
            written += self.write(&buf[written..])?;
        }
        Ok(written)
    }

    /// Move the position; returns the new position
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        self.pos = self.device.seek(self.pos, offset, whence)?;
        Ok(self.pos)
    }

    /// Empty the device behind this handle
    pub fn trim(&mut self) -> Result<()> {
        self.device.trim(&self.interrupt)
    }

    /// Layout snapshot of the device behind this handle
    pub fn stats(&self) -> Result<DeviceStats> {
        self.device.stats(&self.interrupt)
    }

    /// Close the handle
    pub fn release(self) {
        self.device.release();
    }

    /// Current position
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Mode this handle was opened with
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Minor number of the device
    pub fn minor(&self) -> u32 {
        self.device.minor()
    }

    /// Token that interrupts this handle's lock waits
    pub fn interrupt(&self) -> &Interrupt {
        &self.interrupt
    }

    /// The device behind this handle
    pub fn device(&self) -> &Arc<ScullDevice> {
        &self.device
    }
}

impl io::Read for Handle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Handle::read(self, buf).map_err(io::Error::from)
    }
}

impl io::Write for Handle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Handle::write(self, buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Seek for Handle {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let (offset, whence) = match pos {
            io::SeekFrom::Start(offset) => {
                let offset = i64::try_from(offset).map_err(|_| {
                    io::Error::from(ScullError::InvalidArgument(format!(
                        "seek to {} overflows",
                        offset
                    )))
                })?;
                (offset, Whence::Set)
            }
            io::SeekFrom::Current(offset) => (offset, Whence::Current),
            io::SeekFrom::End(offset) => (offset, Whence::End),
        };
        Handle::seek(self, offset, whence).map_err(io::Error::from)
    }
}
