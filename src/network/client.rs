//! Blocking client
//!
//! Speaks the frame protocol to a [`super::Server`]. Errors returned by the
//! server come back as the matching [`ScullError`] variant.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::device::{DeviceStats, OpenMode, Whence};
use crate::error::{Result, ScullError};
use crate::protocol::{read_response, write_command, Command, Response};

/// Client connection to a scull server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ScullError::Network(format!("connect failed: {}", e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for its response
    pub fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        match read_response(&mut self.reader)? {
            Response::Error { code, message } => Err(code.into_error(message)),
            response => Ok(response),
        }
    }

    /// Open a device for this session
    pub fn open(&mut self, minor: u32, mode: OpenMode) -> Result<()> {
        match self.call(&Command::Open { minor, mode })? {
            Response::Opened { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// One read call: at most one quantum, empty at end of data or in a hole
    pub fn read(&mut self, count: u32) -> Result<Vec<u8>> {
        match self.call(&Command::Read { count })? {
            Response::Data(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }

    /// One write call: returns how many bytes the device took
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        match self.call(&Command::Write { data: data.to_vec() })? {
            Response::Written(n) => Ok(n as usize),
            other => Err(unexpected(other)),
        }
    }

    /// Read until an empty response
    pub fn read_to_end(&mut self, chunk: u32) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let data = self.read(chunk)?;
            if data.is_empty() {
                return Ok(out);
            }
            out.extend_from_slice(&data);
        }
    }

    /// Write all of `data`, one quantum at a time
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            written += self.write(&data[written..])?;
        }
        Ok(())
    }

    /// Move the session position
    pub fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
        match self.call(&Command::Seek { offset, whence })? {
            Response::Position(pos) => Ok(pos),
            other => Err(unexpected(other)),
        }
    }

    /// Close the session's handle
    pub fn release(&mut self) -> Result<()> {
        match self.call(&Command::Release)? {
            Response::Released => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Layout snapshot of a device
    pub fn stat(&mut self, minor: u32) -> Result<DeviceStats> {
        match self.call(&Command::Stat { minor })? {
            Response::Stats(stats) => Ok(stats),
            other => Err(unexpected(other)),
        }
    }

    /// Change the default geometry used by later trims
    pub fn set_defaults(&mut self, quantum: usize, qset: usize) -> Result<()> {
        let command = Command::SetDefaults {
            quantum: quantum as u64,
            qset: qset as u64,
        };
        match self.call(&command)? {
            Response::Defaults { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Health check
    pub fn ping(&mut self) -> Result<()> {
        match self.call(&Command::Ping)? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> ScullError {
    ScullError::Protocol(format!("unexpected response: {:?}", response))
}
