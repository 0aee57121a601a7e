//! Connection Handler
//!
//! Handles individual client connections. Each connection is one session
//! and owns at most one open [`Handle`].

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::device::{Geometry, Interrupt};
use crate::error::{Result, ScullError};
use crate::handle::Handle;
use crate::protocol::{read_command, write_response, Command, Response, MAX_PAYLOAD_SIZE};
use crate::registry::Registry;

/// Largest read served in one response
pub const MAX_READ_CHUNK: usize = (MAX_PAYLOAD_SIZE / 2) as usize;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Devices served by this server
    registry: Arc<Registry>,

    /// Raised by the server on shutdown to abort lock waits
    interrupt: Interrupt,

    /// Set by the server on shutdown; no command runs after it
    shutdown: Arc<AtomicBool>,

    /// Device opened by this session, if any
    session: Option<Handle>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        stream: TcpStream,
        registry: Arc<Registry>,
        interrupt: Interrupt,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            registry,
            interrupt,
            shutdown,
            session: None,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends responses.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        let result = self.serve();

        if let Some(handle) = self.session.take() {
            handle.release();
        }
        result
    }

    fn serve(&mut self) -> Result<()> {
        loop {
            let command = match read_command(&mut self.reader) {
                Ok(cmd) => cmd,
                Err(ScullError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    let _ = write_response(&mut self.writer, &Response::error(&e));
                    return Err(e);
                }
            };

            tracing::trace!(
                "Received {:?} from {}",
                command.command_type(),
                self.peer_addr
            );

            if self.shutting_down() {
                tracing::debug!("Refusing command from {}: shutting down", self.peer_addr);
                let _ = write_response(&mut self.writer, &Response::error(&ScullError::Interrupted));
                return Ok(());
            }

            let response = match self.execute(command) {
                Ok(response) => response,
                Err(e) => {
                    tracing::debug!("Command from {} failed: {}", self.peer_addr, e);
                    Response::error(&e)
                }
            };

            if let Err(e) = write_response(&mut self.writer, &response) {
                if let ScullError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr, e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Execute a command against this session
    fn execute(&mut self, command: Command) -> Result<Response> {
        match command {
            Command::Open { minor, mode } => {
                if let Some(previous) = self.session.take() {
                    previous.release();
                }
                let handle = self.registry.open(minor, mode, self.interrupt.clone())?;
                self.session = Some(handle);
                Ok(Response::Opened { minor })
            }
            Command::Read { count } => {
                let handle = self.session()?;
                let mut buf = vec![0u8; (count as usize).min(MAX_READ_CHUNK)];
                let n = handle.read(&mut buf)?;
                buf.truncate(n);
                Ok(Response::Data(buf))
            }
            Command::Write { data } => {
                let n = self.session()?.write(&data)?;
                Ok(Response::Written(n as u64))
            }
            Command::Seek { offset, whence } => {
                let pos = self.session()?.seek(offset, whence)?;
                Ok(Response::Position(pos))
            }
            Command::Release => {
                let handle = self.session.take().ok_or(ScullError::NotOpen)?;
                handle.release();
                Ok(Response::Released)
            }
            Command::Stat { minor } => {
                let stats = self.registry.get(minor)?.stats(&self.interrupt)?;
                Ok(Response::Stats(stats))
            }
            Command::Ping => Ok(Response::Pong),
            Command::SetDefaults { quantum, qset } => {
                self.registry.set_defaults(wire_geometry(quantum, qset)?);
                Ok(Response::Defaults { quantum, qset })
            }
        }
    }

    fn shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn session(&mut self) -> Result<&mut Handle> {
        self.session.as_mut().ok_or(ScullError::NotOpen)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// Geometry sent by a client; bad values are the client's fault
fn wire_geometry(quantum: u64, qset: u64) -> Result<Geometry> {
    let quantum = usize::try_from(quantum)
        .map_err(|_| ScullError::InvalidArgument(format!("quantum {} too large", quantum)))?;
    let qset = usize::try_from(qset)
        .map_err(|_| ScullError::InvalidArgument(format!("qset {} too large", qset)))?;

    Geometry::try_new(quantum, qset).map_err(|e| ScullError::InvalidArgument(e.to_string()))
}

/// Errors that just mean the peer went away (or idled past the timeout)
fn is_disconnect(kind: std::io::ErrorKind) -> bool {
    use std::io::ErrorKind;

    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    )
}
