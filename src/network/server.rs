//! TCP Server
//!
//! Accepts connections and dispatches them to a pool of worker threads over
//! a bounded channel. Connections beyond `max_connections` are turned away.

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, TrySendError};

use crate::config::Config;
use crate::device::Interrupt;
use crate::error::{Result, ScullError};
use crate::protocol::{write_response, Response};
use crate::registry::Registry;

use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
    interrupt: Interrupt,
}

impl ShutdownHandle {
    /// Stop accepting, end sessions at their next command, and abort lock
    /// waits of in-flight ones
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.interrupt.raise();
    }
}

/// TCP server exposing a registry
pub struct Server {
    config: Config,
    registry: Arc<Registry>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, registry: Arc<Registry>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr).map_err(|e| {
            ScullError::Network(format!("cannot bind {}: {}", config.listen_addr, e))
        })?;

        Ok(Self {
            config,
            registry,
            listener,
            shutdown: ShutdownHandle {
                shutdown: Arc::new(AtomicBool::new(false)),
                interrupt: Interrupt::new(),
            },
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle that stops this server
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;

        let (tx, rx) = channel::bounded::<TcpStream>(self.config.max_connections);

        let mut workers = Vec::with_capacity(self.config.worker_threads);
        for id in 0..self.config.worker_threads {
            workers.push(self.spawn_worker(id, rx.clone())?);
        }
        drop(rx);

        tracing::info!(
            "Listening on {} with {} workers",
            self.local_addr()?,
            self.config.worker_threads
        );

        while !self.shutdown.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    tracing::debug!("Accepted connection from {}", addr);
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", addr, e);
                        continue;
                    }
                    match tx.try_send(stream) {
                        Ok(()) => {}
                        Err(TrySendError::Full(stream)) => {
                            tracing::warn!("Connection limit reached, rejecting {}", addr);
                            reject(stream);
                        }
                        Err(TrySendError::Disconnected(_)) => break,
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL);
                }
            }
        }

        tracing::info!("Shutting down, waiting for workers");
        drop(tx);
        for worker in workers {
            if worker.join().is_err() {
                tracing::error!("Worker thread panicked");
            }
        }

        Ok(())
    }

    fn spawn_worker(&self, id: usize, rx: Receiver<TcpStream>) -> Result<JoinHandle<()>> {
        let registry = Arc::clone(&self.registry);
        let interrupt = self.shutdown.interrupt.clone();
        let shutdown = Arc::clone(&self.shutdown.shutdown);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        let handle = thread::Builder::new()
            .name(format!("scull-worker-{}", id))
            .spawn(move || {
                for stream in rx.iter() {
                    let mut connection = match Connection::new(
                        stream,
                        Arc::clone(&registry),
                        interrupt.clone(),
                        Arc::clone(&shutdown),
                    ) {
                        Ok(connection) => connection,
                        Err(e) => {
                            tracing::warn!("Failed to set up connection: {}", e);
                            continue;
                        }
                    };

                    if let Err(e) = connection.set_timeouts(read_ms, write_ms) {
                        tracing::warn!("Failed to set timeouts for {}: {}", connection.peer_addr(), e);
                    }
                    if let Err(e) = connection.handle() {
                        tracing::warn!("Connection {} ended with error: {}", connection.peer_addr(), e);
                    }
                }
            })?;

        Ok(handle)
    }
}

/// Tell a client we are full, then drop it
fn reject(mut stream: TcpStream) {
    let response = Response::error(&ScullError::Network("server busy".to_string()));
    let _ = write_response(&mut stream, &response);
}
