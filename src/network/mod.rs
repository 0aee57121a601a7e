//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections
//! - Each connection is one session holding at most one open handle

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::{Connection, MAX_READ_CHUNK};
pub use client::Client;
