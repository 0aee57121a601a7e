//! Error types for scull
//!
//! Provides a unified error type for all operations.

use std::io;

use thiserror::Error;

/// Result type alias using ScullError
pub type Result<T> = std::result::Result<T, ScullError>;

/// Unified error type for scull operations
///
/// None of these are fatal: a device stays usable after any of them.
#[derive(Debug, Error)]
pub enum ScullError {
    // -------------------------------------------------------------------------
    // Device Errors
    // -------------------------------------------------------------------------
    #[error("Out of memory")]
    OutOfMemory,

    #[error("Interrupted while waiting for the device lock")]
    Interrupted,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Copy fault: {0}")]
    CopyFault(String),

    #[error("No such device: minor {0}")]
    NoSuchDevice(u32),

    #[error("No device is open on this session")]
    NotOpen,

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<std::collections::TryReserveError> for ScullError {
    fn from(_: std::collections::TryReserveError) -> Self {
        ScullError::OutOfMemory
    }
}

impl From<ScullError> for io::Error {
    fn from(err: ScullError) -> Self {
        let kind = match &err {
            ScullError::Io(e) => e.kind(),
            ScullError::OutOfMemory => io::ErrorKind::OutOfMemory,
            ScullError::Interrupted => io::ErrorKind::Interrupted,
            ScullError::InvalidArgument(_) => io::ErrorKind::InvalidInput,
            ScullError::NoSuchDevice(_) => io::ErrorKind::NotFound,
            ScullError::NotOpen => io::ErrorKind::NotConnected,
            ScullError::Serialization(_) | ScullError::Protocol(_) => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        match err {
            ScullError::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}
