//! Response definitions
//!
//! Represents responses to clients.

use serde::{Deserialize, Serialize};

use crate::device::DeviceStats;
use crate::error::ScullError;

/// Error categories carried over the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    OutOfMemory,
    Interrupted,
    InvalidArgument,
    CopyFault,
    NoSuchDevice(u32),
    NotOpen,
    Protocol,
    Internal,
}

impl ErrorCode {
    /// Classify a local error
    pub fn of(err: &ScullError) -> Self {
        match err {
            ScullError::OutOfMemory => ErrorCode::OutOfMemory,
            ScullError::Interrupted => ErrorCode::Interrupted,
            ScullError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ScullError::CopyFault(_) => ErrorCode::CopyFault,
            ScullError::NoSuchDevice(minor) => ErrorCode::NoSuchDevice(*minor),
            ScullError::NotOpen => ErrorCode::NotOpen,
            ScullError::Protocol(_) | ScullError::Serialization(_) => ErrorCode::Protocol,
            _ => ErrorCode::Internal,
        }
    }

    /// Rebuild the error on the client side
    pub fn into_error(self, message: String) -> ScullError {
        match self {
            ErrorCode::OutOfMemory => ScullError::OutOfMemory,
            ErrorCode::Interrupted => ScullError::Interrupted,
            ErrorCode::InvalidArgument => ScullError::InvalidArgument(message),
            ErrorCode::CopyFault => ScullError::CopyFault(message),
            ErrorCode::NoSuchDevice(minor) => ScullError::NoSuchDevice(minor),
            ErrorCode::NotOpen => ScullError::NotOpen,
            ErrorCode::Protocol => ScullError::Protocol(message),
            ErrorCode::Internal => ScullError::Network(message),
        }
    }
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    /// A device was opened (and trimmed, if the mode asked for it)
    Opened { minor: u32 },

    /// Bytes read; empty means end of data or a hole
    Data(Vec<u8>),

    /// Bytes written
    Written(u64),

    /// New session position after a seek
    Position(u64),

    /// The open handle was closed
    Released,

    /// Device layout snapshot
    Stats(DeviceStats),

    /// Reply to ping
    Pong,

    /// Default geometry now in effect
    Defaults { quantum: u64, qset: u64 },

    /// The command failed
    Error { code: ErrorCode, message: String },
}

impl Response {
    /// Create an ERROR response from a local error
    pub fn error(err: &ScullError) -> Self {
        Response::Error {
            code: ErrorCode::of(err),
            message: err.to_string(),
        }
    }
}
