//! Command definitions
//!
//! Represents requests from clients. A connection is one session: `Open`
//! attaches it to a device and the following reads, writes and seeks act
//! on that open handle until `Release`.

use serde::{Deserialize, Serialize};

use crate::device::{OpenMode, Whence};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Open = 0x01,
    Read = 0x02,
    Write = 0x03,
    Seek = 0x04,
    Release = 0x05,
    Stat = 0x06,
    Ping = 0x07,
    SetDefaults = 0x08,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Open a device by minor number, replacing any open handle
    Open { minor: u32, mode: OpenMode },

    /// Read up to `count` bytes at the session position
    Read { count: u32 },

    /// Write bytes at the session position
    Write { data: Vec<u8> },

    /// Move the session position
    Seek { offset: i64, whence: Whence },

    /// Close the open handle
    Release,

    /// Layout snapshot of a device
    Stat { minor: u32 },

    /// Ping (health check)
    Ping,

    /// Change the registry's default geometry; devices adopt it on their
    /// next trim under the reload-defaults policy
    SetDefaults { quantum: u64, qset: u64 },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Open { .. } => CommandType::Open,
            Command::Read { .. } => CommandType::Read,
            Command::Write { .. } => CommandType::Write,
            Command::Seek { .. } => CommandType::Seek,
            Command::Release => CommandType::Release,
            Command::Stat { .. } => CommandType::Stat,
            Command::Ping => CommandType::Ping,
            Command::SetDefaults { .. } => CommandType::SetDefaults,
        }
    }
}
