//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ CRC (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! Payloads are `bincode`-encoded [`Command`]s (client → server) and
//! [`Response`]s (server → client).
//!
//! ### Commands
//! - OPEN    - minor + open mode; trims on write-only/truncate
//! - READ    - up to `count` bytes, at most one quantum
//! - WRITE   - bytes, at most one quantum is consumed
//! - SEEK    - offset + whence
//! - RELEASE - close the session's handle
//! - STAT    - device layout snapshot
//! - PING    - health check
//! - SETDEFAULTS - default geometry applied by later trims

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{ErrorCode, Response};
pub use codec::{
    decode_command, decode_frame, decode_response, encode_command, encode_frame,
    encode_response, read_command, read_frame, read_response, write_command, write_frame,
    write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
