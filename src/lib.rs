//! # scull
//!
//! An in-memory, byte-addressable storage device with:
//! - Sparse backing store grown lazily, one quantum at a time
//! - Read/write/seek/trim with per-device exclusive locking
//! - Interruptible lock waits
//! - A registry of independent devices addressed by minor number
//! - TCP front-end and client
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one session per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Handle                                  │
//! │             (position, interrupt token)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Registry                                 │
//! │         scull0   scull1   scull2   scull3                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!               ┌───────────────┐
//!               │  ScullDevice  │
//!               │ (lock, chain) │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod device;
pub mod handle;
pub mod registry;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ScullError, Result};
pub use config::Config;
pub use device::{Geometry, Interrupt, OpenMode, ScullDevice, Whence};
pub use handle::Handle;
pub use registry::Registry;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of scull
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
