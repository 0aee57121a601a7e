//! Device Module
//!
//! The in-memory storage device and its building blocks.
//!
//! ## Responsibilities
//! - Translate linear offsets into (node, slot, offset)
//! - Grow the qset chain lazily on writes
//! - Serve reads/writes one quantum at a time
//! - Trim a device back to empty
//! - Serialize all operations on one device behind an interruptible lock
//!
//! ## Memory Layout
//! ```text
//!  ScullDevice
//!  ┌──────────┐    ┌────────────┐    ┌────────────┐
//!  │  chain ──┼───►│ qset node 0│───►│ qset node 1│───► ...
//!  │  size    │    └─────┬──────┘    └─────┬──────┘
//!  │  geometry│          ▼                 ▼
//!  └──────────┘    ┌───┬───┬───┐     (slot array
//!                  │ 0 │ 1 │...│      not yet allocated)
//!                  └─┬─┴─┬─┴───┘
//!                    ▼   ▼
//!                 quantum quantum        each `quantum` bytes
//! ```

mod layout;
mod lock;
mod qset;
mod scull;
mod transfer;

pub use layout::{Geometry, Location, SharedGeometry};
pub use lock::{Interrupt, InterruptibleMutex};
pub use qset::{QsetChain, QsetNode};
pub use scull::{AccessMode, DeviceStats, OpenMode, ScullDevice, Whence};
pub use transfer::{ReaderSource, Sink, Source, WriterSink};
