//! Scull device
//!
//! One independently addressable storage region.
//!
//! ## Concurrency
//! - `state` (chain, size, geometry) sits behind one interruptible mutex;
//!   read, write, trim and stats hold it for their whole duration
//! - `published_size` mirrors `state.size` so seek can resolve
//!   end-relative offsets without the lock
//! - The file position belongs to the caller (see [`crate::handle::Handle`]),
//!   never to the device

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::TrimPolicy;
use crate::error::{Result, ScullError};

use super::lock::{Interrupt, InterruptibleMutex};
use super::qset::QsetChain;
use super::transfer::{Sink, Source};
use super::{Geometry, SharedGeometry};

/// Access requested when opening a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// How a device is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenMode {
    pub access: AccessMode,
    pub truncate: bool,
}

impl OpenMode {
    pub fn read_only() -> Self {
        Self { access: AccessMode::ReadOnly, truncate: false }
    }

    /// Write-only opens always empty the device
    pub fn write_only() -> Self {
        Self { access: AccessMode::WriteOnly, truncate: false }
    }

    pub fn read_write() -> Self {
        Self { access: AccessMode::ReadWrite, truncate: false }
    }

    /// Request (or cancel) an explicit truncate
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Whether opening with this mode trims the device
    pub fn truncates(&self) -> bool {
        self.truncate || self.access == AccessMode::WriteOnly
    }

    pub fn can_read(&self) -> bool {
        self.access != AccessMode::WriteOnly
    }

    pub fn can_write(&self) -> bool {
        self.access != AccessMode::ReadOnly
    }
}

/// Reference point of a seek
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Whence {
    /// Absolute offset
    Set,
    /// Relative to the caller's current position
    Current,
    /// Relative to the device size
    End,
}

/// Snapshot of a device's layout and allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStats {
    pub minor: u32,
    pub quantum: u64,
    pub qset: u64,
    pub size: u64,
    pub nodes: u64,
    pub slot_arrays: u64,
    pub quanta: u64,
    /// Occupied slot indices of the last node, if it has a slot array
    pub last_node_slots: Vec<u64>,
}

impl fmt::Display for DeviceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Device {}: qset: {}, quantum: {}, size: {}",
            self.minor, self.qset, self.quantum, self.size
        )?;
        writeln!(
            f,
            "\tnodes: {}, slot arrays: {}, quanta: {}",
            self.nodes, self.slot_arrays, self.quanta
        )?;
        for slot in &self.last_node_slots {
            writeln!(f, "\t\t{:4}: allocated", slot)?;
        }
        Ok(())
    }
}

/// State guarded by the device lock
#[derive(Debug)]
struct DeviceState {
    chain: QsetChain,
    size: u64,
    geometry: Geometry,
}

/// A sparse, lazily grown in-memory device
#[derive(Debug)]
pub struct ScullDevice {
    minor: u32,
    state: InterruptibleMutex<DeviceState>,
    published_size: AtomicU64,
    defaults: SharedGeometry,
    trim_policy: TrimPolicy,
}

impl ScullDevice {
    /// Create an empty device using the current default geometry
    pub fn new(
        minor: u32,
        defaults: SharedGeometry,
        trim_policy: TrimPolicy,
        lock_poll_interval: Duration,
    ) -> Self {
        let state = DeviceState {
            chain: QsetChain::new(),
            size: 0,
            geometry: defaults.get(),
        };

        Self {
            minor,
            state: InterruptibleMutex::new(state, lock_poll_interval),
            published_size: AtomicU64::new(0),
            defaults,
            trim_policy,
        }
    }

    /// Minor number of this device
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Amount of data stored (highest offset ever written, reset by trim)
    pub fn size(&self) -> u64 {
        self.published_size.load(Ordering::Acquire)
    }

    /// Current geometry of the device
    pub fn geometry(&self, interrupt: &Interrupt) -> Result<Geometry> {
        Ok(self.state.lock(interrupt)?.geometry)
    }

    /// Open the device; write-only or truncating opens trim it first
    pub fn open(&self, mode: OpenMode, interrupt: &Interrupt) -> Result<()> {
        if mode.truncates() {
            self.trim(interrupt)?;
        }
        tracing::debug!(minor = self.minor, ?mode, "device opened");
        Ok(())
    }

    /// Release an open of the device (nothing to undo)
    pub fn release(&self) {
        tracing::trace!(minor = self.minor, "device released");
    }

    /// Read from `*pos` into `dst`, never crossing a quantum boundary
    ///
    /// Returns the number of bytes copied and advances `*pos` by it.
    /// Zero means end of data, or a hole that no write ever reached.
    pub fn read<S: Sink + ?Sized>(
        &self,
        dst: &mut S,
        pos: &mut u64,
        interrupt: &Interrupt,
    ) -> Result<usize> {
        let state = self.state.lock(interrupt)?;

        if *pos >= state.size {
            return Ok(0);
        }

        let geometry = state.geometry;
        let location = geometry.locate(*pos);

        let Some(quantum) = state
            .chain
            .get(location.node)
            .and_then(|node| node.quantum(location.slot))
        else {
            tracing::trace!(minor = self.minor, pos = *pos, "read hit a hole");
            return Ok(0);
        };

        let available = state.size - *pos;
        let count = (dst.capacity() as u64)
            .min(available)
            .min(geometry.remaining_in_quantum(&location) as u64) as usize;

        dst.fill(&quantum[location.offset..location.offset + count])?;
        *pos += count as u64;

        tracing::trace!(minor = self.minor, pos = *pos, count, "read");
        Ok(count)
    }

    /// Write `src` at `*pos`, never crossing a quantum boundary
    ///
    /// Grows the chain, slot array and quantum as needed. Returns the number
    /// of bytes copied and advances `*pos` by it.
    pub fn write<S: Source + ?Sized>(
        &self,
        src: &mut S,
        pos: &mut u64,
        interrupt: &Interrupt,
    ) -> Result<usize> {
        let mut state = self.state.lock(interrupt)?;

        let geometry = state.geometry;
        let location = geometry.locate(*pos);

        let count = src.len().min(geometry.remaining_in_quantum(&location));
        let end = pos
            .checked_add(count as u64)
            .filter(|end| *end <= i64::MAX as u64)
            .ok_or_else(|| ScullError::InvalidArgument(format!("write at {} overflows", pos)))?;

        let node = state.chain.follow(location.node)?;
        let quantum = node.quantum_or_alloc(location.slot, &geometry)?;
        src.drain_into(&mut quantum[location.offset..location.offset + count])?;

        *pos = end;
        if state.size < end {
            state.size = end;
            self.published_size.store(end, Ordering::Release);
        }

        tracing::trace!(minor = self.minor, pos = end, count, "write");
        Ok(count)
    }

    /// Empty the device
    pub fn trim(&self, interrupt: &Interrupt) -> Result<()> {
        let mut state = self.state.lock(interrupt)?;
        self.trim_locked(&mut state);
        Ok(())
    }

    /// Empty the device without honouring interrupts (teardown)
    pub fn trim_uninterruptible(&self) {
        let mut state = self.state.lock_uninterruptible();
        self.trim_locked(&mut state);
    }

    fn trim_locked(&self, state: &mut DeviceState) {
        let released = state.chain.trim();
        state.size = 0;
        self.published_size.store(0, Ordering::Release);

        if self.trim_policy == TrimPolicy::ReloadDefaults {
            state.geometry = self.defaults.get();
        }

        tracing::debug!(
            minor = self.minor,
            released,
            quantum = state.geometry.quantum(),
            qset = state.geometry.qset(),
            "device trimmed"
        );
    }

    /// Compute a new position from `current`
    ///
    /// Positions past the end are allowed; negative ones are not.
    pub fn seek(&self, current: u64, offset: i64, whence: Whence) -> Result<u64> {
        let base = match whence {
            Whence::Set => 0,
            Whence::Current => current as i128,
            Whence::End => self.size() as i128,
        };
        let target = base + offset as i128;

        if target < 0 {
            return Err(ScullError::InvalidArgument(format!(
                "seek to negative position {}",
                target
            )));
        }
        if target > i64::MAX as i128 {
            return Err(ScullError::InvalidArgument(format!(
                "seek to {} overflows",
                target
            )));
        }

        Ok(target as u64)
    }

    /// Snapshot the device layout
    pub fn stats(&self, interrupt: &Interrupt) -> Result<DeviceStats> {
        let state = self.state.lock(interrupt)?;
        let (nodes, slot_arrays, quanta) = state.chain.census();

        let last_node_slots: Vec<u64> = state
            .chain
            .last()
            .map(|node| node.occupied_slots().into_iter().map(|s| s as u64).collect())
            .unwrap_or_default();

        Ok(DeviceStats {
            minor: self.minor,
            quantum: state.geometry.quantum() as u64,
            qset: state.geometry.qset() as u64,
            size: state.size,
            nodes: nodes as u64,
            slot_arrays: slot_arrays as u64,
            quanta: quanta as u64,
            last_node_slots,
        })
    }
}
