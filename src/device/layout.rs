//! Device geometry and offset translation
//!
//! A device is a chain of qset nodes, each holding `qset` slots that each
//! own one quantum of `quantum` bytes. A linear offset therefore splits
//! into a node index, a slot index and an offset inside the quantum:
//!
//! ```text
//!   itemsize = quantum * qset
//!
//!   pos ──► node   = pos / itemsize
//!           rest   = pos % itemsize
//!           slot   = rest / quantum
//!           offset = rest % quantum
//! ```

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Result, ScullError};

/// Layout parameters of one device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    quantum: usize,
    qset: usize,
}

/// Where a linear offset lives inside the qset chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Index of the qset node in the chain
    pub node: u64,

    /// Slot index inside the node
    pub slot: usize,

    /// Byte offset inside the quantum
    pub offset: usize,
}

impl Geometry {
    /// Create a geometry, rejecting zero sizes and overflowing node spans
    pub fn try_new(quantum: usize, qset: usize) -> Result<Self> {
        if quantum == 0 || qset == 0 {
            return Err(ScullError::Config(format!(
                "quantum ({}) and qset ({}) must both be non-zero",
                quantum, qset
            )));
        }
        if (quantum as u64).checked_mul(qset as u64).is_none() {
            return Err(ScullError::Config(format!(
                "quantum ({}) * qset ({}) overflows u64",
                quantum, qset
            )));
        }

        Ok(Self { quantum, qset })
    }

    /// Bytes per quantum buffer
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Slots per qset node
    pub fn qset(&self) -> usize {
        self.qset
    }

    /// Bytes addressed by one full qset node
    pub fn item_size(&self) -> u64 {
        self.quantum as u64 * self.qset as u64
    }

    /// Translate a linear offset into (node, slot, offset)
    pub fn locate(&self, pos: u64) -> Location {
        let quantum = self.quantum as u64;
        let item_size = self.item_size();

        let node = pos / item_size;
        let rest = pos % item_size;

        Location {
            node,
            slot: (rest / quantum) as usize,
            offset: (rest % quantum) as usize,
        }
    }

    /// Bytes left in the quantum containing `location`
    pub fn remaining_in_quantum(&self, location: &Location) -> usize {
        self.quantum - location.offset
    }
}

/// Process-wide default geometry, shared by every device of a registry
///
/// Devices read it at creation and, under [`TrimPolicy::ReloadDefaults`],
/// again at every trim.
///
/// [`TrimPolicy::ReloadDefaults`]: crate::config::TrimPolicy::ReloadDefaults
#[derive(Debug, Clone)]
pub struct SharedGeometry {
    inner: Arc<RwLock<Geometry>>,
}

impl SharedGeometry {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(geometry)),
        }
    }

    /// Current default geometry
    pub fn get(&self) -> Geometry {
        *self.inner.read()
    }

    /// Replace the default geometry; existing devices pick it up on their next trim
    pub fn set(&self, geometry: Geometry) {
        *self.inner.write() = geometry;
    }
}
