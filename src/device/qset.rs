//! Qset chain
//!
//! The sparse backing store of a device. Storage is materialized in three
//! lazy stages, each on the first write that needs it:
//!
//! 1. the qset node itself (by [`QsetChain::follow`]),
//! 2. the node's slot array, all slots empty,
//! 3. the quantum buffer behind one slot.
//!
//! Nodes are kept in index order in a single vector, so node `n` of the
//! chain is `nodes[n]`. The chain only ever grows, and only [`QsetChain::trim`]
//! releases anything.

use crate::error::{Result, ScullError};

use super::Geometry;

/// One quantum buffer
type Quantum = Vec<u8>;

/// One node of the chain: a lazily allocated array of optional quanta
#[derive(Debug, Default)]
pub struct QsetNode {
    slots: Option<Vec<Option<Quantum>>>,
}

impl QsetNode {
    /// A node with no slot array yet
    pub fn empty() -> Self {
        Self { slots: None }
    }

    /// Whether the slot array has been allocated
    pub fn has_slots(&self) -> bool {
        self.slots.is_some()
    }

    /// Look up the quantum behind `slot` without allocating
    pub fn quantum(&self, slot: usize) -> Option<&[u8]> {
        self.slots.as_ref()?.get(slot)?.as_deref()
    }

    /// Get the quantum behind `slot`, allocating the slot array and the
    /// quantum buffer as needed
    ///
    /// A fresh quantum is zero-filled.
    pub fn quantum_or_alloc(&mut self, slot: usize, geometry: &Geometry) -> Result<&mut [u8]> {
        let slots = match &mut self.slots {
            Some(slots) => slots,
            absent => absent.insert(alloc_slots(geometry.qset())?),
        };

        let entry = slots.get_mut(slot).ok_or_else(|| {
            ScullError::InvalidArgument(format!(
                "slot {} outside qset of {}",
                slot,
                geometry.qset()
            ))
        })?;

        let quantum = match entry {
            Some(quantum) => quantum,
            absent => absent.insert(alloc_quantum(geometry.quantum())?),
        };

        Ok(quantum.as_mut_slice())
    }

    /// Number of allocated quanta in this node
    pub fn quanta(&self) -> usize {
        self.slots
            .as_ref()
            .map_or(0, |slots| slots.iter().filter(|q| q.is_some()).count())
    }

    /// Indices of the slots holding a quantum
    pub fn occupied_slots(&self) -> Vec<usize> {
        match &self.slots {
            Some(slots) => slots
                .iter()
                .enumerate()
                .filter_map(|(i, q)| q.as_ref().map(|_| i))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Chain of qset nodes owned by one device
#[derive(Debug, Default)]
pub struct QsetChain {
    nodes: Vec<QsetNode>,
}

impl QsetChain {
    /// Create an empty chain (no head)
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Number of materialized nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the chain has no head
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk to node `index` without allocating
    pub fn get(&self, index: u64) -> Option<&QsetNode> {
        let index = usize::try_from(index).ok()?;
        self.nodes.get(index)
    }

    /// Walk to node `index`, appending empty nodes until it exists
    ///
    /// On allocation failure the nodes appended so far stay in place; they
    /// are valid empty nodes.
    pub fn follow(&mut self, index: u64) -> Result<&mut QsetNode> {
        let index = usize::try_from(index).map_err(|_| ScullError::OutOfMemory)?;

        while self.nodes.len() <= index {
            self.nodes.try_reserve(1)?;
            self.nodes.push(QsetNode::empty());
        }

        Ok(&mut self.nodes[index])
    }

    /// The tail node, if any
    pub fn last(&self) -> Option<&QsetNode> {
        self.nodes.last()
    }

    /// Release every quantum, slot array and node
    ///
    /// Returns the number of nodes released.
    pub fn trim(&mut self) -> usize {
        let released = self.nodes.len();
        self.nodes = Vec::new();
        released
    }

    /// Count (nodes, slot arrays, quanta)
    pub fn census(&self) -> (usize, usize, usize) {
        self.nodes.iter().fold((0, 0, 0), |(nodes, arrays, quanta), node| {
            (
                nodes + 1,
                arrays + usize::from(node.has_slots()),
                quanta + node.quanta(),
            )
        })
    }
}

fn alloc_slots(qset: usize) -> Result<Vec<Option<Quantum>>> {
    let mut slots = Vec::new();
    slots.try_reserve_exact(qset)?;
    slots.resize_with(qset, || None);
    Ok(slots)
}

fn alloc_quantum(quantum: usize) -> Result<Quantum> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(quantum)?;
    buffer.resize(quantum, 0);
    Ok(buffer)
}
