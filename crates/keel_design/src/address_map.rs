//! Address maps: initiators, targets, and their constraint edges.

use crate::ids::PortId;
use serde::{Deserialize, Serialize};

/// A boundary port acting as the ingress of a block's address distribution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddressMapInitiator {
    /// The boundary port.
    pub port: PortId,
    /// The signal index within the port.
    pub index: u32,
    /// The address mask: the initiator can address `offset ..= offset + mask`.
    pub mask: u64,
    /// The base offset of the initiator's window.
    pub offset: u64,
}

/// A boundary port receiving a contiguous absolute-address aperture.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AddressMapTarget {
    /// The boundary port.
    pub port: PortId,
    /// The signal index within the port.
    pub index: u32,
    /// The absolute base address of the aperture.
    pub offset: u64,
    /// The aperture size in bytes.
    pub aperture: u64,
}

/// The address map of one block.
///
/// Constraint edges restrict which initiators reach which targets; a map
/// with no constraints lets every initiator reach every target.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressMap {
    /// Initiators in declaration order.
    pub initiators: Vec<AddressMapInitiator>,
    /// Targets in declaration order.
    pub targets: Vec<AddressMapTarget>,
    /// Explicit `(initiator, target)` index pairs.
    pub constraints: Vec<(usize, usize)>,
}

impl AddressMap {
    /// Creates an empty address map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint edge between an initiator and a target.
    pub fn add_constraint(&mut self, initiator: usize, target: usize) {
        if !self.constraints.contains(&(initiator, target)) {
            self.constraints.push((initiator, target));
        }
    }

    /// Finds the target attached to a port signal, if any.
    pub fn target_for(&self, port: PortId, index: u32) -> Option<&AddressMapTarget> {
        self.targets
            .iter()
            .find(|t| t.port == port && t.index == index)
    }

    /// Returns the initiators that can reach the given target index.
    pub fn initiators_for_target(&self, target: usize) -> Vec<&AddressMapInitiator> {
        if self.constraints.is_empty() {
            self.initiators.iter().collect()
        } else {
            self.constraints
                .iter()
                .filter(|(_, t)| *t == target)
                .filter_map(|(i, _)| self.initiators.get(*i))
                .collect()
        }
    }

    /// Returns the index of a target within the map.
    pub fn target_index(&self, port: PortId, index: u32) -> Option<usize> {
        self.targets
            .iter()
            .position(|t| t.port == port && t.index == index)
    }
}
