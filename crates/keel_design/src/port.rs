//! Elaborated ports.

use crate::attributes::Attributes;
use crate::ids::{BlockId, PortId};
use serde::{Deserialize, Serialize};

/// The direction of a port relative to its block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Direction {
    /// Signals flow into the block.
    Input,
    /// Signals flow out of the block.
    Output,
    /// Bidirectional; treated as inbound for connection purposes.
    Inout,
}

/// A boundary port of an elaborated block.
///
/// A port carries `count` parallel instances of its interconnect type; each
/// instance is addressed by a signal index.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Port {
    /// This port's id.
    pub id: PortId,
    /// The port name.
    pub name: String,
    /// The name of the port's interconnect type.
    pub his_type: String,
    /// The number of parallel signal instances.
    pub count: u32,
    /// The direction relative to the owning block.
    pub direction: Direction,
    /// The owning block.
    pub block: BlockId,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_equality() {
        assert_eq!(Direction::Input, Direction::Input);
        assert_ne!(Direction::Input, Direction::Output);
    }
}
