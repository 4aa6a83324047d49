//! Elaborated blocks.

use crate::address_map::AddressMap;
use crate::attributes::Attributes;
use crate::connection::Connection;
use crate::ids::{BlockId, GroupId, PortId};
use serde::{Deserialize, Serialize};

/// An elaborated module instance.
///
/// Blocks form a tree: children hold their parent's id (a weak
/// up-reference), and the parent lists its children in declaration order.
/// Connections formed inside this block — between its boundary ports and
/// its children, or between children — live here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Block {
    /// This block's id.
    pub id: BlockId,
    /// The instance name.
    pub name: String,
    /// The module type name this block was elaborated from.
    pub block_type: String,
    /// The parent block, or `None` for the root.
    pub parent: Option<BlockId>,
    /// Description text.
    pub description: String,
    /// Boundary ports in declaration order.
    pub ports: Vec<PortId>,
    /// Child blocks in declaration order.
    pub children: Vec<BlockId>,
    /// Connection edges formed within this block.
    pub connections: Vec<Connection>,
    /// Register groups attached to this block.
    pub registers: Vec<GroupId>,
    /// The block's address map, if it declares one.
    pub address_map: Option<AddressMap>,
    /// The principal clock port for distribution, if nominated.
    pub principal_clock: Option<PortId>,
    /// The principal reset port for distribution, if nominated.
    pub principal_reset: Option<PortId>,
    /// Free-form attributes.
    pub attributes: Attributes,
}

impl Block {
    /// Creates an empty block with the given identity.
    pub fn new(
        id: BlockId,
        name: impl Into<String>,
        block_type: impl Into<String>,
        parent: Option<BlockId>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            block_type: block_type.into(),
            parent,
            description: description.into(),
            ports: Vec::new(),
            children: Vec::new(),
            connections: Vec::new(),
            registers: Vec::new(),
            address_map: None,
            principal_clock: None,
            principal_reset: None,
            attributes: Attributes::new(),
        }
    }

    /// Returns `true` if this block has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
