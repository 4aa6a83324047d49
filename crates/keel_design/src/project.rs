//! The project: root owner of every design-graph node.

use crate::arena::Arena;
use crate::block::Block;
use crate::command::Command;
use crate::connection::Connection;
use crate::define::Define;
use crate::ids::{
    BlockId, CommandId, DefineId, FieldId, GroupId, InterconnectId, PortId, RegisterId,
};
use crate::interconnect::Interconnect;
use crate::port::Port;
use crate::registers::{Register, RegisterField, RegisterGroup};
use indexmap::IndexMap;
use keel_common::InternalError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A reference to a principal or reference node of the project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeRef {
    /// An elaborated block.
    Block(BlockId),
    /// An interconnect type.
    Interconnect(InterconnectId),
    /// A register group.
    Group(GroupId),
    /// A command.
    Command(CommandId),
    /// A resolved define.
    Define(DefineId),
}

/// The root of the design graph.
///
/// Every node lives in one of the project's arenas; blocks, ports, and
/// register entities refer to each other by id. Principal nodes are the
/// elaboration results themselves, registered under unique names; reference
/// nodes are supporting definitions (interconnect types) shared by them.
#[derive(Debug, Serialize, Deserialize)]
pub struct Project {
    /// The project id (derived from the top file name).
    pub id: String,
    /// The top file path, if known.
    pub path: Option<PathBuf>,
    /// All blocks.
    pub blocks: Arena<BlockId, Block>,
    /// All ports.
    pub ports: Arena<PortId, Port>,
    /// All interconnect types.
    pub interconnects: Arena<InterconnectId, Interconnect>,
    /// All register groups.
    pub groups: Arena<GroupId, RegisterGroup>,
    /// All registers.
    pub registers: Arena<RegisterId, Register>,
    /// All register fields.
    pub fields: Arena<FieldId, RegisterField>,
    /// All commands.
    pub commands: Arena<CommandId, Command>,
    /// All resolved defines.
    pub defines: Arena<DefineId, Define>,
    principal: IndexMap<String, NodeRef>,
    reference: IndexMap<String, NodeRef>,
    interconnect_names: IndexMap<String, InterconnectId>,
}

impl Project {
    /// Creates an empty project.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: None,
            blocks: Arena::new(),
            ports: Arena::new(),
            interconnects: Arena::new(),
            groups: Arena::new(),
            registers: Arena::new(),
            fields: Arena::new(),
            commands: Arena::new(),
            defines: Arena::new(),
            principal: IndexMap::new(),
            reference: IndexMap::new(),
            interconnect_names: IndexMap::new(),
        }
    }

    /// Registers a principal node under a unique name.
    pub fn add_principal(
        &mut self,
        name: impl Into<String>,
        node: NodeRef,
    ) -> Result<(), InternalError> {
        let name = name.into();
        if self.principal.contains_key(&name) {
            return Err(InternalError::new(format!(
                "principal node `{name}` already exists in project `{}`",
                self.id
            )));
        }
        self.principal.insert(name, node);
        Ok(())
    }

    /// Registers a reference node; re-registration is idempotent.
    pub fn add_reference(&mut self, name: impl Into<String>, node: NodeRef) {
        self.reference.entry(name.into()).or_insert(node);
    }

    /// Iterates over principal nodes in attachment order.
    pub fn principal_nodes(&self) -> impl Iterator<Item = (&str, NodeRef)> {
        self.principal.iter().map(|(name, node)| (name.as_str(), *node))
    }

    /// Iterates over reference nodes in attachment order.
    pub fn reference_nodes(&self) -> impl Iterator<Item = (&str, NodeRef)> {
        self.reference.iter().map(|(name, node)| (name.as_str(), *node))
    }

    /// Returns the principal blocks in attachment order.
    pub fn principal_blocks(&self) -> Vec<BlockId> {
        self.principal
            .values()
            .filter_map(|node| match node {
                NodeRef::Block(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Records an interconnect type under its name (case-insensitive),
    /// replacing nothing if the name is already present.
    pub fn register_interconnect(&mut self, interconnect: Interconnect) -> InterconnectId {
        let key = interconnect.name.to_ascii_lowercase();
        if let Some(&existing) = self.interconnect_names.get(&key) {
            return existing;
        }
        let id = self.interconnects.alloc(interconnect);
        self.interconnect_names.insert(key, id);
        id
    }

    /// Looks up an interconnect type by name (case-insensitive).
    pub fn interconnect_by_name(&self, name: &str) -> Option<InterconnectId> {
        self.interconnect_names.get(&name.to_ascii_lowercase()).copied()
    }

    /// Returns the dot-separated instance path of a block from its root.
    pub fn hierarchical_path(&self, block: BlockId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(block);
        while let Some(id) = current {
            let node = &self.blocks[id];
            parts.push(node.name.clone());
            current = node.parent;
        }
        parts.reverse();
        parts.join(".")
    }

    /// Returns the path of a port as `block.path[port]`.
    pub fn port_path(&self, port: PortId) -> String {
        let node = &self.ports[port];
        format!("{}[{}]", self.hierarchical_path(node.block), node.name)
    }

    /// Finds a boundary port of a block by name.
    pub fn find_port(&self, block: BlockId, name: &str) -> Option<PortId> {
        self.blocks[block]
            .ports
            .iter()
            .copied()
            .find(|&p| self.ports[p].name == name)
    }

    /// Finds a child of a block by instance name.
    pub fn find_child(&self, block: BlockId, name: &str) -> Option<BlockId> {
        self.blocks[block]
            .children
            .iter()
            .copied()
            .find(|&c| self.blocks[c].name == name)
    }

    /// Returns the connections driving a specific port signal.
    ///
    /// Connections to a port live either in the block that owns the port
    /// (outputs driven from inside) or in its parent (inputs driven from
    /// outside).
    pub fn inbound_connections(&self, port: PortId, index: u32) -> Vec<Connection> {
        let mut found = Vec::new();
        let owner = self.ports[port].block;
        let mut scopes = vec![owner];
        if let Some(parent) = self.blocks[owner].parent {
            scopes.push(parent);
        }
        for scope in scopes {
            for conn in &self.blocks[scope].connections {
                if conn.target == port && conn.target_index == index {
                    found.push(*conn);
                }
            }
        }
        found
    }

    /// Returns `true` if any connection touches the port (as driver or
    /// target, any signal index).
    pub fn port_is_connected(&self, port: PortId) -> bool {
        let owner = self.ports[port].block;
        let mut scopes = vec![owner];
        if let Some(parent) = self.blocks[owner].parent {
            scopes.push(parent);
        }
        for scope in scopes {
            for conn in &self.blocks[scope].connections {
                if conn.target == port {
                    return true;
                }
                if let Some((driver, _)) = conn.driving_port() {
                    if driver == port {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Serializes the whole project to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
