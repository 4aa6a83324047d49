//! The elaborated design graph.
//!
//! A [`Project`] owns every node of the graph in dense arenas and registers
//! principal nodes by unique id. Blocks form a tree through parent/child
//! ids; connections, register sets, and address maps hang off their owning
//! block. Every node carries a free-form attribute map and serializes to
//! JSON through serde.

#![warn(missing_docs)]

mod address_map;
mod arena;
mod attributes;
mod block;
mod command;
mod connection;
mod define;
mod ids;
mod interconnect;
mod port;
mod project;
mod registers;

pub use address_map::{AddressMap, AddressMapInitiator, AddressMapTarget};
pub use arena::{Arena, ArenaId};
pub use attributes::{flag_set, AttrValue, Attributes};
pub use block::Block;
pub use command::{Command, CommandField};
pub use connection::{Connection, Driver};
pub use define::Define;
pub use ids::{BlockId, CommandId, DefineId, FieldId, GroupId, InterconnectId, PortId, RegisterId};
pub use interconnect::{ComponentKind, EnumValue, Interconnect, InterconnectComponent, NetRole};
pub use port::{Direction, Port};
pub use project::{NodeRef, Project};
pub use registers::{Access, Register, RegisterField, RegisterGroup};
