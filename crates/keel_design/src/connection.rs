//! Connection edges between port signals.

use crate::ids::PortId;
use serde::{Deserialize, Serialize};

/// The driving end of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Driver {
    /// A signal of another port drives the target.
    Port {
        /// The driving port.
        port: PortId,
        /// The driving signal index.
        index: u32,
    },
    /// A literal constant drives the target.
    Const {
        /// The tied value.
        value: i64,
    },
}

/// One connection edge: a driver wired to one target signal.
///
/// Connections are owned by the block inside which they were formed (the
/// common parent of both endpoints).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    /// What drives the target signal.
    pub driver: Driver,
    /// The receiving port.
    pub target: PortId,
    /// The receiving signal index.
    pub target_index: u32,
}

impl Connection {
    /// Creates a port-to-port connection edge.
    pub fn wire(port: PortId, index: u32, target: PortId, target_index: u32) -> Self {
        Self {
            driver: Driver::Port { port, index },
            target,
            target_index,
        }
    }

    /// Creates a constant tie edge.
    pub fn tie(value: i64, target: PortId, target_index: u32) -> Self {
        Self {
            driver: Driver::Const { value },
            target,
            target_index,
        }
    }

    /// Returns the driving port and index, unless the driver is a constant.
    pub fn driving_port(&self) -> Option<(PortId, u32)> {
        match self.driver {
            Driver::Port { port, index } => Some((port, index)),
            Driver::Const { .. } => None,
        }
    }
}
