//! Interconnect types and their components.

use crate::attributes::Attributes;
use crate::ids::InterconnectId;
use serde::{Deserialize, Serialize};

/// The net role of an interconnect, component, or leaf signal.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum NetRole {
    /// Drives the net.
    Master,
    /// Receives the net.
    Slave,
    /// Bidirectional.
    Bidir,
}

impl NetRole {
    /// Returns the role seen through a slave-roled reference link.
    ///
    /// Master and slave swap; bidirectional stays bidirectional.
    pub fn flipped(self) -> Self {
        match self {
            NetRole::Master => NetRole::Slave,
            NetRole::Slave => NetRole::Master,
            NetRole::Bidir => NetRole::Bidir,
        }
    }

    /// Parses a role keyword (case-insensitive).
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "master" => Some(NetRole::Master),
            "slave" => Some(NetRole::Slave),
            "bi" | "bidir" => Some(NetRole::Bidir),
            _ => None,
        }
    }
}

/// A named enumerated value on a simple component or register field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    /// The value name.
    pub name: String,
    /// The numeric value.
    pub value: i64,
    /// Description text.
    pub description: String,
}

/// What an interconnect component is made of.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ComponentKind {
    /// A primitive signal with a fixed width and default drive value.
    Simple {
        /// Width in bits.
        width: u32,
        /// Default drive value.
        default: i64,
    },
    /// A nested reference to another interconnect type.
    Complex {
        /// The referenced type name.
        his_type: String,
    },
}

/// One component of an interconnect type, in declaration order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InterconnectComponent {
    /// The component name.
    pub name: String,
    /// The component's own role within its parent type.
    pub role: NetRole,
    /// Simple signal or complex reference.
    pub kind: ComponentKind,
    /// Instance multiplicity.
    pub count: u32,
    /// Enumerated values (simple components only).
    pub enums: Vec<EnumValue>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

/// A typed multi-signal bus.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Interconnect {
    /// This interconnect's id.
    pub id: InterconnectId,
    /// The type name.
    pub name: String,
    /// The overall role of the type.
    pub role: NetRole,
    /// Components in declaration order.
    pub components: Vec<InterconnectComponent>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_flip() {
        assert_eq!(NetRole::Master.flipped(), NetRole::Slave);
        assert_eq!(NetRole::Slave.flipped(), NetRole::Master);
        assert_eq!(NetRole::Bidir.flipped(), NetRole::Bidir);
    }

    #[test]
    fn role_parse() {
        assert_eq!(NetRole::parse("Master"), Some(NetRole::Master));
        assert_eq!(NetRole::parse("SLAVE"), Some(NetRole::Slave));
        assert_eq!(NetRole::parse("bi"), Some(NetRole::Bidir));
        assert_eq!(NetRole::parse("sideways"), None);
    }

    #[test]
    fn double_flip_is_identity() {
        for role in [NetRole::Master, NetRole::Slave, NetRole::Bidir] {
            assert_eq!(role.flipped().flipped(), role);
        }
    }
}
