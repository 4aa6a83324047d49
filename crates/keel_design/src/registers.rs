//! Register groups, registers, and fields.

use crate::attributes::Attributes;
use crate::ids::{FieldId, GroupId, RegisterId};
use crate::interconnect::EnumValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A register access kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Access {
    /// Read/write.
    RW,
    /// Read-only.
    RO,
    /// Write-only.
    WO,
    /// Write-one-to-set.
    WS,
    /// Write-one-to-clear.
    WC,
    /// Active write: value qualified by a strobe.
    AW,
    /// Active read: strobe raised on read.
    AR,
    /// Active read and write strobes.
    ARW,
}

impl Access {
    /// Parses a canonical access token (as produced by the validator).
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_uppercase().as_str() {
            "RW" => Some(Access::RW),
            "RO" => Some(Access::RO),
            "WO" => Some(Access::WO),
            "WS" => Some(Access::WS),
            "WC" => Some(Access::WC),
            "AW" => Some(Access::AW),
            "AR" => Some(Access::AR),
            "ARW" => Some(Access::ARW),
            _ => None,
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Access::RW => "RW",
            Access::RO => "RO",
            Access::WO => "WO",
            Access::WS => "WS",
            Access::WC => "WC",
            Access::AW => "AW",
            Access::AR => "AR",
            Access::ARW => "ARW",
        };
        write!(f, "{text}")
    }
}

/// A placed register group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterGroup {
    /// This group's id.
    pub id: GroupId,
    /// The placed group name (macro placements carry their prefix).
    pub name: String,
    /// Absolute byte offset of the group within the register set.
    pub offset: u64,
    /// Registers in placement order.
    pub registers: Vec<RegisterId>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

/// A placed register.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Register {
    /// This register's id.
    pub id: RegisterId,
    /// The register name (arrays carry an index suffix).
    pub name: String,
    /// Byte offset relative to the owning group.
    pub offset: u64,
    /// Width in bits.
    pub width: u32,
    /// Access from the bus.
    pub bus_access: Access,
    /// Access from the implementing block.
    pub block_access: Access,
    /// Access from instructions.
    pub inst_access: Access,
    /// Fields in placement order.
    pub fields: Vec<FieldId>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

impl Register {
    /// Returns the number of bytes the register occupies.
    pub fn byte_size(&self) -> u64 {
        u64::from(self.width.div_ceil(8))
    }
}

/// A placed register field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegisterField {
    /// This field's id.
    pub id: FieldId,
    /// The field name.
    pub name: String,
    /// Least significant bit within the register.
    pub lsb: u32,
    /// Width in bits.
    pub width: u32,
    /// Reset value (wrapped into the field width).
    pub reset: u64,
    /// Whether the field is signed.
    pub signed: bool,
    /// Enumerated values.
    pub enums: Vec<EnumValue>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_parse_and_display() {
        assert_eq!(Access::parse("rw"), Some(Access::RW));
        assert_eq!(Access::parse("ARW"), Some(Access::ARW));
        assert_eq!(Access::parse("nope"), None);
        assert_eq!(format!("{}", Access::WC), "WC");
    }

    #[test]
    fn byte_size_rounds_up() {
        let reg = Register {
            id: RegisterId::from_raw(0),
            name: "r".to_string(),
            offset: 0,
            width: 33,
            bus_access: Access::RW,
            block_access: Access::RW,
            inst_access: Access::RW,
            fields: Vec::new(),
            description: String::new(),
            attributes: Attributes::new(),
        };
        assert_eq!(reg.byte_size(), 5);
    }
}
