//! Elaborated instruction commands.

use crate::attributes::Attributes;
use crate::ids::CommandId;
use crate::interconnect::EnumValue;
use serde::{Deserialize, Serialize};

/// One field of a command.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommandField {
    /// The field name.
    pub name: String,
    /// Least significant bit within the command word.
    pub lsb: u32,
    /// Width in bits.
    pub width: u32,
    /// Reset/fixed value.
    pub reset: i64,
    /// Whether the field is signed.
    pub signed: bool,
    /// `true` when the field came from an ancestor instruction.
    pub inherited: bool,
    /// Enumerated values.
    pub enums: Vec<EnumValue>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

/// An instruction with its inheritance collapsed into a flat field set.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Command {
    /// This command's id.
    pub id: CommandId,
    /// The instruction name.
    pub name: String,
    /// The command word width in bits.
    pub width: u32,
    /// Fields in layout order; ancestors' fields come first.
    pub fields: Vec<CommandField>,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inherited_marker() {
        let field = CommandField {
            name: "opcode".to_string(),
            lsb: 0,
            width: 4,
            reset: 0,
            signed: false,
            inherited: true,
            enums: Vec::new(),
            description: String::new(),
            attributes: Attributes::new(),
        };
        assert!(field.inherited);
    }
}
