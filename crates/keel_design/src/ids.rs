//! Opaque ID newtypes for all design-graph nodes.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                Self(index)
            }

            fn as_raw(self) -> u32 {
                self.0
            }
        }
    };
}

define_id!(
    /// Opaque, copyable ID for a block in the design.
    BlockId
);

define_id!(
    /// Opaque, copyable ID for a port on a block.
    PortId
);

define_id!(
    /// Opaque, copyable ID for an interconnect type.
    InterconnectId
);

define_id!(
    /// Opaque, copyable ID for a register group.
    GroupId
);

define_id!(
    /// Opaque, copyable ID for a register.
    RegisterId
);

define_id!(
    /// Opaque, copyable ID for a register field.
    FieldId
);

define_id!(
    /// Opaque, copyable ID for a resolved define.
    DefineId
);

define_id!(
    /// Opaque, copyable ID for an instruction command.
    CommandId
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn id_roundtrip() {
        let id = BlockId::from_raw(42);
        assert_eq!(id.as_raw(), 42);
    }

    #[test]
    fn id_hash_in_set() {
        let mut set = HashSet::new();
        set.insert(PortId::from_raw(1));
        set.insert(PortId::from_raw(2));
        set.insert(PortId::from_raw(1));
        assert_eq!(set.len(), 2);
    }
}
