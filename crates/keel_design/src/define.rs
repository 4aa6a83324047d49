//! Resolved named constants.

use crate::attributes::Attributes;
use crate::ids::DefineId;
use serde::{Deserialize, Serialize};

/// A named constant with its fully resolved integer value.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Define {
    /// This define's id.
    pub id: DefineId,
    /// The constant name.
    pub name: String,
    /// The resolved value.
    pub value: i64,
    /// Description text.
    pub description: String,
    /// Free-form attributes.
    pub attributes: Attributes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct() {
        let define = Define {
            id: DefineId::from_raw(0),
            name: "CLOCK_MHZ".to_string(),
            value: 450,
            description: String::new(),
            attributes: Attributes::new(),
        };
        assert_eq!(define.value, 450);
    }
}
