//! Free-form node attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An attribute value attached to a design-graph node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer value.
    Int(i64),
    /// A string value.
    Str(String),
}

impl AttrValue {
    /// Returns `true` if this value is `Bool(true)`.
    pub fn is_set(&self) -> bool {
        matches!(self, AttrValue::Bool(true))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

/// The attribute map of a node, preserving insertion order.
///
/// Attributes are free-form and excluded from waiver hashing: they may hold
/// system-local data such as absolute source paths.
pub type Attributes = IndexMap<String, AttrValue>;

/// Returns `true` if the named flag is present and set.
pub fn flag_set(attributes: &Attributes, name: &str) -> bool {
    attributes.get(name).is_some_and(AttrValue::is_set)
}
