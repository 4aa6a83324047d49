//! Rule violations and their waiver identifiers.

use keel_common::ContentHash;
use keel_design::NodeRef;

/// A recoverable rule violation.
///
/// Carries the offending node, its hierarchical path and kind, the name of
/// the check that raised it, and the message. The waiver id hashes exactly
/// those identity fields — node attributes and other derived state are
/// excluded, so system-local data never shifts the hash.
#[derive(Clone, Debug)]
pub struct RuleViolation {
    /// The node the violation is about.
    pub node: NodeRef,
    /// The node's hierarchical path (or name).
    pub node_path: String,
    /// The node's kind, e.g. `Block`.
    pub node_kind: &'static str,
    /// The name of the check that raised the violation.
    pub check: String,
    /// The violation message.
    pub message: String,
}

impl RuleViolation {
    /// Creates a new violation.
    pub fn new(
        node: NodeRef,
        node_path: impl Into<String>,
        node_kind: &'static str,
        check: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            node,
            node_path: node_path.into(),
            node_kind: node_kind.into(),
            check: check.into(),
            message: message.into(),
        }
    }

    /// Computes the stable waiver identifier of this violation.
    pub fn id(&self) -> ContentHash {
        let material = format!(
            "{}\n{}\n{}\n{}",
            self.node_path, self.node_kind, self.check, self.message
        );
        ContentHash::from_bytes(material.as_bytes())
    }
}

/// A violation so severe that the rest of the check (and checking overall)
/// would be meaningless.
#[derive(Clone, Debug, thiserror::Error)]
#[error("critical violation from {}: {}", violation.check, violation.message)]
pub struct CriticalViolation {
    /// The underlying violation.
    pub violation: RuleViolation,
}

impl CriticalViolation {
    /// Creates a new critical violation.
    pub fn new(violation: RuleViolation) -> Self {
        Self { violation }
    }
}
