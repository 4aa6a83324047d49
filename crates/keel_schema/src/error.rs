//! Schema parsing errors.

use keel_source::Loc;

/// Errors raised while reading tagged documents into schema records.
///
/// Each error carries the [`Loc`] of the offending line; the driver resolves
/// it to a path through the source database when reporting.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// A `!Tag` named a tag kind that does not exist.
    #[error("line {}: unknown tag `!{tag}`", loc.line)]
    UnknownTag {
        /// The unrecognized tag name.
        tag: String,
        /// Location of the tag.
        loc: Loc,
    },

    /// A mapping-form record used an attribute the tag does not have.
    #[error("line {}: tag `!{tag}` has no attribute `{attribute}`", loc.line)]
    UnknownAttribute {
        /// The tag being constructed.
        tag: String,
        /// The unrecognized attribute name.
        attribute: String,
        /// Location of the record.
        loc: Loc,
    },

    /// A mapping-form record specified the same attribute twice.
    #[error("line {}: duplicate attribute `{attribute}` on tag `!{tag}`", loc.line)]
    DuplicateAttribute {
        /// The tag being constructed.
        tag: String,
        /// The duplicated attribute name.
        attribute: String,
        /// Location of the record.
        loc: Loc,
    },

    /// A mapping-form record omitted required attributes.
    #[error("line {}: tag `!{tag}` is missing required attributes: {missing}", loc.line)]
    MissingAttribute {
        /// The tag being constructed.
        tag: String,
        /// Comma-joined list of missing attribute names.
        missing: String,
        /// Location of the record.
        loc: Loc,
    },

    /// A sequence-form record had too few or too many items.
    #[error(
        "line {}: tag `!{tag}` takes between {needed} and {maximum} items, got {got}",
        loc.line
    )]
    BadArity {
        /// The tag being constructed.
        tag: String,
        /// The number of required items.
        needed: usize,
        /// The total number of accepted items.
        maximum: usize,
        /// The number of items supplied.
        got: usize,
        /// Location of the record.
        loc: Loc,
    },

    /// An attribute value had the wrong type.
    #[error("line {}: {what}", loc.line)]
    WrongType {
        /// What was expected and found.
        what: String,
        /// Location of the value.
        loc: Loc,
    },

    /// The document structure itself was malformed (indentation, flow
    /// syntax, stray text).
    #[error("line {}: {detail}", loc.line)]
    BadStructure {
        /// What went wrong.
        detail: String,
        /// Location of the problem.
        loc: Loc,
    },
}

impl ParseError {
    /// Returns the location the error refers to.
    pub fn loc(&self) -> Loc {
        match self {
            ParseError::UnknownTag { loc, .. }
            | ParseError::UnknownAttribute { loc, .. }
            | ParseError::DuplicateAttribute { loc, .. }
            | ParseError::MissingAttribute { loc, .. }
            | ParseError::BadArity { loc, .. }
            | ParseError::WrongType { loc, .. }
            | ParseError::BadStructure { loc, .. } => *loc,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_source::FileId;

    #[test]
    fn display_includes_line() {
        let err = ParseError::UnknownTag {
            tag: "Bogus".to_string(),
            loc: Loc::new(FileId::from_raw(0), 7),
        };
        assert_eq!(format!("{err}"), "line 7: unknown tag `!Bogus`");
    }
}
