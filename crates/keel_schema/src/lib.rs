//! Schema parsing and validation for the Keel pipeline.
//!
//! The preprocessor's output lines are read into tagged nodes, constructed
//! into typed records (accepting both mapping and sequence forms), and
//! validated against the declarative per-kind rule set. Records are
//! immutable after parsing.

#![warn(missing_docs)]

mod error;
pub mod node;
mod tags;
pub mod validate;

pub use error::ParseError;
pub use node::{Node, Scalar, TagBody, TagNode};
pub use tags::{
    Config, Connect, ConnectEnd, ConstTie, Def, DefineOverride, Doc, EnumDecl, Field, Group, His,
    HisPort, HisRef, Initiator, Inst, MacroRef, MapEntry, Mod, ModInst, Placement, Point,
    PortDecl, Reg, RegisterRef, TagCommon, Target, LEGACY_TAGS,
};
pub use validate::{normalize_access, validate_documents};

use keel_preprocess::OutLine;

/// Parses preprocessed output lines into typed schema documents.
pub fn parse_documents(lines: &[OutLine]) -> Result<Vec<Doc>, ParseError> {
    let nodes = node::read_documents(lines)?;
    tags::build_documents(nodes)
}

#[cfg(test)]
pub(crate) mod parse_test_support {
    //! Helpers for in-crate tests: parse documents straight from text.

    use super::*;
    use keel_source::{FileId, Loc};

    pub fn try_docs_from(text: &str) -> Result<Vec<Doc>, ParseError> {
        let lines: Vec<OutLine> = text
            .lines()
            .enumerate()
            .map(|(i, l)| OutLine::new(l, Loc::new(FileId::from_raw(0), (i + 1) as u32)))
            .collect();
        parse_documents(&lines)
    }

    pub fn docs_from(text: &str) -> Vec<Doc> {
        try_docs_from(text).expect("test input should parse")
    }
}

#[cfg(test)]
mod tests {
    use super::parse_test_support::docs_from;
    use super::*;

    #[test]
    fn mixed_document_stream() {
        let docs = docs_from(
            "- !Def [WIDTH, 8]\n- !His\n  name: wire\n  ports:\n  - !Port [sig]\n- !Mod\n  name: top\n  ports:\n  - !HisRef [sig_in, wire, \"\", 1, Slave]",
        );
        assert_eq!(docs.len(), 3);
        assert_eq!(docs[0].kind(), "Def");
        assert_eq!(docs[1].kind(), "His");
        assert_eq!(docs[2].kind(), "Mod");
    }

    #[test]
    fn sequence_and_mapping_forms_identical() {
        let seq = docs_from(
            "- !Mod\n  name: m\n  ports:\n  - !HisRef [cfg, axi4, \"Config port\", 2, Slave]",
        );
        let map = docs_from(
            "- !Mod\n  name: m\n  ports:\n  - !HisRef\n    name: cfg\n    type: axi4\n    sd: Config port\n    count: 2\n    role: Slave",
        );
        assert_eq!(seq, map);
    }
}
