//! Typed schema records and their construction from tagged nodes.

pub(crate) mod common;
mod def;
mod instruction;
mod interconnect;
mod module;
mod registers;

pub use common::TagCommon;
pub use def::Def;
pub use instruction::Inst;
pub use interconnect::{His, HisPort, HisRef, PortDecl};
pub use module::{
    Connect, ConnectEnd, ConstTie, Initiator, MapEntry, Mod, ModInst, Point, Target,
};
pub use registers::{
    Config, DefineOverride, EnumDecl, Field, Group, MacroRef, Placement, Reg, RegisterRef,
};

use crate::error::ParseError;
use crate::node::TagNode;
use keel_source::Loc;
use serde::{Deserialize, Serialize};

/// Tags accepted for compatibility and otherwise ignored.
pub const LEGACY_TAGS: &[&str] = &["File", "Req", "Spec", "Unroll", "Map"];

/// Tags that only appear nested inside other records.
const NESTED_TAGS: &[&str] = &[
    "Port", "HisRef", "Enum", "Field", "Reg", "Register", "Macro", "Point", "Const", "Connect",
    "ModInst", "Initiator", "Target",
];

/// A top-level schema document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Doc {
    /// A named constant.
    Def(Def),
    /// An attribute override for a register-set instantiation.
    Define(DefineOverride),
    /// An interconnect type.
    His(His),
    /// A module declaration.
    Mod(Mod),
    /// A register-set layout directive.
    Config(Config),
    /// A register group.
    Group(Group),
    /// An instruction.
    Inst(Inst),
    /// A legacy tag, accepted and ignored.
    Legacy {
        /// The legacy tag name.
        tag: String,
        /// Where it was declared.
        loc: Loc,
    },
}

impl Doc {
    /// Returns the document's name (empty for unnamed kinds).
    pub fn name(&self) -> &str {
        match self {
            Doc::Def(d) => &d.common.name,
            Doc::Define(d) => &d.name,
            Doc::His(h) => &h.common.name,
            Doc::Mod(m) => &m.common.name,
            Doc::Config(c) => &c.common.name,
            Doc::Group(g) => &g.common.name,
            Doc::Inst(i) => &i.common.name,
            Doc::Legacy { .. } => "",
        }
    }

    /// Returns the document's declaration location.
    pub fn loc(&self) -> Loc {
        match self {
            Doc::Def(d) => d.common.loc,
            Doc::Define(d) => d.loc,
            Doc::His(h) => h.common.loc,
            Doc::Mod(m) => m.common.loc,
            Doc::Config(c) => c.common.loc,
            Doc::Group(g) => g.common.loc,
            Doc::Inst(i) => i.common.loc,
            Doc::Legacy { loc, .. } => *loc,
        }
    }

    /// Returns the tag name of this document kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Doc::Def(_) => "Def",
            Doc::Define(_) => "Define",
            Doc::His(_) => "His",
            Doc::Mod(_) => "Mod",
            Doc::Config(_) => "Config",
            Doc::Group(_) => "Group",
            Doc::Inst(_) => "Inst",
            Doc::Legacy { .. } => "Legacy",
        }
    }
}

/// Builds typed documents from top-level tagged nodes.
pub fn build_documents(nodes: Vec<TagNode>) -> Result<Vec<Doc>, ParseError> {
    nodes.into_iter().map(|node| build_document(&node)).collect()
}

fn build_document(node: &TagNode) -> Result<Doc, ParseError> {
    match node.tag.as_str() {
        "Def" => Ok(Doc::Def(def::build_def(node)?)),
        "Define" => Ok(Doc::Define(registers::build_define_override(node)?)),
        "His" => Ok(Doc::His(interconnect::build_his(node)?)),
        "Mod" => Ok(Doc::Mod(module::build_mod(node)?)),
        "Config" => Ok(Doc::Config(registers::build_config(node)?)),
        "Group" => Ok(Doc::Group(registers::build_group(node)?)),
        "Inst" => Ok(Doc::Inst(instruction::build_inst(node)?)),
        tag if LEGACY_TAGS.contains(&tag) => Ok(Doc::Legacy {
            tag: tag.to_string(),
            loc: node.loc,
        }),
        tag if NESTED_TAGS.contains(&tag) => Err(ParseError::BadStructure {
            detail: format!("tag `!{tag}` is not allowed at the top level"),
            loc: node.loc,
        }),
        tag => Err(ParseError::UnknownTag {
            tag: tag.to_string(),
            loc: node.loc,
        }),
    }
}
