//! The `!Inst` tag: an instruction record with optional inheritance.

use crate::error::ParseError;
use crate::node::TagNode;
use crate::tags::common::{
    opt, opt_string, options_list, req, req_string, slot, split_args, string_or, tag_items,
    TagCommon,
};
use crate::tags::registers::{build_field, Field};
use serde::{Deserialize, Serialize};

/// An instruction, possibly extending a base instruction.
///
/// Sequence form: `[name, base, decode_f, decode_e, options, sd, ld, fields]`.
/// When `base` is set, `decode_f` names the inherited field fixed at this
/// inheritance level and `decode_e` the enumerated value it is fixed to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inst {
    /// Common attributes.
    pub common: TagCommon,
    /// The extended instruction's name.
    pub base: Option<String>,
    /// The inherited field fixed at this level.
    pub decode_f: Option<String>,
    /// The enumerated value the fixed field takes.
    pub decode_e: Option<String>,
    /// Fields unique to this instruction.
    pub fields: Vec<Field>,
}

pub(crate) fn build_inst(tag: &TagNode) -> Result<Inst, ParseError> {
    let fields = [
        req("name"),
        opt("base"),
        opt("decode_f"),
        opt("decode_e"),
        opt("options"),
        opt("sd"),
        opt("ld"),
        opt("fields"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut inst_fields = Vec::new();
    for child in tag_items(slot(&slots, 7), &tag.tag, "fields", loc)? {
        if child.tag != "Field" {
            return Err(ParseError::WrongType {
                what: format!("`!Inst` fields contain `!{}`", child.tag),
                loc: child.loc,
            });
        }
        inst_fields.push(build_field(child)?);
    }
    Ok(Inst {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 5), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 6), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 4), &tag.tag, loc)?,
            loc,
        ),
        base: opt_string(slot(&slots, 1), &tag.tag, "base", loc)?
            .filter(|b| !b.trim().is_empty()),
        decode_f: opt_string(slot(&slots, 2), &tag.tag, "decode_f", loc)?
            .filter(|d| !d.trim().is_empty()),
        decode_e: opt_string(slot(&slots, 3), &tag.tag, "decode_e", loc)?
            .filter(|d| !d.trim().is_empty()),
        fields: inst_fields,
    })
}

#[cfg(test)]
mod tests {
    use crate::parse_test_support::docs_from;
    use crate::Doc;

    #[test]
    fn base_instruction() {
        let docs = docs_from(
            "- !Inst\n  name: alu_op\n  fields:\n  - !Field\n    name: opcode\n    width: 4\n    enums:\n    - !Enum [ADD, 0]\n    - !Enum [SUB, 1]",
        );
        let Doc::Inst(inst) = &docs[0] else {
            panic!("expected inst");
        };
        assert!(inst.base.is_none());
        assert_eq!(inst.fields.len(), 1);
        assert_eq!(inst.fields[0].enums.len(), 2);
    }

    #[test]
    fn derived_instruction() {
        let docs = docs_from(
            "- !Inst\n  name: add\n  base: alu_op\n  decode_f: opcode\n  decode_e: ADD\n  fields:\n  - !Field [operand, 8, 8]",
        );
        let Doc::Inst(inst) = &docs[0] else {
            panic!("expected inst");
        };
        assert_eq!(inst.base.as_deref(), Some("alu_op"));
        assert_eq!(inst.decode_f.as_deref(), Some("opcode"));
        assert_eq!(inst.decode_e.as_deref(), Some("ADD"));
    }
}
