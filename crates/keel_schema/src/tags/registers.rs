//! Register-description tags: `!Group`, `!Reg`, `!Field`, `!Enum`,
//! `!Config`, `!Register`, `!Macro`, `!Define`.

use crate::error::ParseError;
use crate::node::TagNode;
use crate::tags::common::{
    opt, opt_string, options_list, req, req_string, slot, split_args, string_or, tag_items,
    TagCommon,
};
use keel_source::Loc;
use serde::{Deserialize, Serialize};

/// An enumerated value attached to a `!Port` or `!Field`.
///
/// Sequence form: `[name, val, sd, ld, options]`. A missing value continues
/// the automatic enumeration from the previous entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    /// Common attributes.
    pub common: TagCommon,
    /// The value expression, if fixed.
    pub val: Option<String>,
}

/// A bit field within a `!Reg` or `!Inst`.
///
/// Sequence form: `[name, width, lsb, type, reset, ld, sd, msb, enums, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Common attributes.
    pub common: TagCommon,
    /// Width expression in bits (defaults to 1 at elaboration).
    pub width: Option<String>,
    /// Fixed least-significant-bit expression.
    pub lsb: Option<String>,
    /// Signedness marker: `S` signed, `U` or `-` unsigned.
    pub field_type: String,
    /// Reset value expression.
    pub reset: Option<String>,
    /// Fixed most-significant-bit expression.
    pub msb: Option<String>,
    /// Enumerated values.
    pub enums: Vec<EnumDecl>,
}

/// A register within a `!Group`.
///
/// Sequence form: `[name, addr, array, align, blockaccess, busaccess,
/// instaccess, options, sd, ld, location, width, fields]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reg {
    /// Common attributes.
    pub common: TagCommon,
    /// Fixed address expression (group-relative, in the group's unit).
    pub addr: Option<String>,
    /// Instance multiplicity expression.
    pub array: String,
    /// Alignment expression (in the group's unit).
    pub align: String,
    /// Access from the implementing block.
    pub blockaccess: String,
    /// Access from the bus.
    pub busaccess: String,
    /// Access from instructions.
    pub instaccess: String,
    /// Implementation location: `internal`, `wrapper`, or `core`.
    pub location: String,
    /// Register width expression in bits.
    pub width: String,
    /// Fields in declaration order.
    pub fields: Vec<Field>,
}

/// An ordered collection of registers.
///
/// Sequence form: `[name, regs, type, sd, ld, options]`. A `macro`-typed
/// group may only be placed through a `!Macro` directive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Common attributes.
    pub common: TagCommon,
    /// Group type: `register` (default) or `macro`.
    pub group_type: String,
    /// Registers in declaration order.
    pub regs: Vec<Reg>,
}

/// A `!Register` placement directive within a `!Config`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterRef {
    /// The placed group's name.
    pub group: String,
    /// Where the directive was declared.
    pub loc: Loc,
}

/// A `!Macro` placement directive within a `!Config`.
///
/// Sequence form: `[name, group, array, align, ld]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MacroRef {
    /// The instance prefix for the placed copies.
    pub name: String,
    /// The placed group's name.
    pub group: String,
    /// Number of copies expression.
    pub array: Option<String>,
    /// Alignment expression for each copy.
    pub align: Option<String>,
    /// Long description.
    pub ld: String,
    /// Where the directive was declared.
    pub loc: Loc,
}

/// One entry in a `!Config` order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Placement {
    /// Place a group once.
    Register(RegisterRef),
    /// Place a macro group one or more times under a prefix.
    Macro(MacroRef),
}

/// The register-set layout directive.
///
/// Sequence form: `[order, name, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Common attributes (the name may be empty).
    pub common: TagCommon,
    /// Placement directives in declaration order.
    pub order: Vec<Placement>,
}

/// A `!Define` override of specific attributes of a named
/// `(group, reg[, field])` at instantiation.
///
/// For macro placements the `group` is the literal `MACRO` and `name` names
/// the macro prefix.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefineOverride {
    /// Macro prefix (for `group == "MACRO"` overrides).
    pub name: String,
    /// The targeted group name.
    pub group: String,
    /// The targeted register, if any.
    pub reg: Option<String>,
    /// The targeted field, if any.
    pub field: Option<String>,
    /// Override for `array`.
    pub array: Option<String>,
    /// Override for `align`.
    pub align: Option<String>,
    /// Override for `width`.
    pub width: Option<String>,
    /// Override for `reset`.
    pub reset: Option<String>,
    /// Override for `blockaccess`.
    pub blockaccess: Option<String>,
    /// Override for `busaccess`.
    pub busaccess: Option<String>,
    /// Override for `instaccess`.
    pub instaccess: Option<String>,
    /// Where the override was declared.
    pub loc: Loc,
}

pub(crate) fn build_enum(tag: &TagNode) -> Result<EnumDecl, ParseError> {
    let fields = [req("name"), opt("val"), opt("sd"), opt("ld"), opt("options")];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(EnumDecl {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 3), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 4), &tag.tag, loc)?,
            loc,
        ),
        val: opt_string(slot(&slots, 1), &tag.tag, "val", loc)?,
    })
}

pub(crate) fn build_field(tag: &TagNode) -> Result<Field, ParseError> {
    let fields = [
        req("name"),
        opt("width"),
        opt("lsb"),
        opt("type"),
        opt("reset"),
        opt("ld"),
        opt("sd"),
        opt("msb"),
        opt("enums"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut enums = Vec::new();
    for child in tag_items(slot(&slots, 8), &tag.tag, "enums", loc)? {
        if child.tag != "Enum" {
            return Err(ParseError::WrongType {
                what: format!("`!Field` enums contain `!{}`", child.tag),
                loc: child.loc,
            });
        }
        enums.push(build_enum(child)?);
    }
    Ok(Field {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 6), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 5), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 9), &tag.tag, loc)?,
            loc,
        ),
        width: opt_string(slot(&slots, 1), &tag.tag, "width", loc)?
            .filter(|w| w.trim() != "-"),
        lsb: opt_string(slot(&slots, 2), &tag.tag, "lsb", loc)?,
        field_type: string_or(slot(&slots, 3), &tag.tag, "type", "-", loc)?,
        reset: opt_string(slot(&slots, 4), &tag.tag, "reset", loc)?
            .filter(|r| r.trim() != "-"),
        msb: opt_string(slot(&slots, 7), &tag.tag, "msb", loc)?,
        enums,
    })
}

pub(crate) fn build_reg(tag: &TagNode) -> Result<Reg, ParseError> {
    let fields = [
        req("name"),
        opt("addr"),
        opt("array"),
        opt("align"),
        opt("blockaccess"),
        opt("busaccess"),
        opt("instaccess"),
        opt("options"),
        opt("sd"),
        opt("ld"),
        opt("location"),
        opt("width"),
        opt("fields"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut reg_fields = Vec::new();
    for child in tag_items(slot(&slots, 12), &tag.tag, "fields", loc)? {
        if child.tag != "Field" {
            return Err(ParseError::WrongType {
                what: format!("`!Reg` fields contain `!{}`", child.tag),
                loc: child.loc,
            });
        }
        reg_fields.push(build_field(child)?);
    }
    Ok(Reg {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 8), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 9), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 7), &tag.tag, loc)?,
            loc,
        ),
        addr: opt_string(slot(&slots, 1), &tag.tag, "addr", loc)?,
        array: string_or(slot(&slots, 2), &tag.tag, "array", "1", loc)?,
        align: string_or(slot(&slots, 3), &tag.tag, "align", "1", loc)?,
        blockaccess: string_or(slot(&slots, 4), &tag.tag, "blockaccess", "RW", loc)?,
        busaccess: string_or(slot(&slots, 5), &tag.tag, "busaccess", "RW", loc)?,
        instaccess: string_or(slot(&slots, 6), &tag.tag, "instaccess", "RW", loc)?,
        location: string_or(slot(&slots, 10), &tag.tag, "location", "", loc)?,
        width: string_or(slot(&slots, 11), &tag.tag, "width", "32", loc)?,
        fields: reg_fields,
    })
}

pub(crate) fn build_group(tag: &TagNode) -> Result<Group, ParseError> {
    let fields = [
        req("name"),
        req("regs"),
        opt("type"),
        opt("sd"),
        opt("ld"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut regs = Vec::new();
    for child in tag_items(slot(&slots, 1), &tag.tag, "regs", loc)? {
        if child.tag != "Reg" {
            return Err(ParseError::WrongType {
                what: format!("`!Group` regs contain `!{}`", child.tag),
                loc: child.loc,
            });
        }
        regs.push(build_reg(child)?);
    }
    Ok(Group {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 3), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 4), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 5), &tag.tag, loc)?,
            loc,
        ),
        group_type: string_or(slot(&slots, 2), &tag.tag, "type", "register", loc)?,
        regs,
    })
}

pub(crate) fn build_register_ref(tag: &TagNode) -> Result<RegisterRef, ParseError> {
    let fields = [req("group")];
    let slots = split_args(tag, &fields)?;
    Ok(RegisterRef {
        group: req_string(slot(&slots, 0), &tag.tag, "group", tag.loc)?,
        loc: tag.loc,
    })
}

pub(crate) fn build_macro_ref(tag: &TagNode) -> Result<MacroRef, ParseError> {
    let fields = [req("name"), req("group"), opt("array"), opt("align"), opt("ld")];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(MacroRef {
        name: req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
        group: req_string(slot(&slots, 1), &tag.tag, "group", loc)?,
        array: opt_string(slot(&slots, 2), &tag.tag, "array", loc)?.filter(|a| a.trim() != "-"),
        align: opt_string(slot(&slots, 3), &tag.tag, "align", loc)?.filter(|a| a.trim() != "-"),
        ld: string_or(slot(&slots, 4), &tag.tag, "ld", "", loc)?,
        loc,
    })
}

pub(crate) fn build_config(tag: &TagNode) -> Result<Config, ParseError> {
    let fields = [req("order"), opt("name"), opt("options")];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut order = Vec::new();
    for child in tag_items(slot(&slots, 0), &tag.tag, "order", loc)? {
        match child.tag.as_str() {
            "Register" => order.push(Placement::Register(build_register_ref(child)?)),
            "Macro" => order.push(Placement::Macro(build_macro_ref(child)?)),
            other => {
                return Err(ParseError::WrongType {
                    what: format!(
                        "`!Config` order contains `!{other}`; expected `!Register` or `!Macro`"
                    ),
                    loc: child.loc,
                });
            }
        }
    }
    Ok(Config {
        common: TagCommon::assemble(
            string_or(slot(&slots, 1), &tag.tag, "name", "", loc)?,
            String::new(),
            String::new(),
            options_list(slot(&slots, 2), &tag.tag, loc)?,
            loc,
        ),
        order,
    })
}

pub(crate) fn build_define_override(tag: &TagNode) -> Result<DefineOverride, ParseError> {
    let fields = [
        opt("name"),
        opt("group"),
        opt("reg"),
        opt("field"),
        opt("array"),
        opt("align"),
        opt("width"),
        opt("reset"),
        opt("blockaccess"),
        opt("busaccess"),
        opt("instaccess"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(DefineOverride {
        name: string_or(slot(&slots, 0), &tag.tag, "name", "", loc)?,
        group: string_or(slot(&slots, 1), &tag.tag, "group", "", loc)?,
        reg: opt_string(slot(&slots, 2), &tag.tag, "reg", loc)?,
        field: opt_string(slot(&slots, 3), &tag.tag, "field", loc)?,
        array: opt_string(slot(&slots, 4), &tag.tag, "array", loc)?,
        align: opt_string(slot(&slots, 5), &tag.tag, "align", loc)?,
        width: opt_string(slot(&slots, 6), &tag.tag, "width", loc)?,
        reset: opt_string(slot(&slots, 7), &tag.tag, "reset", loc)?,
        blockaccess: opt_string(slot(&slots, 8), &tag.tag, "blockaccess", loc)?,
        busaccess: opt_string(slot(&slots, 9), &tag.tag, "busaccess", loc)?,
        instaccess: opt_string(slot(&slots, 10), &tag.tag, "instaccess", loc)?,
        loc,
    })
}

#[cfg(test)]
mod tests {
    use crate::parse_test_support::docs_from;
    use crate::{Doc, Placement};

    #[test]
    fn group_with_regs_and_fields() {
        let docs = docs_from(
            "- !Group\n  name: ctrl\n  regs:\n  - !Reg\n    name: status\n    busaccess: RO\n    fields:\n    - !Field [ready, 1]\n    - !Field [error, 1, 1]",
        );
        let Doc::Group(group) = &docs[0] else {
            panic!("expected group");
        };
        assert_eq!(group.group_type, "register");
        assert_eq!(group.regs.len(), 1);
        let reg = &group.regs[0];
        assert_eq!(reg.busaccess, "RO");
        assert_eq!(reg.blockaccess, "RW");
        assert_eq!(reg.width, "32");
        assert_eq!(reg.fields.len(), 2);
        assert_eq!(reg.fields[1].lsb.as_deref(), Some("1"));
    }

    #[test]
    fn field_dash_placeholders_mean_absent() {
        let docs = docs_from(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [f, -, , -, -]",
        );
        let Doc::Group(group) = &docs[0] else {
            panic!("expected group");
        };
        let field = &group.regs[0].fields[0];
        assert!(field.width.is_none());
        assert!(field.reset.is_none());
    }

    #[test]
    fn config_order() {
        let docs = docs_from(
            "- !Config\n  order:\n  - !Register [ctrl]\n  - !Macro [dma, dma_chan, 4, 16]",
        );
        let Doc::Config(config) = &docs[0] else {
            panic!("expected config");
        };
        assert_eq!(config.order.len(), 2);
        assert!(matches!(&config.order[0], Placement::Register(r) if r.group == "ctrl"));
        let Placement::Macro(mac) = &config.order[1] else {
            panic!("expected macro");
        };
        assert_eq!(mac.name, "dma");
        assert_eq!(mac.group, "dma_chan");
        assert_eq!(mac.array.as_deref(), Some("4"));
    }

    #[test]
    fn define_override() {
        let docs = docs_from("- !Define\n  group: ctrl\n  reg: status\n  width: 16");
        let Doc::Define(def) = &docs[0] else {
            panic!("expected define");
        };
        assert_eq!(def.group, "ctrl");
        assert_eq!(def.reg.as_deref(), Some("status"));
        assert_eq!(def.width.as_deref(), Some("16"));
        assert!(def.field.is_none());
    }

    #[test]
    fn serde_roundtrip_preserves_attributes() {
        let docs = docs_from(
            "- !Group\n  name: ctrl\n  options: [BYTE]\n  regs:\n  - !Reg [status, 0, 1, 1, RO, RO, RO, [], \"Status register\"]",
        );
        let json = serde_json::to_string(&docs[0]).unwrap();
        let back: Doc = serde_json::from_str(&json).unwrap();
        assert_eq!(docs[0], back);
    }
}
