//! Interconnect-type tags: `!His`, `!HisRef`, `!Port`, `!Enum`.

use crate::error::ParseError;
use crate::node::TagNode;
use crate::tags::common::{
    opt, options_list, req, req_string, slot, split_args, string_or, tag_items, TagCommon,
};
use crate::tags::registers::{build_enum, EnumDecl};
use serde::{Deserialize, Serialize};

/// A primitive interconnect signal within a `!His`.
///
/// Sequence form: `[name, width, sd, count, default, role, ld, enum, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PortDecl {
    /// Common attributes.
    pub common: TagCommon,
    /// Signal width expression in bits.
    pub width: String,
    /// Instance multiplicity expression.
    pub count: String,
    /// Default drive value expression, or the name of one of the enums.
    pub default: String,
    /// Signal role: `master` or `slave` (case-insensitive).
    pub role: String,
    /// Enumerated values for the signal.
    pub enums: Vec<EnumDecl>,
}

/// An instantiation of a `!His`, either inside another `!His` or as a module
/// boundary port.
///
/// Sequence form: `[name, type, sd, count, role, ld, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HisRef {
    /// Common attributes.
    pub common: TagCommon,
    /// The referenced interconnect type name.
    pub his_type: String,
    /// Instance multiplicity expression.
    pub count: String,
    /// Role: `master` or `slave` (case-insensitive); a slave link inverts
    /// the net role of everything beneath it.
    pub role: String,
}

/// One component of a `!His`: a primitive signal or a nested reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum HisPort {
    /// A primitive signal.
    Port(PortDecl),
    /// A reference to another interconnect type.
    Ref(HisRef),
}

/// A named interconnect type.
///
/// Sequence form: `[name, ports, sd, role, ld, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct His {
    /// Common attributes.
    pub common: TagCommon,
    /// Overall role of the type.
    pub role: String,
    /// Components in declaration order.
    pub ports: Vec<HisPort>,
}

pub(crate) fn build_port(tag: &TagNode) -> Result<PortDecl, ParseError> {
    let fields = [
        req("name"),
        opt("width"),
        opt("sd"),
        opt("count"),
        opt("default"),
        opt("role"),
        opt("ld"),
        opt("enum"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut enums = Vec::new();
    for child in tag_items(slot(&slots, 7), &tag.tag, "enum", loc)? {
        if child.tag != "Enum" {
            return Err(ParseError::WrongType {
                what: format!("`!Port` enum list contains `!{}`", child.tag),
                loc: child.loc,
            });
        }
        enums.push(build_enum(child)?);
    }
    Ok(PortDecl {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 6), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 8), &tag.tag, loc)?,
            loc,
        ),
        width: string_or(slot(&slots, 1), &tag.tag, "width", "1", loc)?,
        count: string_or(slot(&slots, 3), &tag.tag, "count", "1", loc)?,
        default: string_or(slot(&slots, 4), &tag.tag, "default", "0", loc)?,
        role: string_or(slot(&slots, 5), &tag.tag, "role", "master", loc)?,
        enums,
    })
}

pub(crate) fn build_his_ref(tag: &TagNode) -> Result<HisRef, ParseError> {
    let fields = [
        req("name"),
        req("type"),
        opt("sd"),
        opt("count"),
        opt("role"),
        opt("ld"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(HisRef {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 5), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 6), &tag.tag, loc)?,
            loc,
        ),
        his_type: req_string(slot(&slots, 1), &tag.tag, "type", loc)?,
        count: string_or(slot(&slots, 3), &tag.tag, "count", "1", loc)?,
        role: string_or(slot(&slots, 4), &tag.tag, "role", "master", loc)?,
    })
}

pub(crate) fn build_his(tag: &TagNode) -> Result<His, ParseError> {
    let fields = [
        req("name"),
        req("ports"),
        opt("sd"),
        opt("role"),
        opt("ld"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut ports = Vec::new();
    for child in tag_items(slot(&slots, 1), &tag.tag, "ports", loc)? {
        match child.tag.as_str() {
            "Port" => ports.push(HisPort::Port(build_port(child)?)),
            "HisRef" => ports.push(HisPort::Ref(build_his_ref(child)?)),
            other => {
                return Err(ParseError::WrongType {
                    what: format!("`!His` ports contain `!{other}`; expected `!Port` or `!HisRef`"),
                    loc: child.loc,
                });
            }
        }
    }
    Ok(His {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 4), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 5), &tag.tag, loc)?,
            loc,
        ),
        role: string_or(slot(&slots, 3), &tag.tag, "role", "master", loc)?,
        ports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_test_support::docs_from;
    use crate::Doc;

    fn his_from(text: &str) -> His {
        let docs = docs_from(text);
        let Doc::His(his) = docs.into_iter().next().unwrap() else {
            panic!("expected his");
        };
        his
    }

    #[test]
    fn his_with_ports_and_refs() {
        let his = his_from(
            "- !His\n  name: axi4_lite\n  ports:\n  - !Port [awaddr, 32]\n  - !Port [awvalid]\n  - !HisRef [resp, axi4_resp, \"\", 1, Slave]",
        );
        assert_eq!(his.common.name, "axi4_lite");
        assert_eq!(his.ports.len(), 3);
        let HisPort::Port(awaddr) = &his.ports[0] else {
            panic!("expected port");
        };
        assert_eq!(awaddr.width, "32");
        assert_eq!(awaddr.role, "master");
        let HisPort::Ref(resp) = &his.ports[2] else {
            panic!("expected ref");
        };
        assert_eq!(resp.his_type, "axi4_resp");
        assert_eq!(resp.role, "Slave");
    }

    #[test]
    fn port_with_enum() {
        let his = his_from(
            "- !His\n  name: mode_bus\n  ports:\n  - !Port\n    name: mode\n    width: 2\n    enum:\n    - !Enum [OFF, 0]\n    - !Enum [ON, 1]",
        );
        let HisPort::Port(mode) = &his.ports[0] else {
            panic!("expected port");
        };
        assert_eq!(mode.enums.len(), 2);
        assert_eq!(mode.enums[0].common.name, "OFF");
        assert_eq!(mode.enums[0].val.as_deref(), Some("0"));
    }

    #[test]
    fn width_expression_kept_raw() {
        let his = his_from("- !His\n  name: data\n  ports:\n  - !Port [bits, DATA_W * 2]");
        let HisPort::Port(port) = &his.ports[0] else {
            panic!("expected port");
        };
        assert_eq!(port.width, "DATA_W * 2");
    }
}
