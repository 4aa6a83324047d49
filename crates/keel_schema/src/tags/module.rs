//! Module-structure tags: `!Mod`, `!ModInst`, `!Connect`, `!Point`,
//! `!Const`, `!Initiator`, `!Target`.

use crate::error::ParseError;
use crate::node::{Node, TagNode};
use crate::tags::common::{
    opt, opt_string, options_list, req, req_string, slot, split_args, string_or, tag_items,
    TagCommon,
};
use crate::tags::interconnect::{build_his_ref, HisRef};
use keel_source::Loc;
use serde::{Deserialize, Serialize};

/// A reference to a port signal: `(port, module?, signal_index?)`.
///
/// Sequence form: `[port, mod, index]`. A point without a module names a
/// boundary port of the enclosing block. In address-map entries the second
/// position is also accepted as the signal index for compatibility.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// The referenced port name.
    pub port: String,
    /// The child instance carrying the port, or `None` for a boundary port.
    pub module: Option<String>,
    /// The signal index expression within the port.
    pub index: Option<String>,
    /// Where the point was declared.
    pub loc: Loc,
}

/// A literal integer source for a connection.
///
/// Sequence form: `[value, name]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConstTie {
    /// The tied value expression.
    pub value: String,
    /// Where the constant was declared.
    pub loc: Loc,
}

/// One endpoint in a `!Connect` constants list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConnectEnd {
    /// A port reference.
    Point(Point),
    /// A literal constant source.
    Const(ConstTie),
}

/// An explicit wiring directive.
///
/// Sequence form: `[points, name, sd, ld, options, constants]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Connect {
    /// Common attributes.
    pub common: TagCommon,
    /// The connected points in declaration order.
    pub points: Vec<Point>,
    /// Constant-tie endpoints (one `!Const` plus tied points).
    pub constants: Vec<ConnectEnd>,
}

/// A child module instantiation.
///
/// Sequence form: `[name, type, sd, count, ld, options]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModInst {
    /// Common attributes (`name` is the instance name).
    pub common: TagCommon,
    /// The instantiated module type name.
    pub mod_type: String,
    /// Instance multiplicity expression.
    pub count: String,
}

/// An address-map initiator: a boundary port that distributes addresses.
///
/// Sequence form: `[port, mask, offset, constrain]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Initiator {
    /// The boundary port reference.
    pub port: Point,
    /// Address mask expression.
    pub mask: String,
    /// Address offset expression.
    pub offset: String,
    /// Targets this initiator is constrained to reach.
    pub constrain: Vec<Point>,
    /// Where the initiator was declared.
    pub loc: Loc,
}

/// An address-map target: a boundary port that receives an aperture.
///
/// Sequence form: `[port, offset, aperture, constrain]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// The boundary port reference.
    pub port: Point,
    /// Absolute offset expression of the aperture.
    pub offset: String,
    /// Aperture size expression in bytes.
    pub aperture: String,
    /// Initiators this target is constrained to.
    pub constrain: Vec<Point>,
    /// Where the target was declared.
    pub loc: Loc,
}

/// One entry of a module's address map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapEntry {
    /// An ingress port.
    Initiator(Initiator),
    /// An egress port.
    Target(Target),
}

/// A module declaration.
///
/// Sequence form: `[name, ports, options, sd, modules, connections, ld,
/// defaults, clk_root, rst_root, addressmap, extends]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mod {
    /// Common attributes.
    pub common: TagCommon,
    /// Boundary ports.
    pub ports: Vec<HisRef>,
    /// Child module instantiations.
    pub modules: Vec<ModInst>,
    /// Explicit connections.
    pub connections: Vec<Connect>,
    /// Points intentionally left unconnected.
    pub defaults: Vec<Point>,
    /// Output point acting as the clock root for distribution.
    pub clk_root: Option<Point>,
    /// Output point acting as the reset root for distribution.
    pub rst_root: Option<Point>,
    /// Address-map entries.
    pub addressmap: Vec<MapEntry>,
    /// Name of a module this one extends.
    pub extends: Option<String>,
}

pub(crate) fn build_point(tag: &TagNode) -> Result<Point, ParseError> {
    let fields = [
        req("port"),
        opt("mod"),
        opt("index"),
        opt("name"),
        opt("sd"),
        opt("ld"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(Point {
        port: req_string(slot(&slots, 0), &tag.tag, "port", loc)?,
        module: opt_string(slot(&slots, 1), &tag.tag, "mod", loc)?
            .filter(|m| !m.trim().is_empty()),
        index: opt_string(slot(&slots, 2), &tag.tag, "index", loc)?,
        loc,
    })
}

pub(crate) fn build_const(tag: &TagNode) -> Result<ConstTie, ParseError> {
    let fields = [req("value"), opt("name")];
    let slots = split_args(tag, &fields)?;
    Ok(ConstTie {
        value: req_string(slot(&slots, 0), &tag.tag, "value", tag.loc)?,
        loc: tag.loc,
    })
}

pub(crate) fn build_connect(tag: &TagNode) -> Result<Connect, ParseError> {
    let fields = [
        opt("points"),
        opt("name"),
        opt("sd"),
        opt("ld"),
        opt("options"),
        opt("constants"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    let mut points = Vec::new();
    for child in tag_items(slot(&slots, 0), &tag.tag, "points", loc)? {
        if child.tag != "Point" {
            return Err(ParseError::WrongType {
                what: format!("`!Connect` points contain `!{}`", child.tag),
                loc: child.loc,
            });
        }
        points.push(build_point(child)?);
    }
    let mut constants = Vec::new();
    for child in tag_items(slot(&slots, 5), &tag.tag, "constants", loc)? {
        match child.tag.as_str() {
            "Point" => constants.push(ConnectEnd::Point(build_point(child)?)),
            "Const" => constants.push(ConnectEnd::Const(build_const(child)?)),
            other => {
                return Err(ParseError::WrongType {
                    what: format!(
                        "`!Connect` constants contain `!{other}`; expected `!Point` or `!Const`"
                    ),
                    loc: child.loc,
                });
            }
        }
    }
    Ok(Connect {
        common: TagCommon::assemble(
            string_or(slot(&slots, 1), &tag.tag, "name", "", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 3), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 4), &tag.tag, loc)?,
            loc,
        ),
        points,
        constants,
    })
}

pub(crate) fn build_mod_inst(tag: &TagNode) -> Result<ModInst, ParseError> {
    let fields = [
        req("name"),
        req("type"),
        opt("sd"),
        opt("count"),
        opt("ld"),
        opt("options"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(ModInst {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 2), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 4), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 5), &tag.tag, loc)?,
            loc,
        ),
        mod_type: req_string(slot(&slots, 1), &tag.tag, "type", loc)?,
        count: string_or(slot(&slots, 3), &tag.tag, "count", "1", loc)?,
    })
}

/// Extracts a single `!Point` from a value that may be the tag itself or a
/// one-element list.
fn single_point(node: Option<&Node>, tag: &str, what: &str, loc: Loc) -> Result<Point, ParseError> {
    match node {
        Some(Node::Tag(child)) if child.tag == "Point" => build_point(child),
        Some(Node::List(items, _)) if items.len() == 1 => {
            if let Node::Tag(child) = &items[0] {
                if child.tag == "Point" {
                    return build_point(child);
                }
            }
            Err(ParseError::WrongType {
                what: format!("`!{tag}` attribute `{what}` must be a `!Point`"),
                loc,
            })
        }
        _ => Err(ParseError::WrongType {
            what: format!("`!{tag}` attribute `{what}` must be a `!Point`"),
            loc,
        }),
    }
}

fn point_list(node: Option<&Node>, tag: &str, what: &str, loc: Loc) -> Result<Vec<Point>, ParseError> {
    let mut out = Vec::new();
    for child in tag_items(node, tag, what, loc)? {
        if child.tag != "Point" {
            return Err(ParseError::WrongType {
                what: format!("`!{tag}` {what} contain `!{}`", child.tag),
                loc: child.loc,
            });
        }
        out.push(build_point(child)?);
    }
    Ok(out)
}

pub(crate) fn build_initiator(tag: &TagNode) -> Result<Initiator, ParseError> {
    let fields = [req("port"), opt("mask"), opt("offset"), opt("constrain")];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(Initiator {
        port: single_point(slot(&slots, 0), &tag.tag, "port", loc)?,
        mask: string_or(slot(&slots, 1), &tag.tag, "mask", "0xFFFFFFFF", loc)?,
        offset: string_or(slot(&slots, 2), &tag.tag, "offset", "0", loc)?,
        constrain: point_list(slot(&slots, 3), &tag.tag, "constrain", loc)?,
        loc,
    })
}

pub(crate) fn build_target(tag: &TagNode) -> Result<Target, ParseError> {
    let fields = [req("port"), opt("offset"), opt("aperture"), opt("constrain")];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;
    Ok(Target {
        port: single_point(slot(&slots, 0), &tag.tag, "port", loc)?,
        offset: string_or(slot(&slots, 1), &tag.tag, "offset", "0", loc)?,
        aperture: string_or(slot(&slots, 2), &tag.tag, "aperture", "0xFFFFFFFF", loc)?,
        constrain: point_list(slot(&slots, 3), &tag.tag, "constrain", loc)?,
        loc,
    })
}

fn optional_point(node: Option<&Node>, tag: &str, what: &str, loc: Loc) -> Result<Option<Point>, ParseError> {
    match node {
        None => Ok(None),
        some => single_point(some, tag, what, loc).map(Some),
    }
}

pub(crate) fn build_mod(tag: &TagNode) -> Result<Mod, ParseError> {
    let fields = [
        req("name"),
        req("ports"),
        opt("options"),
        opt("sd"),
        opt("modules"),
        opt("connections"),
        opt("ld"),
        opt("defaults"),
        opt("clk_root"),
        opt("rst_root"),
        opt("addressmap"),
        opt("extends"),
    ];
    let slots = split_args(tag, &fields)?;
    let loc = tag.loc;

    let mut ports = Vec::new();
    for child in tag_items(slot(&slots, 1), &tag.tag, "ports", loc)? {
        if child.tag != "HisRef" {
            return Err(ParseError::WrongType {
                what: format!("`!Mod` ports contain `!{}`; expected `!HisRef`", child.tag),
                loc: child.loc,
            });
        }
        ports.push(build_his_ref(child)?);
    }

    let mut modules = Vec::new();
    for child in tag_items(slot(&slots, 4), &tag.tag, "modules", loc)? {
        if child.tag != "ModInst" {
            return Err(ParseError::WrongType {
                what: format!("`!Mod` modules contain `!{}`; expected `!ModInst`", child.tag),
                loc: child.loc,
            });
        }
        modules.push(build_mod_inst(child)?);
    }

    let mut connections = Vec::new();
    for child in tag_items(slot(&slots, 5), &tag.tag, "connections", loc)? {
        if child.tag != "Connect" {
            return Err(ParseError::WrongType {
                what: format!(
                    "`!Mod` connections contain `!{}`; expected `!Connect`",
                    child.tag
                ),
                loc: child.loc,
            });
        }
        connections.push(build_connect(child)?);
    }

    let mut addressmap = Vec::new();
    for child in tag_items(slot(&slots, 10), &tag.tag, "addressmap", loc)? {
        match child.tag.as_str() {
            "Initiator" => addressmap.push(MapEntry::Initiator(build_initiator(child)?)),
            "Target" => addressmap.push(MapEntry::Target(build_target(child)?)),
            other => {
                return Err(ParseError::WrongType {
                    what: format!(
                        "`!Mod` addressmap contains `!{other}`; expected `!Initiator` or `!Target`"
                    ),
                    loc: child.loc,
                });
            }
        }
    }

    Ok(Mod {
        common: TagCommon::assemble(
            req_string(slot(&slots, 0), &tag.tag, "name", loc)?,
            string_or(slot(&slots, 3), &tag.tag, "sd", "", loc)?,
            string_or(slot(&slots, 6), &tag.tag, "ld", "", loc)?,
            options_list(slot(&slots, 2), &tag.tag, loc)?,
            loc,
        ),
        ports,
        modules,
        connections,
        defaults: point_list(slot(&slots, 7), &tag.tag, "defaults", loc)?,
        clk_root: optional_point(slot(&slots, 8), &tag.tag, "clk_root", loc)?,
        rst_root: optional_point(slot(&slots, 9), &tag.tag, "rst_root", loc)?,
        addressmap,
        extends: opt_string(slot(&slots, 11), &tag.tag, "extends", loc)?,
    })
}
