//! Shared attribute machinery for tag construction.
//!
//! Every record constructor declares its attributes in positional order via
//! [`FieldSpec`]s; [`split_args`] then accepts either body form, rejecting
//! unknown attributes, duplicates, missing required attributes, and bad
//! sequence arity — the same checks for every tag kind.

use crate::error::ParseError;
use crate::node::{Node, Scalar, TagBody, TagNode};
use keel_source::Loc;
use serde::{Deserialize, Serialize};

/// Attributes common to every schema record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagCommon {
    /// Record name (trimmed; interior spaces become underscores).
    pub name: String,
    /// Short description: one line, at most 150 characters.
    pub sd: String,
    /// Long description.
    pub ld: String,
    /// Free-form option flags (`KEY` or `KEY=VALUE`).
    pub options: Vec<String>,
    /// Where the record was declared.
    pub loc: Loc,
}

/// Maximum length of a short description.
pub const MAX_SD_LEN: usize = 150;

impl TagCommon {
    /// Assembles the common attributes, applying the description fallbacks:
    /// a missing short description is trimmed from the long one, and a
    /// missing long description copies the short one.
    pub fn assemble(
        name: String,
        sd: String,
        ld: String,
        options: Vec<String>,
        loc: Loc,
    ) -> Self {
        let name = name.trim().replace(' ', "_");
        let mut sd = sd.trim().to_string();
        let ld = ld.trim().to_string();
        if sd.is_empty() && !ld.is_empty() {
            let flat = ld.replace('\n', " ");
            sd = flat.chars().take(MAX_SD_LEN).collect();
            if let Some(dot) = sd.rfind('.') {
                if dot > 0 {
                    sd.truncate(dot + 1);
                }
            }
        }
        let ld = if ld.is_empty() { sd.clone() } else { ld };
        Self {
            name,
            sd,
            ld,
            options,
            loc,
        }
    }

    /// Returns `true` if the given flag (case-insensitive, valueless) is in
    /// the options set.
    pub fn has_option(&self, flag: &str) -> bool {
        self.options
            .iter()
            .any(|opt| opt.trim().eq_ignore_ascii_case(flag))
    }
}

/// One attribute of a record constructor.
pub(crate) struct FieldSpec {
    pub name: &'static str,
    pub required: bool,
}

/// A required attribute.
pub(crate) const fn req(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: true,
    }
}

/// An optional attribute.
pub(crate) const fn opt(name: &'static str) -> FieldSpec {
    FieldSpec {
        name,
        required: false,
    }
}

/// Splits a tag body into attribute slots aligned with `fields`.
///
/// Mapping form fills slots by name; sequence form fills them positionally.
pub(crate) fn split_args(
    tag: &TagNode,
    fields: &[FieldSpec],
) -> Result<Vec<Option<Node>>, ParseError> {
    let mut slots: Vec<Option<Node>> = fields.iter().map(|_| None).collect();
    match &tag.body {
        TagBody::Map(pairs) => {
            for (key, value) in pairs {
                let Some(index) = fields.iter().position(|f| f.name == key) else {
                    return Err(ParseError::UnknownAttribute {
                        tag: tag.tag.clone(),
                        attribute: key.clone(),
                        loc: tag.loc,
                    });
                };
                if slots[index].is_some() {
                    return Err(ParseError::DuplicateAttribute {
                        tag: tag.tag.clone(),
                        attribute: key.clone(),
                        loc: tag.loc,
                    });
                }
                slots[index] = Some(value.clone());
            }
            let missing: Vec<&str> = fields
                .iter()
                .enumerate()
                .filter(|(i, f)| f.required && slots[*i].is_none())
                .map(|(_, f)| f.name)
                .collect();
            if !missing.is_empty() {
                return Err(ParseError::MissingAttribute {
                    tag: tag.tag.clone(),
                    missing: missing.join(", "),
                    loc: tag.loc,
                });
            }
        }
        TagBody::Seq(items) => {
            let needed = fields.iter().filter(|f| f.required).count();
            if items.len() < needed || items.len() > fields.len() {
                return Err(ParseError::BadArity {
                    tag: tag.tag.clone(),
                    needed,
                    maximum: fields.len(),
                    got: items.len(),
                    loc: tag.loc,
                });
            }
            for (i, item) in items.iter().enumerate() {
                slots[i] = Some(item.clone());
            }
        }
    }
    Ok(slots)
}

/// Returns the slot value, treating explicit nulls as absent.
pub(crate) fn slot<'a>(slots: &'a [Option<Node>], index: usize) -> Option<&'a Node> {
    match slots.get(index)?.as_ref()? {
        Node::Scalar(Scalar::Null, _) => None,
        node => Some(node),
    }
}

fn scalar_to_string(scalar: &Scalar) -> Option<String> {
    match scalar {
        Scalar::Null => None,
        Scalar::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        Scalar::Int(v) => Some(v.to_string()),
        Scalar::Str(s) => Some(s.clone()),
    }
}

/// Extracts an optional string (or raw expression) value.
pub(crate) fn opt_string(
    node: Option<&Node>,
    tag: &str,
    what: &str,
    loc: Loc,
) -> Result<Option<String>, ParseError> {
    match node {
        None => Ok(None),
        Some(Node::Scalar(scalar, _)) => Ok(scalar_to_string(scalar)),
        Some(other) => Err(ParseError::WrongType {
            what: format!("`!{tag}` attribute `{what}` must be a scalar"),
            loc: other.loc().or(loc),
        }),
    }
}

/// Extracts a required string value.
pub(crate) fn req_string(
    node: Option<&Node>,
    tag: &str,
    what: &str,
    loc: Loc,
) -> Result<String, ParseError> {
    opt_string(node, tag, what, loc)?.ok_or_else(|| ParseError::MissingAttribute {
        tag: tag.to_string(),
        missing: what.to_string(),
        loc,
    })
}

/// Extracts a string value with a default.
pub(crate) fn string_or(
    node: Option<&Node>,
    tag: &str,
    what: &str,
    default: &str,
    loc: Loc,
) -> Result<String, ParseError> {
    Ok(opt_string(node, tag, what, loc)?.unwrap_or_else(|| default.to_string()))
}

/// Extracts a sequence of nodes (absent means empty).
pub(crate) fn node_list<'a>(
    node: Option<&'a Node>,
    tag: &str,
    what: &str,
    loc: Loc,
) -> Result<Vec<&'a Node>, ParseError> {
    match node {
        None => Ok(Vec::new()),
        Some(Node::List(items, _)) => Ok(items.iter().collect()),
        Some(other) => Err(ParseError::WrongType {
            what: format!("`!{tag}` attribute `{what}` must be a sequence"),
            loc: other.loc().or(loc),
        }),
    }
}

/// Extracts a sequence of tagged records (absent means empty).
pub(crate) fn tag_items<'a>(
    node: Option<&'a Node>,
    tag: &str,
    what: &str,
    loc: Loc,
) -> Result<Vec<&'a TagNode>, ParseError> {
    let mut out = Vec::new();
    for item in node_list(node, tag, what, loc)? {
        match item {
            Node::Tag(child) => out.push(child),
            other => {
                return Err(ParseError::WrongType {
                    what: format!("`!{tag}` attribute `{what}` must contain tagged records"),
                    loc: other.loc().or(loc),
                })
            }
        }
    }
    Ok(out)
}

/// Extracts the options flag list.
///
/// Accepts a sequence of scalars, or a single string split on commas (or
/// whitespace when no comma is present).
pub(crate) fn options_list(
    node: Option<&Node>,
    tag: &str,
    loc: Loc,
) -> Result<Vec<String>, ParseError> {
    match node {
        None => Ok(Vec::new()),
        Some(Node::Scalar(scalar, _)) => {
            let Some(text) = scalar_to_string(scalar) else {
                return Ok(Vec::new());
            };
            let parts: Vec<String> = if text.contains(',') {
                text.split(',').map(|p| p.trim().to_string()).collect()
            } else {
                text.split_whitespace().map(|p| p.to_string()).collect()
            };
            Ok(parts.into_iter().filter(|p| !p.is_empty()).collect())
        }
        Some(Node::List(items, _)) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    Node::Scalar(scalar, _) => {
                        if let Some(text) = scalar_to_string(scalar) {
                            out.push(text);
                        }
                    }
                    other => {
                        return Err(ParseError::WrongType {
                            what: format!("`!{tag}` options must be scalar flags"),
                            loc: other.loc().or(loc),
                        })
                    }
                }
            }
            Ok(out)
        }
        Some(other) => Err(ParseError::WrongType {
            what: format!("`!{tag}` options must be a list or string"),
            loc: other.loc().or(loc),
        }),
    }
}

trait LocOr {
    fn or(self, fallback: Loc) -> Loc;
}

impl LocOr for Loc {
    fn or(self, fallback: Loc) -> Loc {
        if self.is_dummy() {
            fallback
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_source::FileId;

    fn loc() -> Loc {
        Loc::new(FileId::from_raw(0), 1)
    }

    fn seq_tag(tag: &str, items: Vec<Node>) -> TagNode {
        TagNode {
            tag: tag.to_string(),
            body: TagBody::Seq(items),
            loc: loc(),
        }
    }

    fn map_tag(tag: &str, pairs: Vec<(&str, Node)>) -> TagNode {
        TagNode {
            tag: tag.to_string(),
            body: TagBody::Map(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()),
            loc: loc(),
        }
    }

    fn s(text: &str) -> Node {
        Node::Scalar(Scalar::Str(text.to_string()), loc())
    }

    const FIELDS: &[FieldSpec] = &[req("name"), req("val"), opt("sd")];

    #[test]
    fn map_fills_by_name() {
        let tag = map_tag("Def", vec![("val", s("5")), ("name", s("X"))]);
        let slots = split_args(&tag, FIELDS).unwrap();
        assert!(matches!(slot(&slots, 0), Some(Node::Scalar(Scalar::Str(n), _)) if n == "X"));
        assert!(slot(&slots, 2).is_none());
    }

    #[test]
    fn map_rejects_unknown_key() {
        let tag = map_tag("Def", vec![("name", s("X")), ("val", s("5")), ("bogus", s("1"))]);
        assert!(matches!(
            split_args(&tag, FIELDS),
            Err(ParseError::UnknownAttribute { .. })
        ));
    }

    #[test]
    fn map_rejects_duplicate_key() {
        let tag = map_tag("Def", vec![("name", s("X")), ("name", s("Y")), ("val", s("5"))]);
        assert!(matches!(
            split_args(&tag, FIELDS),
            Err(ParseError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn map_rejects_missing_required() {
        let tag = map_tag("Def", vec![("name", s("X"))]);
        assert!(matches!(
            split_args(&tag, FIELDS),
            Err(ParseError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn seq_fills_positionally() {
        let tag = seq_tag("Def", vec![s("X"), s("5"), s("short")]);
        let slots = split_args(&tag, FIELDS).unwrap();
        assert!(matches!(slot(&slots, 2), Some(Node::Scalar(Scalar::Str(d), _)) if d == "short"));
    }

    #[test]
    fn seq_rejects_bad_arity() {
        let too_few = seq_tag("Def", vec![s("X")]);
        assert!(matches!(
            split_args(&too_few, FIELDS),
            Err(ParseError::BadArity { needed: 2, .. })
        ));
        let too_many = seq_tag("Def", vec![s("a"), s("b"), s("c"), s("d")]);
        assert!(matches!(
            split_args(&too_many, FIELDS),
            Err(ParseError::BadArity { maximum: 3, .. })
        ));
    }

    #[test]
    fn descriptions_fall_back() {
        let common = TagCommon::assemble(
            "my block".to_string(),
            String::new(),
            "Does things. In detail.".to_string(),
            Vec::new(),
            loc(),
        );
        assert_eq!(common.name, "my_block");
        assert_eq!(common.sd, "Does things. In detail.");
        let common2 = TagCommon::assemble(
            "x".to_string(),
            "Short only".to_string(),
            String::new(),
            Vec::new(),
            loc(),
        );
        assert_eq!(common2.ld, "Short only");
    }

    #[test]
    fn options_from_string() {
        let node = s("EVENT, HAS_MODE");
        let opts = options_list(Some(&node), "Reg", loc()).unwrap();
        assert_eq!(opts, vec!["EVENT", "HAS_MODE"]);
        let node = s("EVENT HAS_MODE");
        let opts = options_list(Some(&node), "Reg", loc()).unwrap();
        assert_eq!(opts, vec!["EVENT", "HAS_MODE"]);
    }

    #[test]
    fn has_option_is_case_insensitive() {
        let common = TagCommon::assemble(
            "x".to_string(),
            String::new(),
            String::new(),
            vec!["Byte".to_string()],
            loc(),
        );
        assert!(common.has_option("BYTE"));
        assert!(!common.has_option("EVENT"));
    }
}
