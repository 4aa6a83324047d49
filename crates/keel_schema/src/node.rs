//! The untyped tagged-node tree read from preprocessed text.
//!
//! The reader turns the preprocessor's output lines into [`TagNode`]s: each
//! top-level `- !Tag` item becomes one document node, whose body is either a
//! flow sequence (`!Point [cfg, child]`) or a block mapping with nested
//! sequences and tags. Typed record construction happens afterwards in
//! [`construct`](crate::construct).

use crate::error::ParseError;
use keel_preprocess::OutLine;
use keel_source::Loc;
use serde::{Deserialize, Serialize};

/// A scalar value as read from the document text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scalar {
    /// An absent or empty value.
    Null,
    /// A boolean literal (`true`/`false`, either case).
    Bool(bool),
    /// An integer literal (decimal, `0x`, or `0b`).
    Int(i64),
    /// Any other text, including unevaluated expressions.
    Str(String),
}

impl Scalar {
    /// Parses a bare (unquoted) scalar token.
    pub fn parse(text: &str) -> Scalar {
        let text = text.trim();
        if text.is_empty() {
            return Scalar::Null;
        }
        match text {
            "true" | "True" => return Scalar::Bool(true),
            "false" | "False" => return Scalar::Bool(false),
            _ => {}
        }
        if let Some(value) = parse_int(text) {
            return Scalar::Int(value);
        }
        Scalar::Str(text.to_string())
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(&hex.replace('_', ""), 16).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        i64::from_str_radix(&bin.replace('_', ""), 2).ok()?
    } else if digits.chars().all(|c| c.is_ascii_digit() || c == '_') && !digits.is_empty() {
        digits.replace('_', "").parse().ok()?
    } else {
        return None;
    };
    Some(if negative { -value } else { value })
}

/// One value in the node tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// A scalar leaf.
    Scalar(Scalar, Loc),
    /// A sequence (flow `[..]` or block `- ..`).
    List(Vec<Node>, Loc),
    /// A tagged record.
    Tag(TagNode),
}

impl Node {
    /// Returns the location of this node.
    pub fn loc(&self) -> Loc {
        match self {
            Node::Scalar(_, loc) | Node::List(_, loc) => *loc,
            Node::Tag(tag) => tag.loc,
        }
    }
}

/// The body of a tagged record: positional items or named attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TagBody {
    /// Sequence form: positional attribute values.
    Seq(Vec<Node>),
    /// Mapping form: `(attribute, value)` pairs in declaration order.
    Map(Vec<(String, Node)>),
}

/// A tagged record node, e.g. `!Mod` with its body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagNode {
    /// The tag name without the leading `!`.
    pub tag: String,
    /// The record body.
    pub body: TagBody,
    /// Location of the tag.
    pub loc: Loc,
}

struct Line {
    indent: usize,
    content: String,
    loc: Loc,
}

/// Reads preprocessed output lines into top-level document nodes.
pub fn read_documents(lines: &[OutLine]) -> Result<Vec<TagNode>, ParseError> {
    let lines = prepare(lines);
    let mut reader = Reader { lines, pos: 0 };
    reader.read_top_level()
}

/// Strips comments and drops blank lines, keeping indent and provenance.
fn prepare(lines: &[OutLine]) -> Vec<Line> {
    let mut out = Vec::new();
    for line in lines {
        let stripped = strip_comment(&line.text);
        if stripped.trim().is_empty() {
            continue;
        }
        let indent = stripped.len() - stripped.trim_start().len();
        out.push(Line {
            indent,
            content: stripped.trim_end().to_string(),
            loc: line.loc,
        });
    }
    out
}

/// Truncates a line at a `#` comment that is at line start or preceded by
/// whitespace, outside of quotes.
fn strip_comment(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut quote: Option<char> = None;
    for (i, &c) in chars.iter().enumerate() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '#' => {
                    let at_start = chars[..i].iter().all(|p| p.is_whitespace());
                    let after_space = i > 0 && chars[i - 1].is_whitespace();
                    if at_start || after_space {
                        return chars[..i].iter().collect();
                    }
                }
                _ => {}
            },
        }
    }
    text.to_string()
}

struct Reader {
    lines: Vec<Line>,
    pos: usize,
}

impl Reader {
    fn peek(&self) -> Option<&Line> {
        self.lines.get(self.pos)
    }

    fn read_top_level(&mut self) -> Result<Vec<TagNode>, ParseError> {
        let mut docs = Vec::new();
        while let Some(line) = self.peek() {
            let loc = line.loc;
            let indent = line.indent;
            let content = line.content.trim_start().to_string();
            let Some(rest) = strip_dash(&content) else {
                return Err(ParseError::BadStructure {
                    detail: format!("expected a `- !Tag` document item, found `{content}`"),
                    loc,
                });
            };
            let rest = rest.to_string();
            self.pos += 1;
            let node = self.read_item_value(&rest, indent, loc)?;
            match node {
                Node::Tag(tag) => docs.push(tag),
                other => {
                    return Err(ParseError::BadStructure {
                        detail: "top-level items must be tagged records".to_string(),
                        loc: other.loc(),
                    });
                }
            }
        }
        Ok(docs)
    }

    /// Reads the value of a sequence item, given the text after `- `.
    fn read_item_value(
        &mut self,
        rest: &str,
        item_indent: usize,
        loc: Loc,
    ) -> Result<Node, ParseError> {
        let rest = rest.trim();
        if let Some(tag_text) = rest.strip_prefix('!') {
            let tag = self.read_tag(tag_text, item_indent, loc)?;
            Ok(Node::Tag(tag))
        } else if rest.starts_with('[') {
            let items = parse_flow_list(rest, loc)?;
            Ok(Node::List(items, loc))
        } else {
            Ok(Node::Scalar(Scalar::parse(rest), loc))
        }
    }

    /// Reads a tag whose `!Name` prefix has been recognized; `after_bang` is
    /// the text starting at the tag name.
    fn read_tag(
        &mut self,
        after_bang: &str,
        item_indent: usize,
        loc: Loc,
    ) -> Result<TagNode, ParseError> {
        let name_end = after_bang
            .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
            .unwrap_or(after_bang.len());
        let tag = after_bang[..name_end].to_string();
        if tag.is_empty() {
            return Err(ParseError::BadStructure {
                detail: "empty tag name".to_string(),
                loc,
            });
        }
        let rest = after_bang[name_end..].trim();
        if rest.starts_with('[') {
            let items = parse_flow_list(rest, loc)?;
            return Ok(TagNode {
                tag,
                body: TagBody::Seq(items),
                loc,
            });
        }
        if !rest.is_empty() {
            return Err(ParseError::BadStructure {
                detail: format!("unexpected text after `!{tag}`: `{rest}`"),
                loc,
            });
        }
        // Block body on the following lines, indented deeper than the item
        let next = self
            .peek()
            .map(|line| (line.indent, line.content.trim_start().starts_with('-')));
        let body = match next {
            Some((body_indent, is_sequence)) if body_indent > item_indent => {
                if is_sequence {
                    TagBody::Seq(self.read_block_sequence(body_indent)?)
                } else {
                    TagBody::Map(self.read_block_map(body_indent)?)
                }
            }
            _ => TagBody::Seq(Vec::new()),
        };
        Ok(TagNode { tag, body, loc })
    }

    fn read_block_sequence(&mut self, indent: usize) -> Result<Vec<Node>, ParseError> {
        let mut items = Vec::new();
        while let Some(line) = self.peek() {
            if line.indent != indent {
                break;
            }
            let Some(rest) = strip_dash(line.content.trim_start()) else {
                break;
            };
            let rest = rest.to_string();
            let loc = line.loc;
            self.pos += 1;
            items.push(self.read_item_value(&rest, indent, loc)?);
        }
        Ok(items)
    }

    fn read_block_map(&mut self, indent: usize) -> Result<Vec<(String, Node)>, ParseError> {
        let mut pairs = Vec::new();
        while let Some(line) = self.peek() {
            if line.indent != indent || line.content.trim_start().starts_with('-') {
                break;
            }
            let content = line.content.trim_start().to_string();
            let loc = line.loc;
            let Some(colon) = find_key_colon(&content) else {
                return Err(ParseError::BadStructure {
                    detail: format!("expected `key: value`, found `{content}`"),
                    loc,
                });
            };
            let key = content[..colon].trim().to_string();
            let value_text = content[colon + 1..].trim().to_string();
            self.pos += 1;
            let value = self.read_map_value(&value_text, indent, loc)?;
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    fn read_map_value(
        &mut self,
        text: &str,
        map_indent: usize,
        loc: Loc,
    ) -> Result<Node, ParseError> {
        if text.is_empty() {
            // Value on the following lines: a block sequence at the same or
            // deeper indent
            let next = self
                .peek()
                .map(|line| (line.indent, line.content.trim_start().starts_with('-')));
            match next {
                Some((seq_indent, true)) if seq_indent >= map_indent => {
                    let items = self.read_block_sequence(seq_indent)?;
                    Ok(Node::List(items, loc))
                }
                _ => Ok(Node::Scalar(Scalar::Null, loc)),
            }
        } else if let Some(after_bang) = text.strip_prefix('!') {
            let tag = self.read_tag(after_bang, map_indent, loc)?;
            Ok(Node::Tag(tag))
        } else if text.starts_with('[') {
            Ok(Node::List(parse_flow_list(text, loc)?, loc))
        } else if text.starts_with('>') || text.starts_with('|') {
            let join = if text.starts_with('>') { " " } else { "\n" };
            let mut parts = Vec::new();
            while let Some(next) = self.peek() {
                if next.indent <= map_indent {
                    break;
                }
                parts.push(next.content.trim_start().to_string());
                self.pos += 1;
            }
            Ok(Node::Scalar(Scalar::Str(parts.join(join)), loc))
        } else {
            Ok(Node::Scalar(parse_scalar_text(text), loc))
        }
    }
}

fn strip_dash(content: &str) -> Option<&str> {
    if content == "-" {
        Some("")
    } else {
        content.strip_prefix("- ")
    }
}

/// Finds the colon separating a mapping key from its value, skipping quoted
/// text and flow brackets.
fn find_key_colon(content: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    for (i, c) in content.char_indices() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' => depth += 1,
                ']' => depth = depth.saturating_sub(1),
                ':' if depth == 0 => return Some(i),
                _ => {}
            },
        }
    }
    None
}

fn parse_scalar_text(text: &str) -> Scalar {
    let trimmed = text.trim();
    if (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2)
        || (trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() >= 2)
    {
        return Scalar::Str(trimmed[1..trimmed.len() - 1].to_string());
    }
    Scalar::parse(trimmed)
}

/// Parses a one-line flow sequence `[a, !Tag [..], [..], "text"]`.
fn parse_flow_list(text: &str, loc: Loc) -> Result<Vec<Node>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut pos = 0usize;
    let items = parse_flow_items(&chars, &mut pos, loc)?;
    // Nothing but whitespace may follow the closing bracket
    if chars[pos..].iter().any(|c| !c.is_whitespace()) {
        return Err(ParseError::BadStructure {
            detail: "unexpected text after `]`".to_string(),
            loc,
        });
    }
    Ok(items)
}

fn parse_flow_items(chars: &[char], pos: &mut usize, loc: Loc) -> Result<Vec<Node>, ParseError> {
    let bad = |detail: &str| ParseError::BadStructure {
        detail: detail.to_string(),
        loc,
    };
    skip_ws(chars, pos);
    if chars.get(*pos) != Some(&'[') {
        return Err(bad("expected `[`"));
    }
    *pos += 1;
    let mut items = Vec::new();
    loop {
        skip_ws(chars, pos);
        match chars.get(*pos) {
            None => return Err(bad("unterminated flow sequence")),
            Some(']') => {
                *pos += 1;
                return Ok(items);
            }
            Some(',') => {
                // An empty slot parses as a null scalar
                items.push(Node::Scalar(Scalar::Null, loc));
                *pos += 1;
            }
            Some(_) => {
                items.push(parse_flow_value(chars, pos, loc)?);
                skip_ws(chars, pos);
                match chars.get(*pos) {
                    Some(',') => {
                        *pos += 1;
                    }
                    Some(']') => {
                        *pos += 1;
                        return Ok(items);
                    }
                    _ => return Err(bad("expected `,` or `]` in flow sequence")),
                }
            }
        }
    }
}

fn parse_flow_value(chars: &[char], pos: &mut usize, loc: Loc) -> Result<Node, ParseError> {
    let bad = |detail: String| ParseError::BadStructure { detail, loc };
    match chars[*pos] {
        '[' => {
            let items = parse_flow_items(chars, pos, loc)?;
            Ok(Node::List(items, loc))
        }
        '!' => {
            *pos += 1;
            let start = *pos;
            while *pos < chars.len()
                && (chars[*pos].is_ascii_alphanumeric() || chars[*pos] == '_')
            {
                *pos += 1;
            }
            let tag: String = chars[start..*pos].iter().collect();
            if tag.is_empty() {
                return Err(bad("empty tag name in flow sequence".to_string()));
            }
            skip_ws(chars, pos);
            let items = parse_flow_items(chars, pos, loc)?;
            Ok(Node::Tag(TagNode {
                tag,
                body: TagBody::Seq(items),
                loc,
            }))
        }
        '"' | '\'' => {
            let quote = chars[*pos];
            *pos += 1;
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != quote {
                *pos += 1;
            }
            if *pos >= chars.len() {
                return Err(bad("unterminated string in flow sequence".to_string()));
            }
            let text: String = chars[start..*pos].iter().collect();
            *pos += 1;
            Ok(Node::Scalar(Scalar::Str(text), loc))
        }
        _ => {
            let start = *pos;
            while *pos < chars.len() && chars[*pos] != ',' && chars[*pos] != ']' {
                *pos += 1;
            }
            let text: String = chars[start..*pos].iter().collect();
            Ok(Node::Scalar(Scalar::parse(&text), loc))
        }
    }
}

fn skip_ws(chars: &[char], pos: &mut usize) {
    while *pos < chars.len() && chars[*pos].is_whitespace() {
        *pos += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_source::FileId;

    fn lines(text: &str) -> Vec<OutLine> {
        text.lines()
            .enumerate()
            .map(|(i, l)| OutLine::new(l, Loc::new(FileId::from_raw(0), (i + 1) as u32)))
            .collect()
    }

    fn read(text: &str) -> Vec<TagNode> {
        read_documents(&lines(text)).unwrap()
    }

    #[test]
    fn sequence_form_document() {
        let docs = read("- !Def [CLOCK_MHZ, 450]");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].tag, "Def");
        let TagBody::Seq(items) = &docs[0].body else {
            panic!("expected seq body");
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Node::Scalar(Scalar::Str(s), _) if s == "CLOCK_MHZ"));
        assert!(matches!(&items[1], Node::Scalar(Scalar::Int(450), _)));
    }

    #[test]
    fn mapping_form_document() {
        let docs = read("- !Def\n  name: CLOCK_MHZ\n  val: 450");
        let TagBody::Map(pairs) = &docs[0].body else {
            panic!("expected map body");
        };
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "name");
        assert!(matches!(&pairs[1].1, Node::Scalar(Scalar::Int(450), _)));
    }

    #[test]
    fn nested_block_sequence_under_key() {
        let docs = read("- !Mod\n  name: top\n  ports:\n  - !HisRef [cfg, axi4]\n  - !HisRef [irq, wire]");
        let TagBody::Map(pairs) = &docs[0].body else {
            panic!("expected map body");
        };
        let (_, ports) = pairs.iter().find(|(k, _)| k == "ports").unwrap();
        let Node::List(items, _) = ports else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Node::Tag(t) if t.tag == "HisRef"));
    }

    #[test]
    fn nested_tag_with_block_map_body() {
        let docs = read(
            "- !Mod\n  name: top\n  ports: []\n  connections:\n  - !Connect\n    points:\n    - !Point [a]\n    - !Point [b, child]",
        );
        let TagBody::Map(pairs) = &docs[0].body else {
            panic!("expected map body");
        };
        let (_, conns) = pairs.iter().find(|(k, _)| k == "connections").unwrap();
        let Node::List(items, _) = conns else {
            panic!("expected list");
        };
        let Node::Tag(connect) = &items[0] else {
            panic!("expected tag");
        };
        let TagBody::Map(cpairs) = &connect.body else {
            panic!("expected map body");
        };
        let (_, points) = &cpairs[0];
        let Node::List(pts, _) = points else {
            panic!("expected point list");
        };
        assert_eq!(pts.len(), 2);
    }

    #[test]
    fn flow_list_with_nested_list() {
        let docs = read("- !HisRef [cfg, axi4, \"config port\", 1, Slave, \"\", []]");
        let TagBody::Seq(items) = &docs[0].body else {
            panic!("expected seq body");
        };
        assert_eq!(items.len(), 7);
        assert!(matches!(&items[4], Node::Scalar(Scalar::Str(s), _) if s == "Slave"));
        assert!(matches!(&items[6], Node::List(l, _) if l.is_empty()));
    }

    #[test]
    fn flow_list_with_tag_value() {
        let docs = read("- !Initiator\n  port: !Point [cfg]\n  mask: 0xFFF");
        let TagBody::Map(pairs) = &docs[0].body else {
            panic!("expected map body");
        };
        assert!(matches!(&pairs[0].1, Node::Tag(t) if t.tag == "Point"));
        assert!(matches!(&pairs[1].1, Node::Scalar(Scalar::Int(0xFFF), _)));
    }

    #[test]
    fn comments_and_blanks_skipped() {
        let docs = read("# header comment\n\n- !Def [A, 1]  # trailing comment\n\n- !Def [B, 2]");
        assert_eq!(docs.len(), 2);
    }

    #[test]
    fn folded_scalar() {
        let docs = read("- !Def\n  name: X\n  val: 1\n  ld: >\n    a long\n    description");
        let TagBody::Map(pairs) = &docs[0].body else {
            panic!("expected map body");
        };
        let (_, ld) = pairs.iter().find(|(k, _)| k == "ld").unwrap();
        assert!(matches!(ld, Node::Scalar(Scalar::Str(s), _) if s == "a long description"));
    }

    #[test]
    fn expression_scalars_stay_strings() {
        let docs = read("- !Def [DEPTH, FIFO_DEPTH * 2]");
        let TagBody::Seq(items) = &docs[0].body else {
            panic!("expected seq body");
        };
        assert!(matches!(&items[1], Node::Scalar(Scalar::Str(s), _) if s == "FIFO_DEPTH * 2"));
    }

    #[test]
    fn top_level_scalar_rejected() {
        let err = read_documents(&lines("plain text")).unwrap_err();
        assert!(matches!(err, ParseError::BadStructure { .. }));
    }

    #[test]
    fn unterminated_flow_rejected() {
        let err = read_documents(&lines("- !Def [A, 1")).unwrap_err();
        assert!(matches!(err, ParseError::BadStructure { .. }));
    }

    #[test]
    fn loc_tracks_input_lines() {
        let docs = read("# comment\n- !Def [A, 1]\n- !Def [B, 2]");
        assert_eq!(docs[0].loc.line, 2);
        assert_eq!(docs[1].loc.line, 3);
    }
}
