//! The parsed item tree of a preprocessor file.
//!
//! Loading a file turns its lines into a tree of [`Item`]s: plain lines,
//! `#define`/`#include` statements, and nested `#if`/`#for` blocks. The tree
//! is built once per file; evaluation walks it (possibly repeatedly, for loop
//! bodies) in [`Scope`](crate::Scope).

use crate::error::PreprocessError;
use crate::statement::{classify, Directive, LineKind};
use keel_source::{FileId, Loc};
use std::path::Path;

/// The predicate guarding one section of an `#if` block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IfCond {
    /// `#if expr` / `#elif expr`.
    Expr(String),
    /// `#ifdef NAME`.
    Defined(String),
    /// `#ifndef NAME`.
    NotDefined(String),
    /// `#else`.
    Else,
}

/// One node of the parsed file tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Item {
    /// An ordinary text line, emitted (after substitution) when reached.
    Line {
        /// The raw line text.
        text: String,
        /// Where the line came from.
        loc: Loc,
    },
    /// A `#define` statement.
    Define {
        /// The bound name.
        name: String,
        /// The raw right-hand side, or `None` for a flag define.
        value: Option<String>,
        /// Where the statement came from.
        loc: Loc,
    },
    /// An `#include` statement.
    Include {
        /// The included file name.
        name: String,
        /// Where the statement came from.
        loc: Loc,
    },
    /// An `#if`/`#elif`/`#else` block; exactly one section is taken.
    If {
        /// The sections in declaration order.
        sections: Vec<(IfCond, Vec<Item>)>,
        /// Where the `#if` came from.
        loc: Loc,
    },
    /// A `#for` loop block.
    For {
        /// The loop variable name.
        var: String,
        /// The raw iterable expression.
        iterable: String,
        /// The loop body.
        body: Vec<Item>,
        /// Where the `#for` came from.
        loc: Loc,
    },
}

enum Frame {
    If {
        sections: Vec<(IfCond, Vec<Item>)>,
        loc: Loc,
    },
    For {
        var: String,
        iterable: String,
        body: Vec<Item>,
        loc: Loc,
    },
}

/// Parses the text of one file into an item tree.
///
/// Nesting mismatches, malformed directives, and unknown directive words are
/// reported with the file path and line number.
pub fn parse_items(
    content: &str,
    file: FileId,
    path: &Path,
) -> Result<Vec<Item>, PreprocessError> {
    let mut base: Vec<Item> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let push_item = |base: &mut Vec<Item>, stack: &mut Vec<Frame>, item: Item| {
        match stack.last_mut() {
            Some(Frame::If { sections, .. }) => match sections.last_mut() {
                Some((_, body)) => body.push(item),
                None => unreachable!("if frame always opens with a section"),
            },
            Some(Frame::For { body, .. }) => body.push(item),
            None => base.push(item),
        }
    };

    for (index, raw) in content.lines().enumerate() {
        let line_no = (index + 1) as u32;
        let loc = Loc::new(file, line_no);
        let nesting = |directive: &str| PreprocessError::Nesting {
            path: path.to_path_buf(),
            line: line_no,
            directive: directive.to_string(),
        };
        match classify(raw) {
            LineKind::Text => push_item(
                &mut base,
                &mut stack,
                Item::Line {
                    text: raw.to_string(),
                    loc,
                },
            ),
            LineKind::Unknown(word) => {
                return Err(PreprocessError::UnknownDirective {
                    path: path.to_path_buf(),
                    line: line_no,
                    word,
                });
            }
            LineKind::Malformed(detail) => {
                return Err(PreprocessError::BadSyntax {
                    path: path.to_path_buf(),
                    line: line_no,
                    detail,
                });
            }
            LineKind::Directive(directive) => match directive {
                Directive::Define { name, value } => {
                    push_item(&mut base, &mut stack, Item::Define { name, value, loc });
                }
                Directive::Include { name } => {
                    push_item(&mut base, &mut stack, Item::Include { name, loc });
                }
                Directive::If { cond } => {
                    stack.push(Frame::If {
                        sections: vec![(IfCond::Expr(cond), Vec::new())],
                        loc,
                    });
                }
                Directive::IfDef { name } => {
                    stack.push(Frame::If {
                        sections: vec![(IfCond::Defined(name), Vec::new())],
                        loc,
                    });
                }
                Directive::IfNotDef { name } => {
                    stack.push(Frame::If {
                        sections: vec![(IfCond::NotDefined(name), Vec::new())],
                        loc,
                    });
                }
                Directive::Elif { cond } => match stack.last_mut() {
                    Some(Frame::If { sections, .. }) => {
                        if matches!(sections.last(), Some((IfCond::Else, _))) {
                            return Err(PreprocessError::BadSyntax {
                                path: path.to_path_buf(),
                                line: line_no,
                                detail: "`#elif` after `#else`".to_string(),
                            });
                        }
                        sections.push((IfCond::Expr(cond), Vec::new()));
                    }
                    _ => return Err(nesting("elif")),
                },
                Directive::Else => match stack.last_mut() {
                    Some(Frame::If { sections, .. }) => {
                        if matches!(sections.last(), Some((IfCond::Else, _))) {
                            return Err(PreprocessError::BadSyntax {
                                path: path.to_path_buf(),
                                line: line_no,
                                detail: "duplicate `#else`".to_string(),
                            });
                        }
                        sections.push((IfCond::Else, Vec::new()));
                    }
                    _ => return Err(nesting("else")),
                },
                Directive::EndIf => match stack.pop() {
                    Some(Frame::If { sections, loc }) => {
                        push_item(&mut base, &mut stack, Item::If { sections, loc });
                    }
                    _ => return Err(nesting("endif")),
                },
                Directive::For { var, iterable } => {
                    stack.push(Frame::For {
                        var,
                        iterable,
                        body: Vec::new(),
                        loc,
                    });
                }
                Directive::EndFor => match stack.pop() {
                    Some(Frame::For {
                        var,
                        iterable,
                        body,
                        loc,
                    }) => {
                        push_item(
                            &mut base,
                            &mut stack,
                            Item::For {
                                var,
                                iterable,
                                body,
                                loc,
                            },
                        );
                    }
                    _ => return Err(nesting("endfor")),
                },
            },
        }
    }

    if let Some(frame) = stack.last() {
        let (directive, loc) = match frame {
            Frame::If { loc, .. } => ("if", loc),
            Frame::For { loc, .. } => ("for", loc),
        };
        return Err(PreprocessError::Nesting {
            path: path.to_path_buf(),
            line: loc.line,
            directive: directive.to_string(),
        });
    }

    Ok(base)
}
