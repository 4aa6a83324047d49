//! Directive recognition.
//!
//! A line whose first non-blank character is `#` immediately followed by a
//! letter is a directive; anything else (including `# comment` text) passes
//! through untouched, so ordinary document comments survive preprocessing.

/// A recognized preprocessor directive, with its raw operand text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    /// `#define NAME [expr]` — bind a name; a missing expression binds `true`.
    Define {
        /// The bound name.
        name: String,
        /// The raw right-hand-side expression, or `None` for a flag define.
        value: Option<String>,
    },
    /// `#include "name"` — inline another file of the scope.
    Include {
        /// The file name to include.
        name: String,
    },
    /// `#if expr` — open a conditional block.
    If {
        /// The raw predicate expression.
        cond: String,
    },
    /// `#ifdef NAME` — open a conditional testing that a name is bound.
    IfDef {
        /// The tested name.
        name: String,
    },
    /// `#ifndef NAME` — open a conditional testing that a name is unbound.
    IfNotDef {
        /// The tested name.
        name: String,
    },
    /// `#elif expr` (or the legacy `#elseif`) — add a predicated section.
    Elif {
        /// The raw predicate expression.
        cond: String,
    },
    /// `#else` — add the fallback section.
    Else,
    /// `#endif` — close a conditional block.
    EndIf,
    /// `#for var in iterable` — open a loop block.
    For {
        /// The loop variable name.
        var: String,
        /// The raw iterable expression.
        iterable: String,
    },
    /// `#endfor` — close a loop block.
    EndFor,
}

/// The outcome of classifying one input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LineKind {
    /// An ordinary text line.
    Text,
    /// A recognized directive.
    Directive(Directive),
    /// A `#word` line with an unknown directive word.
    Unknown(String),
    /// A directive line that failed to parse, with a detail message.
    Malformed(String),
}

/// Classifies a single input line.
pub fn classify(line: &str) -> LineKind {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix('#') else {
        return LineKind::Text;
    };
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        // `# comment`, `#---`, shebang-like noise: plain text
        return LineKind::Text;
    }
    let word_end = rest
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .unwrap_or(rest.len());
    let word = &rest[..word_end];
    let operand = rest[word_end..].trim();
    match word {
        "define" => parse_define(operand),
        "include" => parse_include(operand),
        "if" => LineKind::Directive(Directive::If {
            cond: strip_comment(operand),
        }),
        "ifdef" => parse_name(operand, |name| Directive::IfDef { name }),
        "ifndef" => parse_name(operand, |name| Directive::IfNotDef { name }),
        "elif" | "elseif" => LineKind::Directive(Directive::Elif {
            cond: strip_comment(operand),
        }),
        "else" => LineKind::Directive(Directive::Else),
        "endif" => LineKind::Directive(Directive::EndIf),
        "for" => parse_for(operand),
        "endfor" => LineKind::Directive(Directive::EndFor),
        other => LineKind::Unknown(other.to_string()),
    }
}

/// Strips a trailing ` # ...` comment from a predicate expression.
fn strip_comment(text: &str) -> String {
    match text.find(" #") {
        Some(idx) => text[..idx].trim().to_string(),
        None => text.trim().to_string(),
    }
}

fn parse_define(operand: &str) -> LineKind {
    let operand = operand.trim();
    if operand.is_empty() {
        return LineKind::Malformed("`#define` requires a name".to_string());
    }
    let name_end = operand
        .find(|c: char| !c.is_ascii_alphanumeric() && c != '_' && c != '-')
        .unwrap_or(operand.len());
    let name = &operand[..name_end];
    if name.is_empty() {
        return LineKind::Malformed(format!("bad `#define` name in `{operand}`"));
    }
    let value = operand[name_end..].trim();
    LineKind::Directive(Directive::Define {
        name: name.to_string(),
        value: if value.is_empty() {
            None
        } else {
            Some(value.to_string())
        },
    })
}

fn parse_include(operand: &str) -> LineKind {
    let name = operand.trim().trim_matches('"').trim();
    if name.is_empty() {
        return LineKind::Malformed("`#include` requires a file name".to_string());
    }
    LineKind::Directive(Directive::Include {
        name: name.to_string(),
    })
}

fn parse_name(operand: &str, build: impl FnOnce(String) -> Directive) -> LineKind {
    let name = operand.split_whitespace().next().unwrap_or("");
    if name.is_empty() {
        return LineKind::Malformed("directive requires a name".to_string());
    }
    LineKind::Directive(build(name.to_string()))
}

fn parse_for(operand: &str) -> LineKind {
    let operand = operand.trim().trim_end_matches(':').trim();
    let Some(split) = operand.find(" in ") else {
        return LineKind::Malformed(format!("bad `#for` condition `{operand}`"));
    };
    let var = operand[..split].trim();
    let iterable = operand[split + 4..].trim();
    if var.is_empty() || iterable.is_empty() {
        return LineKind::Malformed(format!("bad `#for` condition `{operand}`"));
    }
    LineKind::Directive(Directive::For {
        var: var.to_string(),
        iterable: iterable.to_string(),
    })
}
