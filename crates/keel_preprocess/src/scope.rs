//! Preprocessor scope: named files plus the define environment.

use crate::block::{parse_items, IfCond, Item};
use crate::error::PreprocessError;
use crate::line::OutLine;
use indexmap::IndexMap;
use keel_common::{evaluate, EvalError, Ident, Interner, Resolver, Value};
use keel_source::{FileId, Loc, SourceDb};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// The mutable define environment of a scope.
///
/// Bindings set by `#define` keep their raw expression text and evaluate
/// lazily on first use; bindings injected by the driver carry values
/// directly. Names are interned so the per-line substitution scan compares
/// in O(1). The latest binding for a name wins.
pub struct DefineEnv {
    interner: Interner,
    map: IndexMap<Ident, Binding>,
}

#[derive(Clone, Debug)]
enum Binding {
    Value(Value),
    Expr(String),
}

const MAX_RESOLVE_DEPTH: usize = 64;

impl DefineEnv {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self {
            interner: Interner::new(),
            map: IndexMap::new(),
        }
    }

    /// Binds a name to a concrete value.
    pub fn set_value(&mut self, name: &str, value: Value) {
        let id = self.interner.get_or_intern(name);
        self.map.insert(id, Binding::Value(value));
    }

    /// Binds a name to a raw expression, evaluated lazily on use.
    pub fn set_expr(&mut self, name: &str, expr: impl Into<String>) {
        let id = self.interner.get_or_intern(name);
        self.map.insert(id, Binding::Expr(expr.into()));
    }

    /// Returns `true` if the name is bound.
    pub fn contains(&self, name: &str) -> bool {
        self.interner
            .get(name)
            .is_some_and(|id| self.map.contains_key(&id))
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if no names are bound.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn resolve_depth(&self, name: &str, depth: usize) -> Result<Option<Value>, EvalError> {
        let Some(id) = self.interner.get(name) else {
            return Ok(None);
        };
        let Some(binding) = self.map.get(&id) else {
            return Ok(None);
        };
        match binding {
            Binding::Value(value) => Ok(Some(value.clone())),
            Binding::Expr(text) => {
                if depth >= MAX_RESOLVE_DEPTH {
                    return Err(EvalError::Recursion(name.to_string()));
                }
                let resolver = DepthResolver {
                    env: self,
                    depth: depth + 1,
                };
                evaluate(text, &resolver).map(Some)
            }
        }
    }
}

impl Default for DefineEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for DefineEnv {
    fn resolve(&self, name: &str) -> Result<Option<Value>, EvalError> {
        self.resolve_depth(name, 0)
    }
}

struct DepthResolver<'a> {
    env: &'a DefineEnv,
    depth: usize,
}

impl Resolver for DepthResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Option<Value>, EvalError> {
        self.env.resolve_depth(name, self.depth)
    }
}

/// Resolver that consults loop bindings (innermost first) before the
/// define environment.
struct StackedResolver<'a> {
    frames: &'a [(String, Value)],
    env: &'a DefineEnv,
}

impl Resolver for StackedResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Option<Value>, EvalError> {
        for (bound, value) in self.frames.iter().rev() {
            if bound == name {
                return Ok(Some(value.clone()));
            }
        }
        self.env.resolve(name)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Status {
    Registered,
    Evaluating,
    Evaluated,
}

struct FileEntry {
    name: String,
    path: PathBuf,
    status: Status,
    file_id: Option<FileId>,
    result: Vec<OutLine>,
    includes: Vec<String>,
}

enum Seg {
    Line(String, Loc),
    Include(String),
}

/// A preprocessor scope: a set of named files and a define environment.
///
/// File names are unique within a scope (the base name of the registered
/// path). Files are read from disk only when first evaluated; files never
/// referenced are never loaded.
pub struct Scope {
    db: SourceDb,
    index: IndexMap<String, usize>,
    files: Vec<FileEntry>,
    env: DefineEnv,
}

impl Scope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self {
            db: SourceDb::new(),
            index: IndexMap::new(),
            files: Vec::new(),
            env: DefineEnv::new(),
        }
    }

    /// Binds an initial define value (driver-supplied).
    pub fn define(&mut self, name: &str, value: Value) {
        self.env.set_value(name, value);
    }

    /// Returns the define environment.
    pub fn defines(&self) -> &DefineEnv {
        &self.env
    }

    /// Returns the source database holding every loaded file.
    pub fn source_db(&self) -> &SourceDb {
        &self.db
    }

    /// Registers a file by path without reading it.
    ///
    /// The file is addressed by its base name; registering two files with
    /// the same base name is an error.
    pub fn add_file(&mut self, path: &Path) -> Result<(), PreprocessError> {
        let name = base_name(path);
        if let Some(&existing) = self.index.get(&name) {
            return Err(PreprocessError::DuplicateFile {
                name,
                first: self.files[existing].path.clone(),
            });
        }
        self.index.insert(name.clone(), self.files.len());
        self.files.push(FileEntry {
            name,
            path: path.to_path_buf(),
            status: Status::Registered,
            file_id: None,
            result: Vec::new(),
            includes: Vec::new(),
        });
        Ok(())
    }

    /// Registers an in-memory file (useful for tests).
    pub fn add_source(&mut self, name: &str, content: &str) -> Result<(), PreprocessError> {
        let path = PathBuf::from(name);
        let base = base_name(&path);
        if let Some(&existing) = self.index.get(&base) {
            return Err(PreprocessError::DuplicateFile {
                name: base,
                first: self.files[existing].path.clone(),
            });
        }
        let file_id = self.db.add_source(path.clone(), content.to_string());
        self.index.insert(base.clone(), self.files.len());
        self.files.push(FileEntry {
            name: base,
            path,
            status: Status::Registered,
            file_id: Some(file_id),
            result: Vec::new(),
            includes: Vec::new(),
        });
        Ok(())
    }

    /// Returns `true` if a file with this name is registered.
    pub fn has_file(&self, name: &str) -> bool {
        self.index.contains_key(&base_name(Path::new(name)))
    }

    /// Returns `true` if the named file has been evaluated.
    pub fn is_evaluated(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|idx| self.files[idx].status == Status::Evaluated)
    }

    /// Returns the evaluated output of a file, if it has been evaluated.
    pub fn result(&self, name: &str) -> Option<&[OutLine]> {
        let idx = self.lookup(name)?;
        let entry = &self.files[idx];
        if entry.status == Status::Evaluated {
            Some(&entry.result)
        } else {
            None
        }
    }

    /// Returns the names of the files a file directly `#include`d.
    pub fn includes_of(&self, name: &str) -> &[String] {
        match self.lookup(name) {
            Some(idx) => &self.files[idx].includes,
            None => &[],
        }
    }

    /// Returns the [`FileId`] of a loaded file.
    pub fn file_id(&self, name: &str) -> Option<FileId> {
        self.lookup(name).and_then(|idx| self.files[idx].file_id)
    }

    /// Returns the names of every evaluated file, in registration order.
    pub fn evaluated_files(&self) -> Vec<&str> {
        self.files
            .iter()
            .filter(|f| f.status == Status::Evaluated)
            .map(|f| f.name.as_str())
            .collect()
    }

    /// Evaluates the named file (loading it first if necessary), along with
    /// everything it includes.
    pub fn evaluate(&mut self, name: &str) -> Result<(), PreprocessError> {
        let idx = self.lookup(name).ok_or_else(|| PreprocessError::UnknownFile {
            name: name.to_string(),
        })?;
        self.eval_index(idx)
    }

    fn lookup(&self, name: &str) -> Option<usize> {
        self.index.get(&base_name(Path::new(name))).copied()
    }

    fn eval_index(&mut self, idx: usize) -> Result<(), PreprocessError> {
        match self.files[idx].status {
            Status::Evaluated => return Ok(()),
            Status::Evaluating => {
                let entry = &self.files[idx];
                return Err(PreprocessError::CyclicInclude {
                    path: entry.path.clone(),
                    line: 0,
                    name: entry.name.clone(),
                });
            }
            Status::Registered => {}
        }
        self.files[idx].status = Status::Evaluating;

        // Load lazily on first evaluation
        let file_id = match self.files[idx].file_id {
            Some(id) => id,
            None => {
                let path = self.files[idx].path.clone();
                let id = self.db.load_file(&path).map_err(|source| PreprocessError::Io {
                    path: path.clone(),
                    source,
                })?;
                self.files[idx].file_id = Some(id);
                id
            }
        };
        let path = self.files[idx].path.clone();
        let content = self.db.get_file(file_id).content.clone();
        let items = parse_items(&content, file_id, &path)?;

        let mut segs = Vec::new();
        let mut frames = Vec::new();
        self.eval_items(idx, &path, &items, &mut frames, &mut segs)?;

        // Assemble the final output, inlining include results at their
        // markers and substituting define values into lines.
        let mut out = Vec::new();
        let mut embedded: HashSet<String> = HashSet::new();
        for seg in segs {
            match seg {
                Seg::Line(text, loc) => {
                    let text =
                        self.substitute_line(&text)
                            .map_err(|source| PreprocessError::Expression {
                                path: path.clone(),
                                line: loc.line,
                                source,
                            })?;
                    out.push(OutLine::new(text, loc));
                }
                Seg::Include(name) => {
                    if embedded.contains(&name) {
                        continue;
                    }
                    self.collect_transitive(&name, &mut embedded);
                    if let Some(inc_idx) = self.lookup(&name) {
                        out.extend(self.files[inc_idx].result.iter().cloned());
                    }
                }
            }
        }

        let entry = &mut self.files[idx];
        entry.result = out;
        entry.status = Status::Evaluated;
        Ok(())
    }

    fn collect_transitive(&self, name: &str, acc: &mut HashSet<String>) {
        if !acc.insert(name.to_string()) {
            return;
        }
        if let Some(idx) = self.lookup(name) {
            for inc in self.files[idx].includes.clone() {
                self.collect_transitive(&inc, acc);
            }
        }
    }

    fn eval_items(
        &mut self,
        idx: usize,
        path: &Path,
        items: &[Item],
        frames: &mut Vec<(String, Value)>,
        out: &mut Vec<Seg>,
    ) -> Result<(), PreprocessError> {
        for item in items {
            match item {
                Item::Line { text, loc } => {
                    let text = if frames.is_empty() {
                        text.clone()
                    } else {
                        self.substitute_loop_exprs(text, frames, path, loc.line)?
                    };
                    out.push(Seg::Line(text, *loc));
                }
                Item::Define { name, value, loc: _ } => match value {
                    Some(expr) => self.env.set_expr(name, expr.clone()),
                    None => self.env.set_value(name, Value::Bool(true)),
                },
                Item::Include { name, loc } => {
                    self.include_file(idx, name, path, loc.line)?;
                    out.push(Seg::Include(name.clone()));
                }
                Item::If { sections, loc } => {
                    for (cond, body) in sections {
                        let taken = match cond {
                            IfCond::Expr(expr) => self
                                .eval_expr(expr, frames, path, loc.line)?
                                .truthy(),
                            IfCond::Defined(name) => self.is_bound(name, frames),
                            IfCond::NotDefined(name) => !self.is_bound(name, frames),
                            IfCond::Else => true,
                        };
                        if taken {
                            self.eval_items(idx, path, body, frames, out)?;
                            break;
                        }
                    }
                }
                Item::For {
                    var,
                    iterable,
                    body,
                    loc,
                } => {
                    let value = self.eval_expr(iterable, frames, path, loc.line)?;
                    let Value::List(values) = value else {
                        return Err(PreprocessError::BadIterable {
                            path: path.to_path_buf(),
                            line: loc.line,
                        });
                    };
                    for item_value in values {
                        frames.push((var.clone(), item_value));
                        self.eval_items(idx, path, body, frames, out)?;
                        frames.pop();
                    }
                }
            }
        }
        Ok(())
    }

    fn include_file(
        &mut self,
        from: usize,
        name: &str,
        path: &Path,
        line: u32,
    ) -> Result<(), PreprocessError> {
        let Some(inc_idx) = self.lookup(name) else {
            return Err(PreprocessError::IncludeNotFound {
                path: path.to_path_buf(),
                line,
                name: name.to_string(),
            });
        };
        match self.files[inc_idx].status {
            Status::Evaluated => {}
            Status::Evaluating => {
                return Err(PreprocessError::CyclicInclude {
                    path: path.to_path_buf(),
                    line,
                    name: name.to_string(),
                });
            }
            Status::Registered => self.eval_index(inc_idx)?,
        }
        let includes = &mut self.files[from].includes;
        if !includes.iter().any(|existing| existing == name) {
            includes.push(name.to_string());
        }
        Ok(())
    }

    fn eval_expr(
        &self,
        text: &str,
        frames: &[(String, Value)],
        path: &Path,
        line: u32,
    ) -> Result<Value, PreprocessError> {
        let resolver = StackedResolver {
            frames,
            env: &self.env,
        };
        evaluate(text, &resolver).map_err(|source| PreprocessError::Expression {
            path: path.to_path_buf(),
            line,
            source,
        })
    }

    /// Replaces `$(expr)` occurrences on a `#for`-body line with the
    /// evaluated expression value (loop variables in scope).
    fn substitute_loop_exprs(
        &self,
        text: &str,
        frames: &[(String, Value)],
        path: &Path,
        line: u32,
    ) -> Result<String, PreprocessError> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '$' && chars.get(i + 1) == Some(&'(') {
                if let Some(close) = matching_paren(&chars, i + 1) {
                    let expr: String = chars[i + 2..close].iter().collect();
                    let value = self.eval_expr(&expr, frames, path, line)?;
                    out.push_str(&value.to_string());
                    i = close + 1;
                    continue;
                }
            }
            out.push(chars[i]);
            i += 1;
        }
        Ok(out)
    }

    /// Replaces `<NAME>` and bare define names on an output line.
    ///
    /// Only names actually bound in the environment are substituted; unknown
    /// `<...>` text is left verbatim so document content survives.
    fn substitute_line(&self, text: &str) -> Result<String, EvalError> {
        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            if c == '<' {
                if let Some(end) = bracketed_name(&chars, i) {
                    let name: String = chars[i + 1..end].iter().collect();
                    if let Some(value) = self.env.resolve(&name)? {
                        out.push_str(&value.to_string());
                        i = end + 1;
                        continue;
                    }
                }
                out.push('<');
                i += 1;
            } else if (c.is_ascii_alphabetic() || c == '_') && ident_boundary(&chars, i) {
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                let name: String = chars[i..j].iter().collect();
                let followed_by_close = chars.get(j) == Some(&'>');
                if !followed_by_close {
                    if let Some(value) = self.env.resolve(&name)? {
                        out.push_str(&value.to_string());
                        i = j;
                        continue;
                    }
                }
                out.push_str(&name);
                i = j;
            } else {
                out.push(c);
                i += 1;
            }
        }
        Ok(out)
    }

    fn is_bound(&self, name: &str, frames: &[(String, Value)]) -> bool {
        frames.iter().any(|(bound, _)| bound == name) || self.env.contains(name)
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string()
}

fn bracketed_name(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if i >= chars.len() || !(chars[i].is_ascii_alphabetic() || chars[i] == '_') {
        return None;
    }
    while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
        i += 1;
    }
    if i < chars.len() && chars[i] == '>' {
        Some(i)
    } else {
        None
    }
}

fn ident_boundary(chars: &[char], i: usize) -> bool {
    if i == 0 {
        return true;
    }
    let prev = chars[i - 1];
    !(prev.is_ascii_alphanumeric() || prev == '_' || prev == '<')
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0;
    for (i, c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_source(content: &str) -> Vec<String> {
        let mut scope = Scope::new();
        scope.add_source("top.yaml", content).unwrap();
        scope.evaluate("top.yaml").unwrap();
        scope
            .result("top.yaml")
            .unwrap()
            .iter()
            .map(|l| l.text.clone())
            .collect()
    }

    fn eval_err(content: &str) -> PreprocessError {
        let mut scope = Scope::new();
        scope.add_source("top.yaml", content).unwrap();
        scope.evaluate("top.yaml").unwrap_err()
    }

    #[test]
    fn define_arithmetic() {
        let out = eval_source(
            "#define VAL_1 3\n#define VAL_2 5\n#define VAL_3 (VAL_1 * VAL_2)\nresult=<VAL_3>",
        );
        assert_eq!(out, vec!["result=15"]);
    }

    #[test]
    fn for_loop_with_arithmetic() {
        let out = eval_source("#define MAX 3\n#for i in range(MAX)\nv=$(i*2)\n#endfor");
        assert_eq!(out, vec!["v=0", "v=2", "v=4"]);
    }

    #[test]
    fn for_loop_over_list_of_strings() {
        let out = eval_source("#for n in [\"rx\", \"tx\"]\nport_$(n)\n#endfor");
        assert_eq!(out, vec!["port_rx", "port_tx"]);
    }

    #[test]
    fn nested_for_sees_outer_variable() {
        let out = eval_source("#for i in range(2)\n#for j in range(2)\np=$(i*10+j)\n#endfor\n#endfor");
        assert_eq!(out, vec!["p=0", "p=1", "p=10", "p=11"]);
    }

    #[test]
    fn if_selects_single_branch() {
        let out = eval_source("#define MODE 2\n#if MODE == 1\na\n#elif MODE == 2\nb\n#else\nc\n#endif");
        assert_eq!(out, vec!["b"]);
    }

    #[test]
    fn ifdef_and_ifndef() {
        let out = eval_source("#define FEATURE\n#ifdef FEATURE\nyes\n#endif\n#ifndef FEATURE\nno\n#endif");
        assert_eq!(out, vec!["yes"]);
    }

    #[test]
    fn if_without_else_can_be_empty() {
        let out = eval_source("#if 0\nhidden\n#endif\nvisible");
        assert_eq!(out, vec!["visible"]);
    }

    #[test]
    fn bare_name_substitution() {
        let out = eval_source("#define WIDTH 8\nwidth: WIDTH");
        assert_eq!(out, vec!["width: 8"]);
    }

    #[test]
    fn unknown_bracketed_name_left_verbatim() {
        let out = eval_source("text with <UNKNOWN> marker");
        assert_eq!(out, vec!["text with <UNKNOWN> marker"]);
    }

    #[test]
    fn later_define_wins() {
        let out = eval_source("#define X 1\n#define X 2\nvalue=<X>");
        assert_eq!(out, vec!["value=2"]);
    }

    #[test]
    fn include_inlines_other_file() {
        let mut scope = Scope::new();
        scope.add_source("inner.yaml", "inner line").unwrap();
        scope
            .add_source("top.yaml", "before\n#include \"inner.yaml\"\nafter")
            .unwrap();
        scope.evaluate("top.yaml").unwrap();
        let texts: Vec<_> = scope
            .result("top.yaml")
            .unwrap()
            .iter()
            .map(|l| l.text.clone())
            .collect();
        assert_eq!(texts, vec!["before", "inner line", "after"]);
        assert_eq!(scope.includes_of("top.yaml"), ["inner.yaml"]);
    }

    #[test]
    fn include_defines_visible_to_later_lines() {
        let mut scope = Scope::new();
        scope.add_source("defs.yaml", "#define DEPTH 4").unwrap();
        scope
            .add_source("top.yaml", "#include \"defs.yaml\"\ndepth=<DEPTH>")
            .unwrap();
        scope.evaluate("top.yaml").unwrap();
        let texts: Vec<_> = scope
            .result("top.yaml")
            .unwrap()
            .iter()
            .map(|l| l.text.clone())
            .collect();
        assert_eq!(texts, vec!["depth=4"]);
    }

    #[test]
    fn transitive_include_embedded_once() {
        let mut scope = Scope::new();
        scope.add_source("base.yaml", "base").unwrap();
        scope
            .add_source("mid.yaml", "#include \"base.yaml\"\nmid")
            .unwrap();
        scope
            .add_source("top.yaml", "#include \"mid.yaml\"\n#include \"base.yaml\"\ntop")
            .unwrap();
        scope.evaluate("top.yaml").unwrap();
        let texts: Vec<_> = scope
            .result("top.yaml")
            .unwrap()
            .iter()
            .map(|l| l.text.clone())
            .collect();
        assert_eq!(texts, vec!["base", "mid", "top"]);
    }

    #[test]
    fn cyclic_include_rejected() {
        let mut scope = Scope::new();
        scope.add_source("a.yaml", "#include \"b.yaml\"").unwrap();
        scope.add_source("b.yaml", "#include \"a.yaml\"").unwrap();
        let err = scope.evaluate("a.yaml").unwrap_err();
        assert!(matches!(err, PreprocessError::CyclicInclude { .. }));
    }

    #[test]
    fn include_not_found() {
        assert!(matches!(
            eval_err("#include \"missing.yaml\""),
            PreprocessError::IncludeNotFound { .. }
        ));
    }

    #[test]
    fn undefined_name_in_expression_errors() {
        let err = eval_err("#if UNDEFINED > 2\nx\n#endif");
        assert!(matches!(err, PreprocessError::Expression { line: 1, .. }));
    }

    #[test]
    fn non_list_iterable_rejected() {
        assert!(matches!(
            eval_err("#for i in 5\nx\n#endfor"),
            PreprocessError::BadIterable { line: 1, .. }
        ));
    }

    #[test]
    fn division_is_floor_division() {
        let out = eval_source("#define HALF (7 / 2)\nhalf=<HALF>");
        assert_eq!(out, vec!["half=3"]);
    }

    #[test]
    fn loop_variable_lexically_scoped() {
        // The loop variable does not leak past #endfor
        let err = eval_err("#for i in range(2)\n#endfor\n#if i > 0\nx\n#endif");
        assert!(matches!(err, PreprocessError::Expression { .. }));
    }

    #[test]
    fn conditional_define_in_branch() {
        let out = eval_source("#if 1\n#define SEL 7\n#endif\nsel=<SEL>");
        assert_eq!(out, vec!["sel=7"]);
    }

    #[test]
    fn lazy_files_never_loaded() {
        let mut scope = Scope::new();
        scope.add_file(Path::new("/nonexistent/never.yaml")).unwrap();
        scope.add_source("top.yaml", "fine").unwrap();
        // Evaluating top never touches the unreadable file
        scope.evaluate("top.yaml").unwrap();
        assert!(!scope.is_evaluated("never.yaml"));
    }

    #[test]
    fn duplicate_file_name_rejected() {
        let mut scope = Scope::new();
        scope.add_source("dir1/common.yaml", "a").unwrap();
        let err = scope.add_source("dir2/common.yaml", "b").unwrap_err();
        assert!(matches!(err, PreprocessError::DuplicateFile { .. }));
    }

    #[test]
    fn evaluation_is_idempotent() {
        let input = "#define VAL_1 3\n#define VAL_2 5\n#define VAL_3 (VAL_1 * VAL_2)\nresult=<VAL_3>";
        let first = eval_source(input);
        // Feed the substituted output through a fresh scope: a fixpoint
        let again = eval_source(&first.join("\n"));
        assert_eq!(first, again);
    }

    #[test]
    fn output_lines_carry_provenance() {
        let mut scope = Scope::new();
        scope.add_source("top.yaml", "#define X 1\nvalue=<X>").unwrap();
        scope.evaluate("top.yaml").unwrap();
        let lines = scope.result("top.yaml").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].loc.line, 2);
        let described = scope.source_db().describe(lines[0].loc);
        assert_eq!(described, "top.yaml:2");
    }
}
