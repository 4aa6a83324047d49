//! The elaborator's name table over parsed documents.

use crate::errors::{warn_duplicate_doc, ElabError};
use indexmap::IndexMap;
use keel_common::{evaluate, EvalError, Resolver, Value};
use keel_diagnostics::DiagnosticSink;
use keel_schema::{Config, Def, Doc, Group, His, Inst, Mod};
use num_traits::ToPrimitive;

const MAX_RESOLVE_DEPTH: usize = 64;

/// The document scope used to resolve references during elaboration.
///
/// Documents are keyed by lowercased name per kind; the first definition of
/// a name wins, with one exception: re-declaring a `!Def` with identical
/// value text is silently accepted.
#[derive(Default)]
pub struct ElabScope {
    defs: IndexMap<String, Def>,
    his: IndexMap<String, His>,
    mods: IndexMap<String, Mod>,
    groups: IndexMap<String, Group>,
    insts: IndexMap<String, Inst>,
    configs: IndexMap<String, Config>,
}

impl ElabScope {
    /// Creates an empty scope.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document to the scope, classifying it by kind.
    ///
    /// Unnamed and legacy documents are ignored; `!Define` overrides are
    /// routed separately by the driver and are not part of the name table.
    pub fn add_document(&mut self, doc: &Doc, sink: &DiagnosticSink) {
        let name = doc.name().trim().to_ascii_lowercase();
        if name.is_empty() {
            return;
        }
        match doc {
            Doc::Def(def) => {
                if let Some(existing) = self.defs.get(&name) {
                    if existing.val != def.val {
                        sink.emit(warn_duplicate_doc("Def", &def.common.name));
                    }
                    return;
                }
                self.defs.insert(name, def.clone());
            }
            Doc::His(his) => {
                Self::insert(&mut self.his, name, his.clone(), "His", sink);
            }
            Doc::Mod(module) => {
                Self::insert(&mut self.mods, name, module.clone(), "Mod", sink);
            }
            Doc::Group(group) => {
                Self::insert(&mut self.groups, name, group.clone(), "Group", sink);
            }
            Doc::Inst(inst) => {
                Self::insert(&mut self.insts, name, inst.clone(), "Inst", sink);
            }
            Doc::Config(config) => {
                Self::insert(&mut self.configs, name, config.clone(), "Config", sink);
            }
            Doc::Define(_) | Doc::Legacy { .. } => {}
        }
    }

    fn insert<T>(
        map: &mut IndexMap<String, T>,
        key: String,
        value: T,
        kind: &str,
        sink: &DiagnosticSink,
    ) {
        if map.contains_key(&key) {
            sink.emit(warn_duplicate_doc(kind, &key));
            return;
        }
        map.insert(key, value);
    }

    /// Looks up a constant definition (case-insensitive).
    pub fn get_def(&self, name: &str) -> Option<&Def> {
        self.defs.get(&name.trim().to_ascii_lowercase())
    }

    /// Looks up an interconnect type (case-insensitive).
    pub fn get_his(&self, name: &str) -> Option<&His> {
        self.his.get(&name.trim().to_ascii_lowercase())
    }

    /// Looks up a module (case-insensitive).
    pub fn get_mod(&self, name: &str) -> Option<&Mod> {
        self.mods.get(&name.trim().to_ascii_lowercase())
    }

    /// Looks up a register group (case-insensitive).
    pub fn get_group(&self, name: &str) -> Option<&Group> {
        self.groups.get(&name.trim().to_ascii_lowercase())
    }

    /// Looks up an instruction (case-insensitive).
    pub fn get_inst(&self, name: &str) -> Option<&Inst> {
        self.insts.get(&name.trim().to_ascii_lowercase())
    }

    /// Iterates over all constant definitions in scope, in insertion order.
    pub fn defs(&self) -> impl Iterator<Item = &Def> {
        self.defs.values()
    }

    /// Iterates over all interconnect types in scope.
    pub fn all_his(&self) -> impl Iterator<Item = &His> {
        self.his.values()
    }

    /// Evaluates an expression, resolving names against `!Def` values.
    pub fn evaluate(&self, expr: &str) -> Result<Value, EvalError> {
        let resolver = DefResolver {
            scope: self,
            depth: 0,
        };
        evaluate(expr, &resolver)
    }

    /// Evaluates an expression to an `i64`, with error context.
    pub fn eval_i64(&self, expr: &str, context: &str) -> Result<i64, ElabError> {
        let wrap = |source: EvalError| ElabError::Expression {
            context: context.to_string(),
            source,
        };
        let value = self.evaluate(expr).map_err(wrap)?;
        let int = value.as_int().map_err(wrap)?;
        int.to_i64().ok_or_else(|| {
            wrap(EvalError::Type(format!(
                "value `{int}` does not fit in 64 bits"
            )))
        })
    }

    /// Evaluates an expression to a `u64`, rejecting negatives.
    pub fn eval_u64(&self, expr: &str, context: &str) -> Result<u64, ElabError> {
        let value = self.eval_i64(expr, context)?;
        u64::try_from(value).map_err(|_| ElabError::Expression {
            context: context.to_string(),
            source: EvalError::Type(format!("value `{value}` must not be negative")),
        })
    }

    /// Evaluates an expression to a `u32`, rejecting negatives and overflow.
    pub fn eval_u32(&self, expr: &str, context: &str) -> Result<u32, ElabError> {
        let value = self.eval_i64(expr, context)?;
        u32::try_from(value).map_err(|_| ElabError::Expression {
            context: context.to_string(),
            source: EvalError::Type(format!("value `{value}` is out of range")),
        })
    }
}

struct DefResolver<'a> {
    scope: &'a ElabScope,
    depth: usize,
}

impl Resolver for DefResolver<'_> {
    fn resolve(&self, name: &str) -> Result<Option<Value>, EvalError> {
        let Some(def) = self.scope.get_def(name) else {
            return Ok(None);
        };
        if self.depth >= MAX_RESOLVE_DEPTH {
            return Err(EvalError::Recursion(name.to_string()));
        }
        let nested = DefResolver {
            scope: self.scope,
            depth: self.depth + 1,
        };
        evaluate(&def.val, &nested).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_schema::TagCommon;
    use keel_source::Loc;

    fn def(name: &str, val: &str) -> Doc {
        Doc::Def(Def {
            common: TagCommon::assemble(
                name.to_string(),
                String::new(),
                String::new(),
                Vec::new(),
                Loc::DUMMY,
            ),
            val: val.to_string(),
        })
    }

    fn scope_with(docs: &[Doc]) -> ElabScope {
        let sink = DiagnosticSink::new();
        let mut scope = ElabScope::new();
        for doc in docs {
            scope.add_document(doc, &sink);
        }
        scope
    }

    #[test]
    fn def_resolution_is_recursive() {
        let scope = scope_with(&[def("A", "3"), def("B", "A * 5"), def("C", "B + A")]);
        assert_eq!(scope.eval_i64("C", "test").unwrap(), 18);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let scope = scope_with(&[def("CLOCK_MHZ", "450")]);
        assert!(scope.get_def("clock_mhz").is_some());
        assert_eq!(scope.eval_i64("CLOCK_MHZ", "test").unwrap(), 450);
    }

    #[test]
    fn identical_def_redefinition_accepted() {
        let sink = DiagnosticSink::new();
        let mut scope = ElabScope::new();
        scope.add_document(&def("X", "5"), &sink);
        scope.add_document(&def("X", "5"), &sink);
        assert!(sink.diagnostics().is_empty());
        scope.add_document(&def("X", "6"), &sink);
        assert_eq!(sink.diagnostics().len(), 1);
        // First definition wins
        assert_eq!(scope.eval_i64("X", "test").unwrap(), 5);
    }

    #[test]
    fn negative_rejected_for_unsigned() {
        let scope = scope_with(&[def("NEG", "-4")]);
        assert!(scope.eval_u64("NEG", "test").is_err());
        assert_eq!(scope.eval_i64("NEG", "test").unwrap(), -4);
    }

    #[test]
    fn unknown_name_surfaces() {
        let scope = scope_with(&[]);
        let err = scope.eval_i64("MISSING + 1", "test").unwrap_err();
        assert!(matches!(err, ElabError::Expression { .. }));
    }
}
