//! Define resolution: `!Def` constants into [`Define`] nodes.
//!
//! Definitions are topologically sorted by name reference before
//! evaluation, so resolution order never depends on declaration order and
//! dependency cycles are reported with their members.

use crate::errors::ElabError;
use crate::interconnect::pick_description;
use crate::scope::ElabScope;
use indexmap::IndexMap;
use keel_design::{Attributes, Define, DefineId, Project};
use std::collections::VecDeque;

/// Resolves every `!Def` in scope and attaches one [`Define`] node per
/// definition to the project.
///
/// Returns the created nodes keyed by the definition's (lowercased) name.
pub fn resolve_defines(
    scope: &ElabScope,
    project: &mut Project,
) -> Result<IndexMap<String, DefineId>, ElabError> {
    // Dependency edges: def -> defs referenced by its value expression
    let names: Vec<String> = scope
        .defs()
        .map(|d| d.common.name.to_ascii_lowercase())
        .collect();
    let mut depends: IndexMap<String, Vec<String>> = IndexMap::new();
    for def in scope.defs() {
        let refs: Vec<String> = referenced_names(&def.val)
            .into_iter()
            .filter(|r| names.contains(r))
            .collect();
        depends.insert(def.common.name.to_ascii_lowercase(), refs);
    }

    // Kahn's algorithm over the reference graph
    let mut in_degree: IndexMap<String, usize> = depends
        .iter()
        .map(|(name, refs)| (name.clone(), refs.len()))
        .collect();
    let mut ready: VecDeque<String> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| name.clone())
        .collect();
    let mut order = Vec::new();
    while let Some(name) = ready.pop_front() {
        order.push(name.clone());
        for (other, refs) in &depends {
            if refs.contains(&name) {
                let degree = in_degree.get_mut(other).expect("degree tracked");
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(other.clone());
                }
            }
        }
    }
    if order.len() != depends.len() {
        let cycle: Vec<String> = in_degree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(name, _)| name.clone())
            .collect();
        return Err(ElabError::CyclicDefine {
            cycle: cycle.join(" -> "),
        });
    }

    // Evaluate in dependency order; the scope resolver handles the actual
    // recursive lookups, the order only fixes error attribution
    let mut resolved = IndexMap::new();
    for name in order {
        let def = scope.get_def(&name).expect("ordered from scope");
        let value = scope.eval_i64(&def.val, &format!("value of `{}`", def.common.name))?;
        let id = project.defines.alloc(Define {
            id: project.defines.next_id(),
            name: def.common.name.clone(),
            value,
            description: pick_description(&def.common.ld, &def.common.sd),
            attributes: Attributes::new(),
        });
        resolved.insert(name, id);
    }
    Ok(resolved)
}

/// Extracts the identifier tokens of an expression.
fn referenced_names(expr: &str) -> Vec<String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut names = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if !matches!(word.as_str(), "and" | "or" | "not" | "range" | "true" | "false"
                | "True" | "False")
            {
                names.push(word.to_ascii_lowercase());
            }
        } else {
            i += 1;
        }
    }
    names
}
