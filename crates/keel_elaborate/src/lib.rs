//! Elaboration of parsed schema documents into the Keel design graph.
//!
//! Each top-level document kind has its own elaborator; [`elaborate`] drives
//! them over the documents of the top file and assembles one project.

#![warn(missing_docs)]

mod address_map;
mod define;
mod errors;
mod instruction;
mod interconnect;
mod module;
mod register_event;
mod register_setclear;
mod registers;
mod scope;

pub use address_map::elaborate_map;
pub use define::resolve_defines;
pub use errors::ElabError;
pub use instruction::elaborate_instruction;
pub use interconnect::{ensure_interconnect, leaf_roles};
pub use module::{ModuleElab, RegisterLookup, RegisterSource};
pub use registers::{elaborate_registers, synthesize_config};
pub use scope::ElabScope;

use keel_design::{NodeRef, Project};
use keel_diagnostics::DiagnosticSink;
use keel_schema::{Doc, DefineOverride};
use std::collections::HashSet;

/// Elaborates the documents of the top file into the project.
///
/// Defines are resolved first (validating acyclicity over the whole scope);
/// modules, interconnects, and instructions then become principal nodes.
/// Top-level `!Group`/`!Config` documents elaborate as a standalone register
/// set; interconnect types pulled in along the way are attached as reference
/// nodes.
pub fn elaborate(
    top_docs: &[Doc],
    scope: &ElabScope,
    registers: &RegisterLookup,
    project: &mut Project,
    sink: &DiagnosticSink,
    max_depth: Option<u32>,
) -> Result<(), ElabError> {
    let defines = resolve_defines(scope, project)?;
    let mut principal_names: HashSet<String> = HashSet::new();

    // Top-level Def documents become principal Define nodes
    for doc in top_docs {
        if let Doc::Def(def) = doc {
            let key = def.common.name.to_ascii_lowercase();
            if let Some(&id) = defines.get(&key) {
                project.add_principal(def.common.name.clone(), NodeRef::Define(id))?;
            }
        }
    }

    let mut reg_groups = Vec::new();
    let mut reg_config = None;
    let overrides: Vec<DefineOverride> = top_docs
        .iter()
        .filter_map(|doc| match doc {
            Doc::Define(define) => Some(define.clone()),
            _ => None,
        })
        .collect();

    for doc in top_docs {
        match doc {
            Doc::Mod(module) => {
                let elab = ModuleElab {
                    scope,
                    sink,
                    registers,
                    max_depth,
                };
                let block = elab.elaborate(module, project)?;
                project.add_principal(module.common.name.clone(), NodeRef::Block(block))?;
                principal_names.insert(module.common.name.to_ascii_lowercase());
            }
            Doc::His(his) => {
                let id =
                    ensure_interconnect(&his.common.name, scope, project, &mut Vec::new())?;
                project.add_principal(his.common.name.clone(), NodeRef::Interconnect(id))?;
                principal_names.insert(his.common.name.to_ascii_lowercase());
            }
            Doc::Inst(inst) => {
                let id = elaborate_instruction(inst, scope, project)?;
                project.add_principal(inst.common.name.clone(), NodeRef::Command(id))?;
            }
            Doc::Config(config) if reg_config.is_none() => {
                reg_config = Some(config.clone());
            }
            Doc::Group(group) => {
                if !group.group_type.eq_ignore_ascii_case("macro") {
                    reg_groups.push(group.common.name.clone());
                }
            }
            _ => {}
        }
    }

    // A top file holding register descriptions elaborates them standalone
    if reg_config.is_some() || !reg_groups.is_empty() {
        let config = reg_config.unwrap_or_else(|| synthesize_config(reg_groups.into_iter()));
        let groups = elaborate_registers(&config, &overrides, scope, project, sink)?;
        for gid in groups {
            let name = project.groups[gid].name.clone();
            project.add_principal(name, NodeRef::Group(gid))?;
        }
    }

    // Every interconnect type that is not itself principal is a reference
    // node shared by the principals
    let references: Vec<(String, NodeRef)> = project
        .interconnects
        .iter()
        .filter(|(_, intc)| !principal_names.contains(&intc.name.to_ascii_lowercase()))
        .map(|(id, intc)| (intc.name.clone(), NodeRef::Interconnect(id)))
        .collect();
    for (name, node) in references {
        project.add_reference(name, node);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_preprocess::OutLine;
    use keel_schema::parse_documents;
    use keel_source::{FileId, Loc};

    fn run(text: &str) -> (Project, DiagnosticSink) {
        let lines: Vec<OutLine> = text
            .lines()
            .enumerate()
            .map(|(i, l)| OutLine::new(l, Loc::new(FileId::from_raw(0), (i + 1) as u32)))
            .collect();
        let docs = parse_documents(&lines).expect("test input should parse");
        let sink = DiagnosticSink::new();
        let mut scope = ElabScope::new();
        for doc in &docs {
            scope.add_document(doc, &sink);
        }
        let mut project = Project::new("test");
        let registers = RegisterLookup::new();
        elaborate(&docs, &scope, &registers, &mut project, &sink, None)
            .expect("elaboration should succeed");
        (project, sink)
    }

    #[test]
    fn his_becomes_principal_interconnect() {
        let (project, _) = run("- !His\n  name: bus\n  ports:\n  - !Port [data, 8]");
        let names: Vec<&str> = project.principal_nodes().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["bus"]);
    }

    #[test]
    fn def_becomes_principal_define() {
        let (project, _) = run("- !Def [CLOCK_MHZ, 450]");
        assert_eq!(project.defines.len(), 1);
        assert!(project
            .principal_nodes()
            .any(|(n, node)| n == "CLOCK_MHZ" && matches!(node, NodeRef::Define(_))));
    }

    #[test]
    fn standalone_groups_elaborate_without_config() {
        let (project, _) = run(
            "- !Group\n  name: ctrl\n  regs:\n  - !Reg [status]\n- !Group\n  name: stats\n  regs:\n  - !Reg [count]",
        );
        let names: Vec<&str> = project.principal_nodes().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["ctrl", "stats"]);
        // Groups placed in declaration order; second starts after the first
        assert_eq!(project.groups.values().map(|g| g.offset).collect::<Vec<_>>(), vec![0, 4]);
    }

    #[test]
    fn mod_with_used_types_registers_references() {
        let (project, _) = run(
            "- !His\n  name: clock\n  ports:\n  - !Port [clk]\n- !His\n  name: reset\n  ports:\n  - !Port [rst]\n- !Mod\n  name: top\n  ports: []",
        );
        // clock and reset are principals here (declared in the top file)
        let principals: Vec<&str> = project.principal_nodes().map(|(n, _)| n).collect();
        assert!(principals.contains(&"top"));
        assert!(principals.contains(&"clock"));
    }
}
