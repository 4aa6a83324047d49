//! Instruction elaboration: `!Inst` inheritance chains into [`Command`]s.

use crate::errors::ElabError;
use crate::interconnect::{build_enums, options_to_attributes, pick_description};
use crate::scope::ElabScope;
use keel_design::{Command, CommandId, CommandField, Project};
use keel_schema::{Field, Inst};

/// The command word width.
const COMMAND_WIDTH: u32 = 32;

struct Resolved {
    field: Field,
    inherited: bool,
    fixed: Option<i64>,
}

/// Elaborates an instruction into a [`Command`] attached to the project.
///
/// The inheritance chain is collapsed root-first: every ancestor's fields
/// appear before the instruction's own, each level fixes exactly one
/// inherited enumerated field via `decode_f`/`decode_e`, and inherited
/// fields are marked `inherited`.
pub fn elaborate_instruction(
    inst: &Inst,
    scope: &ElabScope,
    project: &mut Project,
) -> Result<CommandId, ElabError> {
    let mut chain = Vec::new();
    let fields = resolve_instruction(inst, scope, &mut chain)?;

    let mut command_fields: Vec<CommandField> = Vec::new();
    let mut bitmap: Vec<Option<usize>> = vec![None; COMMAND_WIDTH as usize];
    let mut next_lsb: Option<u32> = Some(0);

    for resolved in &fields {
        let field = &resolved.field;
        let name = &field.common.name;
        let ctx = format!("{}.{name}", inst.common.name);
        let field_err = |detail: String| ElabError::Field {
            reg: inst.common.name.clone(),
            field: name.clone(),
            detail,
        };

        let width = match &field.width {
            Some(expr) => scope.eval_u32(expr, &format!("width of `{ctx}`"))?,
            None => 1,
        };
        if width == 0 {
            continue;
        }
        let req_lsb = match &field.lsb {
            Some(expr) => Some(scope.eval_u32(expr, &format!("lsb of `{ctx}`"))?),
            None => None,
        };
        let req_msb = match &field.msb {
            Some(expr) => Some(scope.eval_u32(expr, &format!("msb of `{ctx}`"))?),
            None => None,
        };
        let lsb = match (req_lsb, req_msb) {
            (Some(lsb), Some(msb)) => {
                if msb + 1 != lsb + width {
                    return Err(field_err(format!(
                        "lsb {lsb} and msb {msb} disagree with width {width}"
                    )));
                }
                lsb
            }
            (Some(lsb), None) => lsb,
            (None, Some(msb)) => {
                if msb + 1 < width {
                    return Err(field_err(format!(
                        "msb {msb} leaves no room for width {width}"
                    )));
                }
                msb + 1 - width
            }
            (None, None) => next_lsb.ok_or_else(|| {
                field_err("no free bits left in the command word".to_string())
            })?,
        };

        if lsb + width > COMMAND_WIDTH {
            return Err(field_err(format!(
                "bits {lsb}..{} exceed the {COMMAND_WIDTH}-bit command word",
                lsb + width
            )));
        }
        let span = lsb as usize..(lsb + width) as usize;
        if let Some(occupant) = bitmap[span.clone()].iter().flatten().next() {
            return Err(ElabError::FieldOverlap {
                reg: inst.common.name.clone(),
                first: command_fields[*occupant]
                    .name
                    .clone(),
                second: name.clone(),
            });
        }
        let slot = command_fields.len();
        for bit in &mut bitmap[span] {
            *bit = Some(slot);
        }
        next_lsb = bitmap
            .iter()
            .skip((lsb + width) as usize)
            .position(Option::is_none)
            .map(|free| (lsb + width) + free as u32);

        let reset = match resolved.fixed {
            Some(value) => value,
            None => match &field.reset {
                Some(expr) => scope.eval_i64(expr, &format!("reset of `{ctx}`"))?,
                None => 0,
            },
        };

        let mut attributes = options_to_attributes(&field.common.options);
        attributes.insert("inherited".to_string(), resolved.inherited.into());
        if resolved.fixed.is_some() {
            attributes.insert("value_fixed".to_string(), true.into());
        }

        command_fields.push(CommandField {
            name: name.clone(),
            lsb,
            width,
            reset,
            signed: false,
            inherited: resolved.inherited,
            enums: build_enums(&field.enums, scope)?,
            description: pick_description(&field.common.ld, &field.common.sd),
            attributes,
        });
    }

    let mut attributes = options_to_attributes(&inst.common.options);
    if let Some(base) = &inst.base {
        attributes.insert("base".to_string(), base.as_str().into());
    }
    if let Some(decode_f) = &inst.decode_f {
        attributes.insert("decode_f".to_string(), decode_f.as_str().into());
    }
    if let Some(decode_e) = &inst.decode_e {
        attributes.insert("decode_e".to_string(), decode_e.as_str().into());
    }

    let id = project.commands.alloc(Command {
        id: project.commands.next_id(),
        name: inst.common.name.clone(),
        width: COMMAND_WIDTH,
        fields: command_fields,
        description: pick_description(&inst.common.ld, &inst.common.sd),
        attributes,
    });
    Ok(id)
}

/// Collapses the inheritance chain of an instruction into its full ordered
/// field list.
fn resolve_instruction(
    inst: &Inst,
    scope: &ElabScope,
    chain: &mut Vec<String>,
) -> Result<Vec<Resolved>, ElabError> {
    let key = inst.common.name.to_ascii_lowercase();
    if chain.contains(&key) {
        return Err(ElabError::CyclicInst {
            name: inst.common.name.clone(),
        });
    }
    chain.push(key);

    let mut fields: Vec<Resolved> = Vec::new();
    if let Some(base_name) = &inst.base {
        let base = scope.get_inst(base_name).ok_or_else(|| ElabError::Unresolved {
            kind: "base instruction",
            name: base_name.clone(),
        })?;
        for mut resolved in resolve_instruction(base, scope, chain)? {
            resolved.inherited = true;
            fields.push(resolved);
        }

        // Exactly one inherited field is fixed at this level
        let Some(decode_f) = &inst.decode_f else {
            return Err(ElabError::Instruction {
                inst: inst.common.name.clone(),
                detail: format!("extends `{base_name}` but fixes no field (`decode_f`)"),
            });
        };
        let Some(decode_e) = &inst.decode_e else {
            return Err(ElabError::Instruction {
                inst: inst.common.name.clone(),
                detail: format!("fixes `{decode_f}` but names no value (`decode_e`)"),
            });
        };
        let Some(target) = fields
            .iter_mut()
            .find(|r| r.field.common.name == *decode_f)
        else {
            return Err(ElabError::Instruction {
                inst: inst.common.name.clone(),
                detail: format!("could not resolve decode_f `{decode_f}` in the inherited fields"),
            });
        };
        let Some(entry) = target
            .field
            .enums
            .iter()
            .position(|e| e.common.name == *decode_e)
        else {
            return Err(ElabError::Instruction {
                inst: inst.common.name.clone(),
                detail: format!(
                    "could not resolve decode_e `{decode_e}` in field `{decode_f}`"
                ),
            });
        };
        let values = build_enums(&target.field.enums, scope)?;
        target.fixed = Some(values[entry].value);
    }

    for field in &inst.fields {
        fields.push(Resolved {
            field: field.clone(),
            inherited: false,
            fixed: None,
        });
    }

    chain.pop();
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_diagnostics::DiagnosticSink;
    use keel_preprocess::OutLine;
    use keel_schema::parse_documents;
    use keel_source::{FileId, Loc};

    fn scope_from(text: &str) -> ElabScope {
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
        scope
    }

    const BASE: &str = "- !Inst\n  name: alu_op\n  fields:\n  - !Field\n    name: opcode\n    width: 4\n    enums:\n    - !Enum [ADD, 0]\n    - !Enum [SUB, 1]\n  - !Field [flags, 2]\n";

    #[test]
    fn base_instruction_lays_out_fields() {
        let scope = scope_from(BASE);
        let mut project = Project::new("test");
        let inst = scope.get_inst("alu_op").unwrap().clone();
        let id = elaborate_instruction(&inst, &scope, &mut project).unwrap();
        let command = &project.commands[id];
        assert_eq!(command.width, 32);
        assert_eq!(command.fields.len(), 2);
        assert_eq!(command.fields[0].lsb, 0);
        assert_eq!(command.fields[1].lsb, 4);
        assert!(!command.fields[0].inherited);
    }

    #[test]
    fn inheritance_collapse_fixes_one_field() {
        let text = format!(
            "{BASE}- !Inst\n  name: add\n  base: alu_op\n  decode_f: opcode\n  decode_e: ADD\n  fields:\n  - !Field [operand, 8, 8]"
        );
        let scope = scope_from(&text);
        let mut project = Project::new("test");
        let inst = scope.get_inst("add").unwrap().clone();
        let id = elaborate_instruction(&inst, &scope, &mut project).unwrap();
        let command = &project.commands[id];
        let names: Vec<&str> = command.fields.iter().map(|f| f.name.as_str()).collect();
        // Ancestors' fields first, then the instruction's own
        assert_eq!(names, vec!["opcode", "flags", "operand"]);
        assert!(command.fields[0].inherited);
        assert!(command.fields[1].inherited);
        assert!(!command.fields[2].inherited);
        // The fixed field takes the enumerated value
        assert_eq!(command.fields[0].reset, 0);
        assert!(command.fields[0].attributes.contains_key("value_fixed"));
    }

    #[test]
    fn two_level_inheritance() {
        let text = format!(
            "{BASE}- !Inst\n  name: arith\n  base: alu_op\n  decode_f: opcode\n  decode_e: SUB\n  fields:\n  - !Field\n    name: mode\n    width: 2\n    enums:\n    - !Enum [WRAP, 0]\n    - !Enum [SAT, 1]\n- !Inst\n  name: sub_sat\n  base: arith\n  decode_f: mode\n  decode_e: SAT\n  fields:\n  - !Field [operand, 8, 16]"
        );
        let scope = scope_from(&text);
        let mut project = Project::new("test");
        let inst = scope.get_inst("sub_sat").unwrap().clone();
        let id = elaborate_instruction(&inst, &scope, &mut project).unwrap();
        let command = &project.commands[id];
        let names: Vec<&str> = command.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["opcode", "flags", "mode", "operand"]);
        // Fields appear exactly once and inherited flags carry through
        assert_eq!(command.fields.iter().filter(|f| f.inherited).count(), 3);
        let mode = command.fields.iter().find(|f| f.name == "mode").unwrap();
        assert_eq!(mode.reset, 1);
    }

    #[test]
    fn overlap_rejected() {
        let scope = scope_from(
            "- !Inst\n  name: bad\n  fields:\n  - !Field [a, 8, 0]\n  - !Field [b, 8, 4]",
        );
        let mut project = Project::new("test");
        let inst = scope.get_inst("bad").unwrap().clone();
        let err = elaborate_instruction(&inst, &scope, &mut project).unwrap_err();
        assert!(matches!(err, ElabError::FieldOverlap { .. }));
    }

    #[test]
    fn field_beyond_word_rejected() {
        let scope = scope_from("- !Inst\n  name: wide\n  fields:\n  - !Field [x, 8, 30]");
        let mut project = Project::new("test");
        let inst = scope.get_inst("wide").unwrap().clone();
        let err = elaborate_instruction(&inst, &scope, &mut project).unwrap_err();
        assert!(matches!(err, ElabError::Field { .. }));
    }

    #[test]
    fn missing_decode_target_rejected() {
        let text = format!(
            "{BASE}- !Inst\n  name: bad\n  base: alu_op\n  decode_f: nonexistent\n  decode_e: ADD"
        );
        let scope = scope_from(&text);
        let mut project = Project::new("test");
        let inst = scope.get_inst("bad").unwrap().clone();
        let err = elaborate_instruction(&inst, &scope, &mut project).unwrap_err();
        assert!(matches!(err, ElabError::Instruction { .. }));
    }

    #[test]
    fn cyclic_inheritance_rejected() {
        let scope = scope_from(
            "- !Inst\n  name: a\n  base: b\n  decode_f: x\n  decode_e: Y\n- !Inst\n  name: b\n  base: a\n  decode_f: x\n  decode_e: Y",
        );
        let mut project = Project::new("test");
        let inst = scope.get_inst("a").unwrap().clone();
        let err = elaborate_instruction(&inst, &scope, &mut project).unwrap_err();
        assert!(matches!(err, ElabError::CyclicInst { .. }));
    }

    #[test]
    fn unknown_base_rejected() {
        let scope = scope_from(
            "- !Inst\n  name: orphan\n  base: ghost\n  decode_f: x\n  decode_e: Y",
        );
        let mut project = Project::new("test");
        let inst = scope.get_inst("orphan").unwrap().clone();
        let err = elaborate_instruction(&inst, &scope, &mut project).unwrap_err();
        assert!(matches!(
            err,
            ElabError::Unresolved {
                kind: "base instruction",
                ..
            }
        ));
    }
}
