//! Register elaboration: `!Config`/`!Group`/`!Reg`/`!Field` into placed
//! [`RegisterGroup`]s.
//!
//! Addresses and alignments are in 32-bit word units unless the owning
//! group carries the `BYTE` option. Placement walks the config order,
//! applies the `EVENT`/`SETCLEAR` expansions, honors fixed addresses, packs
//! everything else at the cursor, and rejects any two registers whose byte
//! ranges intersect.

use crate::errors::{
    warn_auto_widened, warn_enum_width, warn_zero_width_field, ElabError,
};
use crate::interconnect::{build_enums, options_to_attributes, pick_description};
use crate::register_event;
use crate::register_setclear;
use crate::scope::ElabScope;
use keel_design::{
    Access, FieldId, GroupId, Project, Register, RegisterField, RegisterGroup,
};
use keel_diagnostics::DiagnosticSink;
use keel_schema::{normalize_access, Config, DefineOverride, Group, Placement, Reg};

/// Elaborates a `!Config` into placed register groups attached to the
/// project, returning their ids in placement order.
pub fn elaborate_registers(
    config: &Config,
    overrides: &[DefineOverride],
    scope: &ElabScope,
    project: &mut Project,
    sink: &DiagnosticSink,
) -> Result<Vec<GroupId>, ElabError> {
    let mut next_addr: u64 = 0;
    let mut group_ids = Vec::new();

    for placement in &config.order {
        match placement {
            Placement::Register(entry) => {
                let group = scope
                    .get_group(&entry.group)
                    .ok_or_else(|| ElabError::Unresolved {
                        kind: "register group",
                        name: entry.group.clone(),
                    })?
                    .clone();
                if group.group_type.eq_ignore_ascii_case("macro") {
                    return Err(ElabError::Group {
                        group: group.common.name.clone(),
                        detail: "macro-typed groups may only be placed by `!Macro`".to_string(),
                    });
                }
                let id = build_group_instance(
                    &group,
                    group.common.name.clone(),
                    None,
                    1,
                    &mut next_addr,
                    overrides,
                    Some(group.common.name.as_str()),
                    scope,
                    project,
                    sink,
                )?;
                group_ids.push(id);
            }
            Placement::Macro(entry) => {
                let group = scope
                    .get_group(&entry.group)
                    .ok_or_else(|| ElabError::Unresolved {
                        kind: "register group",
                        name: entry.group.clone(),
                    })?
                    .clone();
                if !group.group_type.eq_ignore_ascii_case("macro") {
                    return Err(ElabError::Group {
                        group: group.common.name.clone(),
                        detail: format!(
                            "placed by `!Macro` `{}` but is not macro-typed",
                            entry.name
                        ),
                    });
                }
                let (array_expr, align_expr) = macro_overrides(overrides, entry);
                let array =
                    scope.eval_u64(&array_expr, &format!("array of macro `{}`", entry.name))?;
                let align =
                    scope.eval_u64(&align_expr, &format!("align of macro `{}`", entry.name))?;
                for index in 0..array {
                    let name = if array > 1 {
                        format!("{}_{index}", entry.name)
                    } else {
                        entry.name.clone()
                    };
                    let id = build_group_instance(
                        &group,
                        name,
                        Some(&group.common.name),
                        align,
                        &mut next_addr,
                        overrides,
                        None,
                        scope,
                        project,
                        sink,
                    )?;
                    group_ids.push(id);
                }
            }
        }
    }

    Ok(group_ids)
}

/// Returns the macro's array/align expressions, with `!Define` overrides
/// (`group: MACRO, name: <prefix>`) taking precedence.
fn macro_overrides(overrides: &[DefineOverride], entry: &keel_schema::MacroRef) -> (String, String) {
    let relevant = overrides.iter().filter(|o| {
        o.group.eq_ignore_ascii_case("MACRO") && o.name.eq_ignore_ascii_case(&entry.name)
    });
    let mut array = entry.array.clone().unwrap_or_else(|| "1".to_string());
    let mut align = entry.align.clone().unwrap_or_else(|| "1".to_string());
    for item in relevant {
        if let Some(value) = item.array.as_deref().filter(|v| !v.trim().is_empty()) {
            array = value.to_string();
        }
        if let Some(value) = item.align.as_deref().filter(|v| !v.trim().is_empty()) {
            align = value.to_string();
        }
    }
    (array, align)
}

/// Finds a register-level override value for one attribute.
fn reg_override<'a>(
    overrides: &'a [DefineOverride],
    group_key: Option<&str>,
    reg: &str,
    pick: impl Fn(&'a DefineOverride) -> Option<&'a String>,
) -> Option<&'a str> {
    let group_key = group_key?;
    overrides
        .iter()
        .filter(|o| {
            o.group.eq_ignore_ascii_case(group_key)
                && o.reg.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(reg))
                && o.field.is_none()
        })
        .find_map(|o| pick(o).map(String::as_str).filter(|v| !v.trim().is_empty()))
}

/// Finds a field-level override value for one attribute.
fn field_override<'a>(
    overrides: &'a [DefineOverride],
    group_key: Option<&str>,
    reg: &str,
    field: &str,
    pick: impl Fn(&'a DefineOverride) -> Option<&'a String>,
) -> Option<&'a str> {
    let group_key = group_key?;
    overrides
        .iter()
        .filter(|o| {
            o.group.eq_ignore_ascii_case(group_key)
                && o.reg.as_deref().is_some_and(|r| r.eq_ignore_ascii_case(reg))
                && o.field.as_deref().is_some_and(|f| f.eq_ignore_ascii_case(field))
        })
        .find_map(|o| pick(o).map(String::as_str).filter(|v| !v.trim().is_empty()))
}

#[allow(clippy::too_many_arguments)]
fn build_group_instance(
    group: &Group,
    placed_name: String,
    macro_of: Option<&str>,
    align_units: u64,
    next_addr: &mut u64,
    overrides: &[DefineOverride],
    group_key: Option<&str>,
    scope: &ElabScope,
    project: &mut Project,
    sink: &DiagnosticSink,
) -> Result<GroupId, ElabError> {
    let byte_mode = group.common.has_option("BYTE");
    let unit: u64 = if byte_mode { 1 } else { 4 };
    let byte_align = (align_units * unit).max(1);
    *next_addr = align_up(*next_addr, byte_align);
    let group_offset = *next_addr;

    let expanded = register_setclear::expand(&register_event::expand(&group.regs));

    let mut reg_ids = Vec::new();
    let mut placed: Vec<(String, u64, u64)> = Vec::new();
    let mut cursor = group_offset;

    for reg in &expanded {
        let base_name = reg.common.name.clone();
        let ctx = format!("{}.{base_name}", group.common.name);

        let array_expr = reg_override(overrides, group_key, &base_name, |o| o.array.as_ref())
            .unwrap_or(&reg.array);
        let array = scope.eval_u64(array_expr, &format!("array of `{ctx}`"))?;
        if array == 0 {
            continue;
        }

        let width_expr = reg_override(overrides, group_key, &base_name, |o| o.width.as_ref())
            .unwrap_or(&reg.width);
        let nominal_width = scope.eval_u32(width_expr, &format!("width of `{ctx}`"))?;
        let byte_width = u64::from(nominal_width.div_ceil(8));

        let align_expr = reg_override(overrides, group_key, &base_name, |o| o.align.as_ref())
            .unwrap_or(&reg.align);
        let reg_align = (scope.eval_u64(align_expr, &format!("align of `{ctx}`"))? * unit).max(1);

        let mut address = match &reg.addr {
            Some(expr) => {
                let fixed = scope.eval_u64(expr, &format!("address of `{ctx}`"))? * unit;
                if fixed < group_offset {
                    return Err(ElabError::BadAddress {
                        reg: base_name,
                        detail: format!(
                            "fixed address {fixed:#x} lies before the group start {group_offset:#x}"
                        ),
                    });
                }
                fixed
            }
            None => align_up(cursor, reg_align),
        };

        for index in 0..array {
            address = align_up(address, reg_align);
            let mut name = if array > 1 {
                format!("{base_name}_{index}")
            } else {
                base_name.clone()
            };
            if macro_of.is_some() {
                name = format!("{placed_name}_{name}");
            }

            let start = address;
            let end = address + byte_width;
            for (other, other_start, other_end) in &placed {
                if start < *other_end && *other_start < end {
                    return Err(ElabError::AddressOverlap {
                        first: other.clone(),
                        first_range: format!("{other_start:#x}..{other_end:#x}"),
                        second: name,
                        second_range: format!("{start:#x}..{end:#x}"),
                    });
                }
            }

            let (field_ids, final_width) = build_fields(
                reg,
                &name,
                nominal_width,
                group_key,
                overrides,
                scope,
                project,
                sink,
            )?;

            let mut attributes = options_to_attributes(&reg.common.options);
            if !reg.location.trim().is_empty() {
                attributes.insert("location".to_string(), reg.location.trim().into());
            }

            let rid = project.registers.alloc(Register {
                id: project.registers.next_id(),
                name: name.clone(),
                offset: start - group_offset,
                width: final_width,
                bus_access: resolve_access(
                    reg_override(overrides, group_key, &base_name, |o| o.busaccess.as_ref())
                        .unwrap_or(&reg.busaccess),
                    &name,
                )?,
                block_access: resolve_access(
                    reg_override(overrides, group_key, &base_name, |o| o.blockaccess.as_ref())
                        .unwrap_or(&reg.blockaccess),
                    &name,
                )?,
                inst_access: resolve_access(
                    reg_override(overrides, group_key, &base_name, |o| o.instaccess.as_ref())
                        .unwrap_or(&reg.instaccess),
                    &name,
                )?,
                fields: field_ids,
                description: pick_description(&reg.common.ld, &reg.common.sd),
                attributes,
            });
            reg_ids.push(rid);
            placed.push((name, start, end));

            address = end;
            if !byte_mode {
                address = align_up(address, 4);
            }
        }

        cursor = cursor.max(address);
    }

    *next_addr = (*next_addr).max(cursor);

    let mut attributes = options_to_attributes(&group.common.options);
    if let Some(source) = macro_of {
        attributes.insert("MACRO".to_string(), source.into());
    }
    let gid = project.groups.alloc(RegisterGroup {
        id: project.groups.next_id(),
        name: placed_name,
        offset: group_offset,
        registers: reg_ids,
        description: pick_description(&group.common.ld, &group.common.sd),
        attributes,
    });
    Ok(gid)
}

#[allow(clippy::too_many_arguments)]
fn build_fields(
    reg: &Reg,
    reg_name: &str,
    nominal_width: u32,
    group_key: Option<&str>,
    overrides: &[DefineOverride],
    scope: &ElabScope,
    project: &mut Project,
    sink: &DiagnosticSink,
) -> Result<(Vec<FieldId>, u32), ElabError> {
    let base_reg = &reg.common.name;
    let mut bitmap: Vec<Option<usize>> = vec![None; nominal_width as usize];
    let mut names: Vec<String> = Vec::new();
    let mut field_ids = Vec::new();
    let mut next_lsb: Option<u32> = Some(0);
    let mut widened = false;

    for field in &reg.fields {
        let fname = field.common.name.clone();
        let ctx = format!("{reg_name}.{fname}");

        let width_expr = field_override(overrides, group_key, base_reg, &fname, |o| {
            o.width.as_ref()
        })
        .or(field.width.as_deref())
        .unwrap_or("1");
        let width = scope.eval_u32(width_expr, &format!("width of field `{ctx}`"))?;
        if width == 0 {
            sink.emit(warn_zero_width_field(reg_name, &fname));
            continue;
        }

        let req_lsb = match &field.lsb {
            Some(expr) => Some(scope.eval_u32(expr, &format!("lsb of field `{ctx}`"))?),
            None => None,
        };
        let req_msb = match &field.msb {
            Some(expr) => Some(scope.eval_u32(expr, &format!("msb of field `{ctx}`"))?),
            None => None,
        };
        let lsb = match (req_lsb, req_msb) {
            (Some(lsb), Some(msb)) => {
                if msb + 1 != lsb + width {
                    return Err(ElabError::Field {
                        reg: reg_name.to_string(),
                        field: fname,
                        detail: format!("lsb {lsb} and msb {msb} disagree with width {width}"),
                    });
                }
                lsb
            }
            (Some(lsb), None) => lsb,
            (None, Some(msb)) => {
                if msb + 1 < width {
                    return Err(ElabError::Field {
                        reg: reg_name.to_string(),
                        field: fname,
                        detail: format!("msb {msb} leaves no room for width {width}"),
                    });
                }
                msb + 1 - width
            }
            (None, None) => next_lsb.unwrap_or(bitmap.len() as u32),
        };

        let reset_expr = field_override(overrides, group_key, base_reg, &fname, |o| {
            o.reset.as_ref()
        })
        .or(field.reset.as_deref())
        .unwrap_or("0");
        let reset = scope.eval_i64(reset_expr, &format!("reset of field `{ctx}`"))?;
        let mask = if width >= 64 {
            u64::MAX
        } else {
            (1u64 << width) - 1
        };
        // Negative resets wrap into the field width
        let reset = (reset as u64) & mask;

        let top = (lsb + width) as usize;
        if top > bitmap.len() {
            bitmap.resize(top, None);
            widened = true;
        }
        if let Some(occupant) = bitmap[lsb as usize..top].iter().flatten().next() {
            return Err(ElabError::FieldOverlap {
                reg: reg_name.to_string(),
                first: names[*occupant].clone(),
                second: fname,
            });
        }
        let slot = names.len();
        names.push(fname.clone());
        for bit in &mut bitmap[lsb as usize..top] {
            *bit = Some(slot);
        }
        next_lsb = bitmap
            .iter()
            .skip(top)
            .position(Option::is_none)
            .map(|free| (top + free) as u32);

        let enums = build_enums(&field.enums, scope)?;
        for entry in &enums {
            let limit = if width >= 63 {
                i64::MAX
            } else {
                (1i64 << width) - 1
            };
            if entry.value > limit {
                sink.emit(warn_enum_width(&ctx, &entry.name, entry.value, width));
            }
        }

        let fid = project.fields.alloc(RegisterField {
            id: project.fields.next_id(),
            name: fname,
            lsb,
            width,
            reset,
            signed: field.field_type.eq_ignore_ascii_case("S"),
            enums,
            description: pick_description(&field.common.ld, &field.common.sd),
            attributes: options_to_attributes(&field.common.options),
        });
        field_ids.push(fid);
    }

    let final_width = bitmap.len() as u32;
    if widened {
        sink.emit(warn_auto_widened(reg_name, nominal_width, final_width));
    }
    Ok((field_ids, final_width))
}

fn resolve_access(text: &str, reg: &str) -> Result<Access, ElabError> {
    normalize_access(text)
        .and_then(Access::parse)
        .ok_or_else(|| ElabError::BadAccess {
            reg: reg.to_string(),
            value: text.to_string(),
        })
}

fn align_up(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_preprocess::OutLine;
    use keel_schema::{parse_documents, Doc};
    use keel_source::{FileId, Loc};

    struct Fixture {
        scope: ElabScope,
        config: Config,
        overrides: Vec<DefineOverride>,
    }

    fn fixture(text: &str) -> Fixture {
        let lines: Vec<OutLine> = text
            .lines()
            .enumerate()
            .map(|(i, l)| OutLine::new(l, Loc::new(FileId::from_raw(0), (i + 1) as u32)))
            .collect();
        let docs = parse_documents(&lines).expect("test input should parse");
        let sink = DiagnosticSink::new();
        let mut scope = ElabScope::new();
        let mut config = None;
        let mut overrides = Vec::new();
        let mut groups = Vec::new();
        for doc in &docs {
            scope.add_document(doc, &sink);
            match doc {
                Doc::Config(c) => config = Some(c.clone()),
                Doc::Define(d) => overrides.push(d.clone()),
                Doc::Group(g) => groups.push(g.common.name.clone()),
                _ => {}
            }
        }
        // Without an explicit config, place every non-macro group once
        let config = config.unwrap_or_else(|| {
            synthesize_config(groups.iter().filter_map(|name| {
                let group = scope.get_group(name)?;
                (!group.group_type.eq_ignore_ascii_case("macro"))
                    .then(|| group.common.name.clone())
            }))
        });
        Fixture {
            scope,
            config,
            overrides,
        }
    }

    fn run(fixture: &Fixture) -> (Project, Vec<GroupId>, DiagnosticSink) {
        let mut project = Project::new("test");
        let sink = DiagnosticSink::new();
        let ids = elaborate_registers(
            &fixture.config,
            &fixture.overrides,
            &fixture.scope,
            &mut project,
            &sink,
        )
        .expect("elaboration should succeed");
        (project, ids, sink)
    }

    fn run_err(fixture: &Fixture) -> ElabError {
        let mut project = Project::new("test");
        let sink = DiagnosticSink::new();
        elaborate_registers(
            &fixture.config,
            &fixture.overrides,
            &fixture.scope,
            &mut project,
            &sink,
        )
        .expect_err("elaboration should fail")
    }

    fn reg_by_name<'a>(project: &'a Project, name: &str) -> &'a Register {
        project
            .registers
            .values()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("register {name} not found"))
    }

    #[test]
    fn word_mode_packs_at_word_boundaries() {
        let fx = fixture(
            "- !Group\n  name: ctrl\n  regs:\n  - !Reg [a]\n  - !Reg [b]\n  - !Reg [c, 4]",
        );
        let (project, ids, _) = run(&fx);
        assert_eq!(ids.len(), 1);
        assert_eq!(reg_by_name(&project, "a").offset, 0);
        assert_eq!(reg_by_name(&project, "b").offset, 4);
        // Fixed word address 4 is byte 16
        assert_eq!(reg_by_name(&project, "c").offset, 16);
    }

    #[test]
    fn byte_mode_addresses_are_bytes() {
        let fx = fixture(
            "- !Group\n  name: ctrl\n  options: [BYTE]\n  regs:\n  - !Reg [a, , 1, 1, RW, RW, RW, [], \"\", \"\", \"\", 8]\n  - !Reg [b, 4, 1, 1, RW, RW, RW, [], \"\", \"\", \"\", 8]",
        );
        let (project, _, _) = run(&fx);
        assert_eq!(reg_by_name(&project, "a").offset, 0);
        assert_eq!(reg_by_name(&project, "b").offset, 4);
    }

    #[test]
    fn overlap_names_both_registers() {
        let fx = fixture(
            "- !Group\n  name: ctrl\n  options: [BYTE]\n  regs:\n  - !Reg [a, 0]\n  - !Reg [b, 2]",
        );
        let err = run_err(&fx);
        let ElabError::AddressOverlap { first, second, .. } = err else {
            panic!("expected overlap, got {err}");
        };
        assert_eq!(first, "a");
        assert_eq!(second, "b");
    }

    #[test]
    fn array_placement_and_naming() {
        let fx = fixture(
            "- !Group\n  name: ctrl\n  regs:\n  - !Reg [scratch, , 2]\n  - !Reg [single]",
        );
        let (project, _, _) = run(&fx);
        assert_eq!(reg_by_name(&project, "scratch_0").offset, 0);
        assert_eq!(reg_by_name(&project, "scratch_1").offset, 4);
        // array == 1 keeps the bare name
        assert_eq!(reg_by_name(&project, "single").offset, 8);
        assert!(!project.registers.values().any(|r| r.name == "single_0"));
    }

    #[test]
    fn field_auto_placement_and_lsb() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [low, 4]\n    - !Field [mid, 4]\n    - !Field [high, 8, 16]",
        );
        let (project, _, _) = run(&fx);
        let reg = reg_by_name(&project, "r");
        let lsbs: Vec<u32> = reg.fields.iter().map(|f| project.fields[*f].lsb).collect();
        assert_eq!(lsbs, vec![0, 4, 16]);
    }

    #[test]
    fn gap_left_by_fixed_lsb_is_reused() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [high, 4, 8]\n    - !Field [low, 4]",
        );
        let (project, _, _) = run(&fx);
        let reg = reg_by_name(&project, "r");
        let low = reg
            .fields
            .iter()
            .map(|f| &project.fields[*f])
            .find(|f| f.name == "low")
            .unwrap();
        // Next free bit after placing high at 8..12 is 12
        assert_eq!(low.lsb, 12);
    }

    #[test]
    fn field_overlap_rejected() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [a, 4, 0]\n    - !Field [b, 4, 2]",
        );
        let err = run_err(&fx);
        assert!(matches!(err, ElabError::FieldOverlap { ref first, ref second, .. }
            if first == "a" && second == "b"));
    }

    #[test]
    fn register_widens_with_warning() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [wide, 8, 30]",
        );
        let (project, _, sink) = run(&fx);
        assert_eq!(reg_by_name(&project, "r").width, 38);
        assert!(sink
            .diagnostics()
            .iter()
            .any(|d| d.code == crate::errors::W612));
    }

    #[test]
    fn event_expansion_lays_out_sub_registers() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: irq\n    options: [EVENT]\n    fields:\n    - !Field [done, 1]",
        );
        let (project, _, _) = run(&fx);
        let rsta = reg_by_name(&project, "irq_rsta");
        assert_eq!(rsta.bus_access, Access::RO);
        assert_eq!(rsta.offset, 0);
        let clear = reg_by_name(&project, "irq_clear");
        assert_eq!(clear.bus_access, Access::WC);
        let set = reg_by_name(&project, "irq_set");
        assert_eq!(set.bus_access, Access::WS);
        assert_eq!(project.registers.len(), 5);
    }

    #[test]
    fn setclear_expansion_access_kinds() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: ctl\n    options: [SETCLEAR]\n    fields:\n    - !Field [bits, 8]",
        );
        let (project, _, _) = run(&fx);
        assert_eq!(reg_by_name(&project, "ctl").bus_access, Access::RW);
        assert_eq!(reg_by_name(&project, "ctl_set").bus_access, Access::WS);
        assert_eq!(reg_by_name(&project, "ctl_clear").bus_access, Access::WC);
    }

    #[test]
    fn macro_placement_with_prefix_and_alignment() {
        let fx = fixture(
            "- !Group\n  name: chan\n  type: macro\n  regs:\n  - !Reg [data]\n- !Config\n  order:\n  - !Macro [dma, chan, 2, 4]",
        );
        let (project, ids, _) = run(&fx);
        assert_eq!(ids.len(), 2);
        let groups: Vec<&RegisterGroup> = ids.iter().map(|id| &project.groups[*id]).collect();
        assert_eq!(groups[0].name, "dma_0");
        assert_eq!(groups[1].name, "dma_1");
        // Each copy aligned to 4 words = 16 bytes
        assert_eq!(groups[0].offset, 0);
        assert_eq!(groups[1].offset, 16);
        assert!(project.registers.values().any(|r| r.name == "dma_0_data"));
    }

    #[test]
    fn macro_group_cannot_be_placed_by_register() {
        let fx = fixture(
            "- !Group\n  name: chan\n  type: macro\n  regs:\n  - !Reg [data]\n- !Config\n  order:\n  - !Register [chan]",
        );
        assert!(matches!(run_err(&fx), ElabError::Group { .. }));
    }

    #[test]
    fn define_override_changes_width() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [f, 4]\n- !Define\n  group: g\n  reg: r\n  field: f\n  width: 12",
        );
        let (project, _, _) = run(&fx);
        let reg = reg_by_name(&project, "r");
        assert_eq!(project.fields[reg.fields[0]].width, 12);
    }

    #[test]
    fn negative_reset_wraps_into_width() {
        let fx = fixture(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field [f, 8, , -, -1]",
        );
        let (project, _, _) = run(&fx);
        let reg = reg_by_name(&project, "r");
        assert_eq!(project.fields[reg.fields[0]].reset, 0xFF);
    }

    #[test]
    fn group_descriptions_and_offsets() {
        let fx = fixture(
            "- !Group\n  name: a\n  regs:\n  - !Reg [x]\n- !Group\n  name: b\n  regs:\n  - !Reg [y]\n- !Config\n  order:\n  - !Register [a]\n  - !Register [b]",
        );
        let (project, ids, _) = run(&fx);
        assert_eq!(project.groups[ids[0]].offset, 0);
        assert_eq!(project.groups[ids[1]].offset, 4);
        // Register offsets are group-relative
        assert_eq!(reg_by_name(&project, "y").offset, 0);
    }
}

/// Synthesizes the implicit `!Config` used when none is declared: every
/// non-macro group placed once, in declaration order.
pub fn synthesize_config(group_names: impl Iterator<Item = String>) -> Config {
    use keel_schema::{RegisterRef, TagCommon};
    use keel_source::Loc;
    Config {
        common: TagCommon::assemble(
            String::new(),
            String::new(),
            String::new(),
            Vec::new(),
            Loc::DUMMY,
        ),
        order: group_names
            .map(|group| {
                Placement::Register(RegisterRef {
                    group,
                    loc: Loc::DUMMY,
                })
            })
            .collect(),
    }
}
