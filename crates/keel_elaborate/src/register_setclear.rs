//! The `SETCLEAR` register expansion.
//!
//! A register flagged `SETCLEAR` is replaced by a trio before layout: the
//! base value register (RW), a `_set` alias (write-one-to-set, WS), and a
//! `_clear` alias (write-one-to-clear, WC).

use keel_schema::{Field, Reg, TagCommon};

/// Expands every `SETCLEAR`-flagged register, passing the rest through.
pub(crate) fn expand(regs: &[Reg]) -> Vec<Reg> {
    let mut out = Vec::new();
    for reg in regs {
        if reg.common.has_option("SETCLEAR") {
            out.extend(expand_setclear(reg));
        } else {
            out.push(reg.clone());
        }
    }
    out
}

fn expand_setclear(reg: &Reg) -> Vec<Reg> {
    vec![
        derived(
            reg,
            None,
            reg.common.ld.clone(),
            "RW",
            "status",
            reg.fields.clone(),
        ),
        derived(
            reg,
            Some("set"),
            format!("{} (set alias - write 1 to set bit position).", reg.common.ld),
            "WS",
            "set",
            describe_fields(
                &reg.fields,
                "Write a 1 to this field to set the corresponding bit (0 is ignored).",
            ),
        ),
        derived(
            reg,
            Some("clear"),
            format!("{} (clear alias - write 1 to clear bit position).", reg.common.ld),
            "WC",
            "clear",
            describe_fields(
                &reg.fields,
                "Write a 1 to this field to clear the corresponding bit (0 is ignored).",
            ),
        ),
    ]
}

fn derived(
    reg: &Reg,
    suffix: Option<&str>,
    ld: String,
    busaccess: &str,
    marker: &str,
    fields: Vec<Field>,
) -> Reg {
    let name = match suffix {
        Some(suffix) => format!("{}_{suffix}", reg.common.name),
        None => reg.common.name.clone(),
    };
    Reg {
        common: TagCommon::assemble(
            name,
            String::new(),
            ld,
            vec![format!("setclear={marker}"), reg.common.name.clone()],
            reg.common.loc,
        ),
        addr: None,
        array: reg.array.clone(),
        align: reg.align.clone(),
        blockaccess: "RO".to_string(),
        busaccess: busaccess.to_string(),
        instaccess: "RW".to_string(),
        location: "internal".to_string(),
        width: reg.width.clone(),
        fields,
    }
}

fn describe_fields(fields: &[Field], text: &str) -> Vec<Field> {
    fields
        .iter()
        .map(|field| {
            let mut derived = field.clone();
            derived.common.sd = text.to_string();
            derived.common.ld = text.to_string();
            derived
        })
        .collect()
}
