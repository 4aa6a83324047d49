//! The `EVENT` register expansion.
//!
//! A register flagged `EVENT` describes an interrupt source; it is replaced
//! by the standard interrupt register set before layout: `_rsta` (raw
//! status, RO), `_msta` (masked status, RO), `_clear` (WC), `_enable` (RW),
//! `_set` (WS), plus `_level` (RW) with `HAS_LEVEL` and `_mode` (RW) with
//! `HAS_MODE`.

use keel_schema::{Field, Reg, TagCommon};

/// Expands every `EVENT`-flagged register, passing the rest through.
pub(crate) fn expand(regs: &[Reg]) -> Vec<Reg> {
    let mut out = Vec::new();
    for reg in regs {
        if reg.common.has_option("EVENT") {
            out.extend(expand_event(reg));
        } else {
            out.push(reg.clone());
        }
    }
    out
}

fn expand_event(reg: &Reg) -> Vec<Reg> {
    let mut expanded = vec![
        derived(
            reg,
            "rsta",
            format!("Shows unmasked (raw) interrupt event/status for {}", reg.common.ld),
            "RO",
            "internal",
            prefix_fields(&reg.fields, "Raw status for"),
        ),
        derived(
            reg,
            "msta",
            format!(
                "Shows masked interrupt status (MSTA=RSTA & ENABLE) for {}",
                reg.common.ld
            ),
            "RO",
            "internal",
            prefix_fields(&reg.fields, "Masked status for"),
        ),
        derived(
            reg,
            "clear",
            "Clears bits in the masked (MSTA) and raw (RSTA) status registers (interrupt \
             acknowledgement)."
                .to_string(),
            "WC",
            "core",
            prefix_fields(&reg.fields, "Clear bit for"),
        ),
        derived(
            reg,
            "enable",
            "Interrupt enable. Has no effect on RSTA, but is used by MSTA and the interrupt \
             output for the block."
                .to_string(),
            "RW",
            "internal",
            prefix_fields(&reg.fields, "Enable for"),
        ),
        derived(
            reg,
            "set",
            format!(
                "Software interrupt raise - sets bit in RSTA and MSTA (if enabled) for {}",
                reg.common.ld
            ),
            "WS",
            "core",
            prefix_fields(&reg.fields, "Set RSTA bit for"),
        ),
    ];

    if reg.common.has_option("HAS_LEVEL") {
        let fields = reg
            .fields
            .iter()
            .map(|field| {
                let mut derived = replace_description(
                    field,
                    "Level mode: 0 = active low, 1 = active high. Edge mode: 0 = falling edge, \
                     1 = rising edge.",
                );
                // Kept as an expression so the field width can itself be one
                let width = field.width.clone().unwrap_or_else(|| "1".to_string());
                derived.reset = Some(format!("((1 << ({width})) - 1)"));
                derived
            })
            .collect();
        expanded.push(derived(
            reg,
            "level",
            "Defines the input interrupt level sensitivity (only appropriate for interrupt \
             generation from external sources like GPIO)."
                .to_string(),
            "RW",
            "internal",
            fields,
        ));
    }

    if reg.common.has_option("HAS_MODE") {
        let fields = reg
            .fields
            .iter()
            .map(|field| {
                let mut derived =
                    replace_description(field, "0 = level mode, 1 = edge mode.");
                derived.width = Some("1".to_string());
                derived.reset = Some("1".to_string());
                derived
            })
            .collect();
        expanded.push(derived(
            reg,
            "mode",
            "Defines the input interrupt mode of level or edge (only appropriate for interrupt \
             generation from external sources like GPIO)."
                .to_string(),
            "RW",
            "internal",
            fields,
        ));
    }

    expanded
}

fn derived(
    reg: &Reg,
    suffix: &str,
    ld: String,
    busaccess: &str,
    location: &str,
    fields: Vec<Field>,
) -> Reg {
    Reg {
        common: TagCommon::assemble(
            format!("{}_{suffix}", reg.common.name),
            String::new(),
            ld,
            vec![format!("interrupt={suffix}"), reg.common.name.clone()],
            reg.common.loc,
        ),
        addr: None,
        array: reg.array.clone(),
        align: reg.align.clone(),
        blockaccess: "RO".to_string(),
        busaccess: busaccess.to_string(),
        instaccess: "RW".to_string(),
        location: location.to_string(),
        width: reg.width.clone(),
        fields,
    }
}

fn prefix_fields(fields: &[Field], prefix: &str) -> Vec<Field> {
    fields
        .iter()
        .map(|field| {
            let mut derived = field.clone();
            if !field.common.ld.is_empty() {
                derived.common.ld = format!("{prefix} {}", field.common.ld);
            }
            if !field.common.sd.is_empty() {
                derived.common.sd = format!("{prefix} {}", field.common.sd);
            }
            derived
        })
        .collect()
}

fn replace_description(field: &Field, text: &str) -> Field {
    let mut derived = field.clone();
    derived.common.sd = text.to_string();
    derived.common.ld = text.to_string();
    derived
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_source::Loc;

    fn event_reg(options: Vec<&str>) -> Reg {
        Reg {
            common: TagCommon::assemble(
                "irq".to_string(),
                "Interrupt sources".to_string(),
                String::new(),
                options.into_iter().map(String::from).collect(),
                Loc::DUMMY,
            ),
            addr: None,
            array: "1".to_string(),
            align: "1".to_string(),
            blockaccess: "RW".to_string(),
            busaccess: "RW".to_string(),
            instaccess: "RW".to_string(),
            location: String::new(),
            width: "32".to_string(),
            fields: vec![Field {
                common: TagCommon::assemble(
                    "done".to_string(),
                    "Done event".to_string(),
                    String::new(),
                    Vec::new(),
                    Loc::DUMMY,
                ),
                width: Some("1".to_string()),
                lsb: None,
                field_type: "-".to_string(),
                reset: None,
                msb: None,
                enums: Vec::new(),
            }],
        }
    }

    #[test]
    fn basic_event_expansion() {
        let expanded = expand(&[event_reg(vec!["EVENT"])]);
        let names: Vec<&str> = expanded.iter().map(|r| r.common.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["irq_rsta", "irq_msta", "irq_clear", "irq_enable", "irq_set"]
        );
        let accesses: Vec<&str> = expanded.iter().map(|r| r.busaccess.as_str()).collect();
        assert_eq!(accesses, vec!["RO", "RO", "WC", "RW", "WS"]);
    }

    #[test]
    fn level_and_mode_variants() {
        let expanded = expand(&[event_reg(vec!["EVENT", "HAS_LEVEL", "HAS_MODE"])]);
        let names: Vec<&str> = expanded.iter().map(|r| r.common.name.as_str()).collect();
        assert!(names.contains(&"irq_level"));
        assert!(names.contains(&"irq_mode"));
        let level = expanded.iter().find(|r| r.common.name == "irq_level").unwrap();
        assert_eq!(level.busaccess, "RW");
        assert_eq!(
            level.fields[0].reset.as_deref(),
            Some("((1 << (1)) - 1)")
        );
        let mode = expanded.iter().find(|r| r.common.name == "irq_mode").unwrap();
        assert_eq!(mode.fields[0].width.as_deref(), Some("1"));
    }

    #[test]
    fn level_requires_has_level() {
        let expanded = expand(&[event_reg(vec!["EVENT"])]);
        assert!(!expanded.iter().any(|r| r.common.name == "irq_level"));
    }

    #[test]
    fn non_event_passes_through() {
        let mut plain = event_reg(vec![]);
        plain.common.options.clear();
        let expanded = expand(&[plain.clone()]);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].common.name, "irq");
    }

    #[test]
    fn expanded_regs_mark_their_parent() {
        let expanded = expand(&[event_reg(vec!["EVENT"])]);
        assert!(expanded[0].common.options.contains(&"interrupt=rsta".to_string()));
        assert!(expanded[0].common.options.contains(&"irq".to_string()));
    }
}
