//! Declarative validation of parsed schema records.
//!
//! Validation walks every document and aggregates all findings instead of
//! stopping at the first failure. Errors use codes `E5xx`; compatibility
//! warnings use `W5xx`.

use crate::tags::common::MAX_SD_LEN;
use crate::{Doc, Field, Group, HisPort, Inst, Mod, Reg, TagCommon};
use keel_diagnostics::{Category, Diagnostic, DiagnosticCode};
use keel_source::Loc;

const ORIGIN: &str = "schema.validate";

/// Short description malformed.
pub const E501: DiagnosticCode = DiagnosticCode::new(Category::Error, 501);
/// Illegal role value.
pub const E502: DiagnosticCode = DiagnosticCode::new(Category::Error, 502);
/// Illegal group type.
pub const E503: DiagnosticCode = DiagnosticCode::new(Category::Error, 503);
/// Illegal access combination.
pub const E504: DiagnosticCode = DiagnosticCode::new(Category::Error, 504);
/// Illegal register location.
pub const E505: DiagnosticCode = DiagnosticCode::new(Category::Error, 505);
/// Conflicting expansion options.
pub const E506: DiagnosticCode = DiagnosticCode::new(Category::Error, 506);
/// Field width/msb/lsb disagreement.
pub const E507: DiagnosticCode = DiagnosticCode::new(Category::Error, 507);
/// Illegal field type.
pub const E508: DiagnosticCode = DiagnosticCode::new(Category::Error, 508);
/// Instruction decode attributes inconsistent.
pub const E509: DiagnosticCode = DiagnosticCode::new(Category::Error, 509);
/// Override with no target group.
pub const E510: DiagnosticCode = DiagnosticCode::new(Category::Error, 510);
/// Expansion modifier without EVENT.
pub const W501: DiagnosticCode = DiagnosticCode::new(Category::Warning, 501);
/// Legacy tag encountered.
pub const W502: DiagnosticCode = DiagnosticCode::new(Category::Warning, 502);

/// Normalizes an access attribute value, resolving legacy aliases.
///
/// Returns the canonical token, or `None` if the value is not an access
/// kind at all.
pub fn normalize_access(text: &str) -> Option<&'static str> {
    match text.trim().to_ascii_uppercase().as_str() {
        "RW" | "WR" => Some("RW"),
        "RO" | "R" => Some("RO"),
        "WO" | "W" => Some("WO"),
        "WS" => Some("WS"),
        "WC" => Some("WC"),
        "AW" => Some("AW"),
        "AR" => Some("AR"),
        "ARW" => Some("ARW"),
        _ => None,
    }
}

/// Access kinds legal for `blockaccess` and `instaccess`.
const NARROW_ACCESS: &[&str] = &["WO", "RO", "RW"];
/// Access kinds legal for `busaccess`.
const BUS_ACCESS: &[&str] = &["WO", "RO", "RW", "AW", "AR", "ARW", "WS", "WC"];

/// Validates every document, returning the aggregated findings.
pub fn validate_documents(docs: &[Doc]) -> Vec<Diagnostic> {
    let mut findings = Vec::new();
    for doc in docs {
        match doc {
            Doc::Def(def) => validate_common(&def.common, &mut findings),
            Doc::Define(def) => {
                if def.group.trim().is_empty() {
                    findings.push(
                        Diagnostic::error(E510, ORIGIN, "`!Define` override names no group")
                            .at(def.loc),
                    );
                }
            }
            Doc::His(his) => {
                validate_common(&his.common, &mut findings);
                validate_role(&his.role, his.common.loc, &mut findings);
                for port in &his.ports {
                    match port {
                        HisPort::Port(p) => {
                            validate_common(&p.common, &mut findings);
                            validate_role(&p.role, p.common.loc, &mut findings);
                        }
                        HisPort::Ref(r) => {
                            validate_common(&r.common, &mut findings);
                            validate_role(&r.role, r.common.loc, &mut findings);
                        }
                    }
                }
            }
            Doc::Mod(module) => validate_mod(module, &mut findings),
            Doc::Config(config) => validate_common(&config.common, &mut findings),
            Doc::Group(group) => validate_group(group, &mut findings),
            Doc::Inst(inst) => validate_inst(inst, &mut findings),
            Doc::Legacy { tag, loc } => {
                findings.push(
                    Diagnostic::warning(W502, ORIGIN, format!("legacy tag `!{tag}` is ignored"))
                        .at(*loc),
                );
            }
        }
    }
    findings
}

fn validate_common(common: &TagCommon, findings: &mut Vec<Diagnostic>) {
    if common.sd.len() > MAX_SD_LEN {
        findings.push(
            Diagnostic::error(
                E501,
                ORIGIN,
                format!(
                    "short description of `{}` is too long ({} > {MAX_SD_LEN})",
                    common.name,
                    common.sd.len()
                ),
            )
            .at(common.loc),
        );
    }
    if common.sd.lines().count() > 1 {
        findings.push(
            Diagnostic::error(
                E501,
                ORIGIN,
                format!("short description of `{}` spans multiple lines", common.name),
            )
            .at(common.loc),
        );
    }
}

fn validate_role(role: &str, loc: Loc, findings: &mut Vec<Diagnostic>) {
    let normalized = role.trim().to_ascii_lowercase();
    if !matches!(normalized.as_str(), "master" | "slave" | "bi") {
        findings.push(
            Diagnostic::error(E502, ORIGIN, format!("illegal role `{role}`"))
                .with_help("roles are `master`, `slave`, or `bi`")
                .at(loc),
        );
    }
}

fn validate_access(
    value: &str,
    attribute: &str,
    allowed: &[&str],
    owner: &str,
    loc: Loc,
    findings: &mut Vec<Diagnostic>,
) {
    match normalize_access(value) {
        Some(canonical) if allowed.contains(&canonical) => {}
        Some(canonical) => findings.push(
            Diagnostic::error(
                E504,
                ORIGIN,
                format!("access `{canonical}` is not legal for `{attribute}` of `{owner}`"),
            )
            .at(loc),
        ),
        None => findings.push(
            Diagnostic::error(
                E504,
                ORIGIN,
                format!("`{value}` is not an access kind (`{attribute}` of `{owner}`)"),
            )
            .at(loc),
        ),
    }
}

fn validate_group(group: &Group, findings: &mut Vec<Diagnostic>) {
    validate_common(&group.common, findings);
    let gtype = group.group_type.trim().to_ascii_lowercase();
    if !matches!(gtype.as_str(), "register" | "macro") {
        findings.push(
            Diagnostic::error(
                E503,
                ORIGIN,
                format!(
                    "group `{}` has illegal type `{}`",
                    group.common.name, group.group_type
                ),
            )
            .at(group.common.loc),
        );
    }
    for reg in &group.regs {
        validate_reg(reg, findings);
    }
}

fn validate_reg(reg: &Reg, findings: &mut Vec<Diagnostic>) {
    validate_common(&reg.common, findings);
    let loc = reg.common.loc;
    let name = &reg.common.name;
    validate_access(&reg.blockaccess, "blockaccess", NARROW_ACCESS, name, loc, findings);
    validate_access(&reg.busaccess, "busaccess", BUS_ACCESS, name, loc, findings);
    validate_access(&reg.instaccess, "instaccess", NARROW_ACCESS, name, loc, findings);

    let location = reg.location.trim().to_ascii_lowercase();
    if !matches!(location.as_str(), "" | "internal" | "wrapper" | "core") {
        findings.push(
            Diagnostic::error(
                E505,
                ORIGIN,
                format!("register `{name}` has illegal location `{}`", reg.location),
            )
            .at(loc),
        );
    }

    let has_event = reg.common.has_option("EVENT");
    if has_event && reg.common.has_option("SETCLEAR") {
        findings.push(
            Diagnostic::error(
                E506,
                ORIGIN,
                format!("register `{name}` combines `EVENT` and `SETCLEAR`"),
            )
            .at(loc),
        );
    }
    for modifier in ["HAS_LEVEL", "HAS_MODE", "NO_LEVEL"] {
        if reg.common.has_option(modifier) && !has_event {
            findings.push(
                Diagnostic::warning(
                    W501,
                    ORIGIN,
                    format!("register `{name}` uses `{modifier}` without `EVENT`"),
                )
                .at(loc),
            );
        }
    }

    for field in &reg.fields {
        validate_field(field, name, findings);
    }
}

fn validate_field(field: &Field, owner: &str, findings: &mut Vec<Diagnostic>) {
    validate_common(&field.common, findings);
    let loc = field.common.loc;
    let ftype = field.field_type.trim().to_ascii_uppercase();
    if !matches!(ftype.as_str(), "-" | "U" | "S") {
        findings.push(
            Diagnostic::error(
                E508,
                ORIGIN,
                format!(
                    "field `{}.{}` has illegal type `{}`",
                    owner, field.common.name, field.field_type
                ),
            )
            .at(loc),
        );
    }
    // Cross-attribute agreement, checked when all three are plain integers
    if let (Some(width), Some(lsb), Some(msb)) = (
        field.width.as_deref().and_then(parse_plain_int),
        field.lsb.as_deref().and_then(parse_plain_int),
        field.msb.as_deref().and_then(parse_plain_int),
    ) {
        if msb - lsb + 1 != width {
            findings.push(
                Diagnostic::error(
                    E507,
                    ORIGIN,
                    format!(
                        "field `{}.{}`: width {width} disagrees with msb {msb} / lsb {lsb}",
                        owner, field.common.name
                    ),
                )
                .at(loc),
            );
        }
    }
}

fn validate_mod(module: &Mod, findings: &mut Vec<Diagnostic>) {
    validate_common(&module.common, findings);
    for port in &module.ports {
        validate_common(&port.common, findings);
        validate_role(&port.role, port.common.loc, findings);
    }
    for inst in &module.modules {
        validate_common(&inst.common, findings);
    }
}

fn validate_inst(inst: &Inst, findings: &mut Vec<Diagnostic>) {
    validate_common(&inst.common, findings);
    let loc = inst.common.loc;
    if inst.decode_f.is_some() && inst.base.is_none() {
        findings.push(
            Diagnostic::error(
                E509,
                ORIGIN,
                format!("instruction `{}` fixes a field without a base", inst.common.name),
            )
            .at(loc),
        );
    }
    if inst.decode_e.is_some() && inst.decode_f.is_none() {
        findings.push(
            Diagnostic::error(
                E509,
                ORIGIN,
                format!(
                    "instruction `{}` gives `decode_e` without `decode_f`",
                    inst.common.name
                ),
            )
            .at(loc),
        );
    }
    for field in &inst.fields {
        validate_field(field, &inst.common.name, findings);
    }
}

fn parse_plain_int(text: &str) -> Option<i64> {
    text.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_test_support::docs_from;
    use keel_diagnostics::Severity;

    fn findings_for(text: &str) -> Vec<Diagnostic> {
        validate_documents(&docs_from(text))
    }

    #[test]
    fn clean_documents_pass() {
        let findings = findings_for(
            "- !Def [X, 1]\n- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    busaccess: RO\n    fields:\n    - !Field [f, 4, 0]",
        );
        assert!(findings.is_empty(), "unexpected: {findings:?}");
    }

    #[test]
    fn illegal_access_for_column() {
        let findings =
            findings_for("- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    blockaccess: WS");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, E504);
    }

    #[test]
    fn access_aliases_accepted() {
        let findings = findings_for(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    blockaccess: WR\n    busaccess: W\n    instaccess: R",
        );
        assert!(findings.is_empty(), "unexpected: {findings:?}");
    }

    #[test]
    fn bus_access_allows_strobes() {
        let findings = findings_for(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    busaccess: ARW",
        );
        assert!(findings.is_empty(), "unexpected: {findings:?}");
    }

    #[test]
    fn width_msb_lsb_disagreement() {
        let findings = findings_for(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field\n      name: f\n      width: 4\n      lsb: 0\n      msb: 7",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, E507);
    }

    #[test]
    fn agreeing_width_msb_lsb_pass() {
        let findings = findings_for(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    fields:\n    - !Field\n      name: f\n      width: 8\n      lsb: 0\n      msb: 7",
        );
        assert!(findings.is_empty());
    }

    #[test]
    fn event_setclear_conflict() {
        let findings = findings_for(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    options: [EVENT, SETCLEAR]",
        );
        assert!(findings.iter().any(|f| f.code == E506));
    }

    #[test]
    fn has_mode_without_event_warns() {
        let findings = findings_for(
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    options: [HAS_MODE]",
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].code, W501);
    }

    #[test]
    fn illegal_role() {
        let findings = findings_for("- !His\n  name: bus\n  role: sideways\n  ports:\n  - !Port [x]");
        assert!(findings.iter().any(|f| f.code == E502));
    }

    #[test]
    fn legacy_tag_warns_per_occurrence() {
        let findings = findings_for("- !Map [a]\n- !Map [b]");
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.code == W502));
    }

    #[test]
    fn findings_aggregate_across_records() {
        let findings = findings_for(
            "- !Group\n  name: g\n  type: weird\n  regs:\n  - !Reg\n    name: r\n    blockaccess: AR\n    location: attic",
        );
        // Three independent findings from one record tree
        assert_eq!(findings.len(), 3);
    }

    #[test]
    fn decode_without_base_rejected() {
        let findings = findings_for("- !Inst\n  name: op\n  decode_f: mode");
        assert!(findings.iter().any(|f| f.code == E509));
    }
}
