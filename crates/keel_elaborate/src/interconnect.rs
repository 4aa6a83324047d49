//! Interconnect elaboration: `!His` into [`Interconnect`] nodes.

use crate::errors::ElabError;
use crate::scope::ElabScope;
use keel_design::{
    Attributes, ComponentKind, EnumValue, Interconnect, InterconnectComponent, InterconnectId,
    NetRole, Project,
};
use keel_schema::{EnumDecl, His, HisPort};

/// Resolves an interconnect type by name, building and registering it (and
/// everything it references) on first use.
///
/// Reference cycles between `!His` definitions are detected by keeping the
/// chain of types currently being built and rejected with the full cycle.
pub fn ensure_interconnect(
    name: &str,
    scope: &ElabScope,
    project: &mut Project,
    visiting: &mut Vec<String>,
) -> Result<InterconnectId, ElabError> {
    let key = name.trim().to_ascii_lowercase();
    if let Some(id) = project.interconnect_by_name(&key) {
        return Ok(id);
    }
    if visiting.iter().any(|v| v == &key) {
        let mut cycle: Vec<String> = visiting.clone();
        cycle.push(key);
        return Err(ElabError::CyclicHis {
            cycle: cycle.join(" -> "),
        });
    }
    let Some(his) = scope.get_his(name) else {
        return Err(ElabError::Unresolved {
            kind: "interconnect",
            name: name.to_string(),
        });
    };

    visiting.push(key.clone());
    let interconnect = build_interconnect(his, scope, project, visiting)?;
    visiting.pop();

    Ok(project.register_interconnect(interconnect))
}

/// Builds one [`Interconnect`] from its `!His` definition.
fn build_interconnect(
    his: &His,
    scope: &ElabScope,
    project: &mut Project,
    visiting: &mut Vec<String>,
) -> Result<Interconnect, ElabError> {
    let his_role = parse_role(&his.role, &his.common.name)?;
    let mut components = Vec::new();
    for port in &his.ports {
        let component = match port {
            HisPort::Port(decl) => {
                let role = component_role(parse_role(&decl.role, &decl.common.name)?, his_role);
                let width = scope.eval_u32(
                    &decl.width,
                    &format!("width of signal `{}`", decl.common.name),
                )?;
                let count = scope.eval_u32(
                    &decl.count,
                    &format!("count of signal `{}`", decl.common.name),
                )?;
                let enums = build_enums(&decl.enums, scope)?;
                let default = resolve_default(decl, &enums, scope)?;
                InterconnectComponent {
                    name: decl.common.name.clone(),
                    role,
                    kind: ComponentKind::Simple { width, default },
                    count,
                    enums,
                    description: pick_description(&decl.common.ld, &decl.common.sd),
                    attributes: options_to_attributes(&decl.common.options),
                }
            }
            HisPort::Ref(link) => {
                // Referenced types are built first so cycles surface here
                ensure_interconnect(&link.his_type, scope, project, visiting)?;
                let role = component_role(parse_role(&link.role, &link.common.name)?, his_role);
                let count = scope.eval_u32(
                    &link.count,
                    &format!("count of reference `{}`", link.common.name),
                )?;
                InterconnectComponent {
                    name: link.common.name.clone(),
                    role,
                    kind: ComponentKind::Complex {
                        his_type: link.his_type.clone(),
                    },
                    count,
                    enums: Vec::new(),
                    description: pick_description(&link.common.ld, &link.common.sd),
                    attributes: options_to_attributes(&link.common.options),
                }
            }
        };
        components.push(component);
    }

    Ok(Interconnect {
        id: project.interconnects.next_id(),
        name: his.common.name.clone(),
        role: his_role,
        components,
        description: pick_description(&his.common.ld, &his.common.sd),
        attributes: options_to_attributes(&his.common.options),
    })
}

/// Computes the net role of every leaf signal of an interconnect type.
///
/// Walking the reference chain, each slave-roled link inverts the roles of
/// everything beneath it; bidirectional stays bidirectional.
pub fn leaf_roles(project: &Project, id: InterconnectId) -> Vec<(String, NetRole)> {
    let mut out = Vec::new();
    walk_leaves(project, id, "", false, &mut out);
    out
}

fn walk_leaves(
    project: &Project,
    id: InterconnectId,
    prefix: &str,
    flipped: bool,
    out: &mut Vec<(String, NetRole)>,
) {
    for component in &project.interconnects[id].components {
        let path = if prefix.is_empty() {
            component.name.clone()
        } else {
            format!("{prefix}.{}", component.name)
        };
        let inverted = flipped ^ (component.role == NetRole::Slave);
        match &component.kind {
            ComponentKind::Simple { .. } => {
                let net = if component.role == NetRole::Bidir {
                    NetRole::Bidir
                } else if inverted {
                    NetRole::Slave
                } else {
                    NetRole::Master
                };
                out.push((path, net));
            }
            ComponentKind::Complex { his_type } => {
                if let Some(nested) = project.interconnect_by_name(his_type) {
                    walk_leaves(project, nested, &path, inverted, out);
                }
            }
        }
    }
}

/// Evaluates the enumerated values of a signal, auto-incrementing when a
/// value is omitted.
pub(crate) fn build_enums(
    decls: &[EnumDecl],
    scope: &ElabScope,
) -> Result<Vec<EnumValue>, ElabError> {
    let mut out = Vec::new();
    let mut current: i64 = -1;
    for decl in decls {
        current = match &decl.val {
            Some(expr) => scope.eval_i64(
                expr,
                &format!("enumeration value `{}`", decl.common.name),
            )?,
            None => current + 1,
        };
        out.push(EnumValue {
            name: decl.common.name.clone(),
            value: current,
            description: pick_description(&decl.common.ld, &decl.common.sd),
        });
    }
    Ok(out)
}

/// Resolves a signal's default: either one of its enum names or an
/// expression.
fn resolve_default(
    decl: &keel_schema::PortDecl,
    enums: &[EnumValue],
    scope: &ElabScope,
) -> Result<i64, ElabError> {
    let text = decl.default.trim();
    if let Some(found) = enums.iter().find(|e| e.name == text) {
        return Ok(found.value);
    }
    scope.eval_i64(text, &format!("default of signal `{}`", decl.common.name))
}

pub(crate) fn parse_role(text: &str, owner: &str) -> Result<NetRole, ElabError> {
    NetRole::parse(text).ok_or_else(|| ElabError::Unresolved {
        kind: "role",
        name: format!("{text} (on `{owner}`)"),
    })
}

/// A component inside a bidirectional type is itself bidirectional.
fn component_role(own: NetRole, parent: NetRole) -> NetRole {
    if parent == NetRole::Bidir {
        NetRole::Bidir
    } else {
        own
    }
}

pub(crate) fn pick_description(ld: &str, sd: &str) -> String {
    if ld.is_empty() {
        sd.to_string()
    } else {
        ld.to_string()
    }
}

/// Converts schema option flags into node attributes: `KEY=VALUE` options
/// become string attributes, bare flags become boolean attributes.
pub(crate) fn options_to_attributes(options: &[String]) -> Attributes {
    let mut attributes = Attributes::new();
    for option in options {
        match option.split_once('=') {
            Some((key, value)) => {
                attributes.insert(key.trim().to_string(), value.trim().into());
            }
            None => {
                attributes.insert(option.trim().to_string(), true.into());
            }
        }
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_diagnostics::DiagnosticSink;
    use keel_schema::parse_documents;
    use keel_preprocess::OutLine;
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

    #[test]
    fn simple_components_in_order() {
        let scope = scope_from(
            "- !His\n  name: stream\n  ports:\n  - !Port [data, 32]\n  - !Port [valid]\n  - !Port [ready, 1, \"\", 1, 0, Slave]",
        );
        let mut project = Project::new("test");
        let id = ensure_interconnect("stream", &scope, &mut project, &mut Vec::new()).unwrap();
        let intc = &project.interconnects[id];
        assert_eq!(intc.components.len(), 3);
        assert_eq!(intc.components[0].name, "data");
        assert!(matches!(
            intc.components[0].kind,
            ComponentKind::Simple { width: 32, .. }
        ));
        assert_eq!(intc.components[2].role, NetRole::Slave);
    }

    #[test]
    fn complex_components_link_types() {
        let scope = scope_from(
            "- !His\n  name: leaf\n  ports:\n  - !Port [sig]\n- !His\n  name: outer\n  ports:\n  - !HisRef [fwd, leaf]\n  - !HisRef [rev, leaf, \"\", 1, Slave]",
        );
        let mut project = Project::new("test");
        let id = ensure_interconnect("outer", &scope, &mut project, &mut Vec::new()).unwrap();
        assert_eq!(project.interconnects.len(), 2);
        let roles = leaf_roles(&project, id);
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[0], ("fwd.sig".to_string(), NetRole::Master));
        // The slave link flips the nested master signal
        assert_eq!(roles[1], ("rev.sig".to_string(), NetRole::Slave));
    }

    #[test]
    fn double_inversion_restores_master() {
        let scope = scope_from(
            "- !His\n  name: inner\n  ports:\n  - !Port [sig, 1, \"\", 1, 0, Slave]\n- !His\n  name: outer\n  ports:\n  - !HisRef [link, inner, \"\", 1, Slave]",
        );
        let mut project = Project::new("test");
        let id = ensure_interconnect("outer", &scope, &mut project, &mut Vec::new()).unwrap();
        let roles = leaf_roles(&project, id);
        assert_eq!(roles[0].1, NetRole::Master);
    }

    #[test]
    fn cyclic_his_rejected() {
        let scope = scope_from(
            "- !His\n  name: a\n  ports:\n  - !HisRef [to_b, b]\n- !His\n  name: b\n  ports:\n  - !HisRef [to_a, a]",
        );
        let mut project = Project::new("test");
        let err =
            ensure_interconnect("a", &scope, &mut project, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, ElabError::CyclicHis { .. }));
    }

    #[test]
    fn unknown_type_rejected() {
        let scope = scope_from("- !Def [X, 1]");
        let mut project = Project::new("test");
        let err =
            ensure_interconnect("ghost", &scope, &mut project, &mut Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            ElabError::Unresolved {
                kind: "interconnect",
                ..
            }
        ));
    }

    #[test]
    fn enum_default_resolves_by_name() {
        let scope = scope_from(
            "- !His\n  name: mode\n  ports:\n  - !Port\n    name: sel\n    width: 2\n    default: FAST\n    enum:\n    - !Enum [SLOW, 0]\n    - !Enum [FAST]",
        );
        let mut project = Project::new("test");
        let id = ensure_interconnect("mode", &scope, &mut project, &mut Vec::new()).unwrap();
        let ComponentKind::Simple { default, .. } = project.interconnects[id].components[0].kind
        else {
            panic!("expected simple component");
        };
        // FAST auto-increments from SLOW=0
        assert_eq!(default, 1);
    }

    #[test]
    fn width_expression_uses_defs() {
        let scope = scope_from(
            "- !Def [LANES, 4]\n- !His\n  name: bus\n  ports:\n  - !Port [data, LANES * 8]",
        );
        let mut project = Project::new("test");
        let id = ensure_interconnect("bus", &scope, &mut project, &mut Vec::new()).unwrap();
        assert!(matches!(
            project.interconnects[id].components[0].kind,
            ComponentKind::Simple { width: 32, .. }
        ));
    }

    #[test]
    fn interconnect_registered_once() {
        let scope = scope_from("- !His\n  name: wire\n  ports:\n  - !Port [sig]");
        let mut project = Project::new("test");
        let a = ensure_interconnect("wire", &scope, &mut project, &mut Vec::new()).unwrap();
        let b = ensure_interconnect("WIRE", &scope, &mut project, &mut Vec::new()).unwrap();
        assert_eq!(a, b);
        assert_eq!(project.interconnects.len(), 1);
    }
}
