//! Register aperture reachability.
//!
//! For every leaf block with registers, the check finds the boundary port
//! its registers are accessed through, walks upward across connections and
//! address maps, and verifies the highest register end-address fits inside
//! every aperture and every reachable initiator's masked window on the way
//! to the top.

use crate::engine::Check;
use crate::violation::{CriticalViolation, RuleViolation};
use keel_design::{BlockId, Direction, NodeRef, PortId, Project};
use keel_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Restricted access: an initiator cannot reach a register block.
pub const W702: DiagnosticCode = DiagnosticCode::new(Category::Warning, 702);

const NAME: &str = "check_apertures";
const MAX_CHASE_DEPTH: u32 = 512;

/// The built-in aperture reachability check.
pub struct ApertureReachability;

impl Check for ApertureReachability {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "register sets must be reachable through every aperture above them"
    }

    fn run(
        &self,
        project: &Project,
        sink: &DiagnosticSink,
    ) -> Result<Vec<RuleViolation>, CriticalViolation> {
        let mut violations = Vec::new();
        let mut reg_blocks = Vec::new();
        for root in project.principal_blocks() {
            collect_register_blocks(project, root, &mut reg_blocks);
        }

        for &block in &reg_blocks {
            let path = project.hierarchical_path(block);
            let before = violations.len();

            // Locate the port the register set is accessed through: the
            // input whose driver sits on an address-map target
            let mut access = None;
            'search: for &pid in &project.blocks[block].ports {
                if project.ports[pid].direction != Direction::Input {
                    continue;
                }
                for index in 0..project.ports[pid].count {
                    let (dport, dindex) = chase_driver(project, pid, index, 0)?;
                    let owner = project.ports[dport].block;
                    if let Some(map) = &project.blocks[owner].address_map {
                        if map.target_for(dport, dindex).is_some() {
                            access = Some((pid, index));
                            break 'search;
                        }
                    }
                }
            }
            let Some(mut cursor) = access else {
                violations.push(RuleViolation::new(
                    NodeRef::Block(block),
                    path.clone(),
                    "Block",
                    NAME,
                    format!("could not establish an access port for register block {path}"),
                ));
                continue;
            };

            // Collect the chain of address maps driving that port
            let mut chain: Vec<(BlockId, PortId, u32)> = Vec::new();
            loop {
                let (dport, dindex) = chase_driver(project, cursor.0, cursor.1, 0)?;
                let owner = project.ports[dport].block;
                let Some(map) = &project.blocks[owner].address_map else {
                    break;
                };
                let Some(target_index) = map.target_index(dport, dindex) else {
                    break;
                };
                chain.push((owner, dport, dindex));
                let initiators = map.initiators_for_target(target_index);
                if initiators.is_empty() {
                    violations.push(RuleViolation::new(
                        NodeRef::Block(owner),
                        project.hierarchical_path(owner),
                        "Block",
                        NAME,
                        format!(
                            "no initiators can access port `{}` in the address map of `{}`",
                            project.port_path(dport),
                            project.hierarchical_path(owner)
                        ),
                    ));
                    break;
                }
                // More than one inbound initiator means the path diverges;
                // stop walking upward
                if initiators.len() > 1 {
                    break;
                }
                let next = (initiators[0].port, initiators[0].index);
                if next == cursor {
                    break;
                }
                cursor = next;
            }
            if violations.len() > before {
                continue;
            }

            // Highest register end-address of the block
            let mut max_end: u64 = 0;
            let mut max_name = String::new();
            let mut max_offset: u64 = 0;
            for &gid in &project.blocks[block].registers {
                let group = &project.groups[gid];
                for &rid in &group.registers {
                    let reg = &project.registers[rid];
                    let offset = group.offset + reg.offset;
                    let end = offset + reg.byte_size();
                    if end > max_end {
                        max_end = end;
                        max_name = reg.name.clone();
                        max_offset = offset;
                    }
                }
            }
            if max_end == 0 {
                continue;
            }

            // Every map on the way up must fit the whole register set
            for (owner, dport, dindex) in &chain {
                let map = project.blocks[*owner]
                    .address_map
                    .as_ref()
                    .expect("chain entries carry maps");
                let target_index = map
                    .target_index(*dport, *dindex)
                    .expect("chain entries carry targets");
                let target = &map.targets[target_index];

                if max_end > target.aperture {
                    violations.push(RuleViolation::new(
                        NodeRef::Block(block),
                        path.clone(),
                        "Block",
                        NAME,
                        format!(
                            "register `{max_name}` at offset {max_offset:#x} does not fit in \
                             the {:#x}-byte aperture of `{}`",
                            target.aperture,
                            project.port_path(target.port)
                        ),
                    ));
                    break;
                }

                for initiator in map.initiators_for_target(target_index) {
                    let window_min = initiator.offset;
                    let window_max = initiator.offset + initiator.mask.saturating_add(1);
                    if target.offset < window_min || target.offset + max_end > window_max {
                        violations.push(RuleViolation::new(
                            NodeRef::Block(block),
                            path.clone(),
                            "Block",
                            NAME,
                            format!(
                                "not all registers of `{path}` fit the masked window of \
                                 initiator `{}` (target offset {:#x}, end {:#x}, window \
                                 {window_min:#x}..{window_max:#x})",
                                project.port_path(initiator.port),
                                target.offset,
                                target.offset + max_end
                            ),
                        ));
                    }
                }

                // Initiators excluded by constraints only get a warning
                if !map.constraints.is_empty() {
                    for (index, initiator) in map.initiators.iter().enumerate() {
                        if !map.constraints.contains(&(index, target_index)) {
                            sink.emit(Diagnostic::warning(
                                W702,
                                "check.apertures",
                                format!(
                                    "register block `{path}` cannot be accessed from \
                                     initiator `{}`",
                                    project.port_path(initiator.port)
                                ),
                            ));
                        }
                    }
                }
            }
        }

        Ok(violations)
    }
}

fn collect_register_blocks(project: &Project, block: BlockId, out: &mut Vec<BlockId>) {
    for &child in &project.blocks[block].children {
        collect_register_blocks(project, child, out);
    }
    if !project.blocks[block].registers.is_empty() {
        out.push(block);
    }
}

/// Chases a port signal back to its original driver.
fn chase_driver(
    project: &Project,
    port: PortId,
    index: u32,
    depth: u32,
) -> Result<(PortId, u32), CriticalViolation> {
    if depth > MAX_CHASE_DEPTH {
        return Err(CriticalViolation::new(RuleViolation::new(
            NodeRef::Block(project.ports[port].block),
            project.port_path(port),
            "Port",
            NAME,
            format!(
                "connection chain through `{}` exceeds {MAX_CHASE_DEPTH} hops",
                project.port_path(port)
            ),
        )));
    }
    let drivers: Vec<(PortId, u32)> = project
        .inbound_connections(port, index)
        .iter()
        .filter_map(|c| c.driving_port())
        .collect();
    match drivers.len() {
        0 => Ok((port, index)),
        1 => chase_driver(project, drivers[0].0, drivers[0].1, depth + 1),
        _ => Err(CriticalViolation::new(RuleViolation::new(
            NodeRef::Block(project.ports[port].block),
            project.port_path(port),
            "Port",
            NAME,
            format!(
                "diverging connection tree for `{}`: ports cannot have more than one driver",
                project.port_path(port)
            ),
        ))),
    }
}
