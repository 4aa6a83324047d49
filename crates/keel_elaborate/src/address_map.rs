//! Address-map elaboration: `!Initiator`/`!Target` entries into an
//! [`AddressMap`] on their block.

use crate::errors::ElabError;
use crate::scope::ElabScope;
use keel_design::{AddressMap, AddressMapInitiator, AddressMapTarget, BlockId, PortId, Project};
use keel_schema::{MapEntry, Point};

/// Elaborates a block's address map.
///
/// Every entry names a boundary port of the block (child ports are
/// rejected: address distribution is modeled only at the leaf blocks that
/// implement it) plus a signal index validated against the port's count.
/// Constraint points become explicit initiator-target edges.
pub fn elaborate_map(
    entries: &[MapEntry],
    block: BlockId,
    scope: &ElabScope,
    project: &mut Project,
) -> Result<(), ElabError> {
    let block_path = project.hierarchical_path(block);
    let map_err = |detail: String| ElabError::Map {
        block: block_path.clone(),
        detail,
    };

    let mut map = AddressMap::new();
    let mut initiator_points: Vec<Vec<(PortId, u32)>> = Vec::new();
    let mut target_points: Vec<Vec<(PortId, u32)>> = Vec::new();

    // Targets first so initiator constraints can resolve forward
    for entry in entries {
        if let MapEntry::Target(target) = entry {
            let (port, index) = resolve_boundary_point(&target.port, block, scope, project)?;
            let offset = scope.eval_u64(&target.offset, "target offset")?;
            let aperture = scope.eval_u64(&target.aperture, "target aperture")?;
            map.targets.push(AddressMapTarget {
                port,
                index,
                offset,
                aperture,
            });
            let mut constraints = Vec::new();
            for point in &target.constrain {
                constraints.push(resolve_boundary_point(point, block, scope, project)?);
            }
            target_points.push(constraints);
        }
    }
    for entry in entries {
        if let MapEntry::Initiator(initiator) = entry {
            let (port, index) = resolve_boundary_point(&initiator.port, block, scope, project)?;
            let mask = scope.eval_u64(&initiator.mask, "initiator mask")?;
            let offset = scope.eval_u64(&initiator.offset, "initiator offset")?;
            map.initiators.push(AddressMapInitiator {
                port,
                index,
                mask,
                offset,
            });
            let mut constraints = Vec::new();
            for point in &initiator.constrain {
                constraints.push(resolve_boundary_point(point, block, scope, project)?);
            }
            initiator_points.push(constraints);
        }
    }

    if map.initiators.is_empty() {
        return Err(map_err(
            "cannot elaborate an address map without at least one `!Initiator`".to_string(),
        ));
    }
    if map.targets.is_empty() {
        return Err(map_err(
            "cannot elaborate an address map without at least one `!Target`".to_string(),
        ));
    }

    // Initiator-side constraints name targets
    for (initiator_index, constraints) in initiator_points.iter().enumerate() {
        for &(port, index) in constraints {
            let Some(target_index) = map.target_index(port, index) else {
                return Err(map_err(format!(
                    "cannot resolve target `{}` index {index} named by an initiator constraint",
                    project.port_path(port)
                )));
            };
            map.add_constraint(initiator_index, target_index);
        }
    }
    // Target-side constraints name initiators
    for (target_index, constraints) in target_points.iter().enumerate() {
        for &(port, index) in constraints {
            let Some(initiator_index) = map
                .initiators
                .iter()
                .position(|i| i.port == port && i.index == index)
            else {
                return Err(map_err(format!(
                    "cannot resolve initiator `{}` index {index} named by a target constraint",
                    project.port_path(port)
                )));
            };
            map.add_constraint(initiator_index, target_index);
        }
    }

    // Constrained apertures must fit in their initiator's masked window
    for &(initiator_index, target_index) in &map.constraints {
        let initiator = &map.initiators[initiator_index];
        let target = &map.targets[target_index];
        if target.aperture > initiator.mask.saturating_add(1) {
            return Err(map_err(format!(
                "aperture {:#x} of target `{}` exceeds the masked window of initiator `{}`",
                target.aperture,
                project.port_path(target.port),
                project.port_path(initiator.port)
            )));
        }
    }

    project.blocks[block].address_map = Some(map);
    Ok(())
}

/// Resolves an address-map point to a boundary port and signal index.
fn resolve_boundary_point(
    point: &Point,
    block: BlockId,
    scope: &ElabScope,
    project: &Project,
) -> Result<(PortId, u32), ElabError> {
    if point.module.is_some() {
        return Err(ElabError::Map {
            block: project.hierarchical_path(block),
            detail: format!(
                "point `{}` names a child port; address maps bind boundary ports only",
                point.port
            ),
        });
    }
    let port = project
        .find_port(block, &point.port)
        .ok_or_else(|| ElabError::UnknownPoint {
            port: point.port.clone(),
            block: project.hierarchical_path(block),
        })?;
    let index = match &point.index {
        Some(expr) => scope.eval_u32(expr, &format!("signal index of `{}`", point.port))?,
        None => 0,
    };
    let count = project.ports[port].count;
    if index >= count {
        return Err(ElabError::Map {
            block: project.hierarchical_path(block),
            detail: format!(
                "signal index {index} of port `{}` is out of range (count {count})",
                point.port
            ),
        });
    }
    Ok((port, index))
}
