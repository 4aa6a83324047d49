//! Module elaboration: `!Mod` hierarchies into [`Block`] trees.
//!
//! Elaboration of one module runs in stages: create the block, expand its
//! boundary ports, inject or nominate principal clock/reset ports, expand
//! children recursively, wire explicit connections, distribute clock and
//! reset, infer implicit connections (a strict name-and-type pass followed
//! by a relaxed type-only pass), warn about leftovers, attach the register
//! set, and finally build the address map.

use crate::address_map::elaborate_map;
use crate::errors::{
    warn_multiple_candidates, warn_root_and_auto, warn_unconnected, ElabError,
};
use crate::interconnect::{ensure_interconnect, options_to_attributes, parse_role, pick_description};
use crate::registers::elaborate_registers;
use crate::scope::ElabScope;
use indexmap::IndexMap;
use keel_design::{
    flag_set, Block, BlockId, Connection, Direction, NetRole, Port, PortId, Project,
};
use keel_diagnostics::DiagnosticSink;
use keel_schema::{Config, ConnectEnd, DefineOverride, Mod, Point};
use std::collections::{HashMap, HashSet};

/// The register description attached to a module: the config to lay out and
/// the `!Define` overrides that were in scope with it.
pub struct RegisterSource {
    /// The layout directive (declared or synthesized).
    pub config: Config,
    /// The overrides declared alongside it.
    pub overrides: Vec<DefineOverride>,
}

/// Register descriptions per module name (lowercased), discovered by the
/// driver from each module file's includes.
pub type RegisterLookup = IndexMap<String, RegisterSource>;

/// The module elaborator.
pub struct ModuleElab<'a> {
    /// The document scope for reference resolution.
    pub scope: &'a ElabScope,
    /// The diagnostic sink.
    pub sink: &'a DiagnosticSink,
    /// Register descriptions per module.
    pub registers: &'a RegisterLookup,
    /// Maximum elaboration depth; children below the cutoff get boundary
    /// ports only.
    pub max_depth: Option<u32>,
}

struct ChildPorts {
    inputs: Vec<PortId>,
    outputs: Vec<PortId>,
    inouts: Vec<PortId>,
}

struct Unconnected {
    parent_in: Vec<PortId>,
    parent_out: Vec<PortId>,
    parent_bi: Vec<PortId>,
    children: Vec<ChildPorts>,
}

impl ModuleElab<'_> {
    /// Elaborates a top-level module into a block tree.
    pub fn elaborate(&self, module: &Mod, project: &mut Project) -> Result<BlockId, ElabError> {
        let instance = module.common.name.clone();
        self.build_tree(project, module, &instance, None, 0)
    }

    /// Merges a module with everything it extends, recursively.
    fn resolve_inheritance(&self, module: &Mod, depth: usize) -> Result<Mod, ElabError> {
        let Some(base_name) = module.extends.as_deref() else {
            return Ok(module.clone());
        };
        if depth > 32 {
            return Err(ElabError::CyclicMod {
                name: module.common.name.clone(),
            });
        }
        let base_doc = self.scope.get_mod(base_name).ok_or_else(|| ElabError::Unresolved {
            kind: "base module",
            name: base_name.to_string(),
        })?;
        let base = self.resolve_inheritance(base_doc, depth + 1)?;

        let mut merged = module.clone();
        merged.extends = None;

        let port_names: HashSet<&str> =
            module.ports.iter().map(|p| p.common.name.as_str()).collect();
        merged.ports.extend(
            base.ports
                .iter()
                .filter(|p| !port_names.contains(p.common.name.as_str()))
                .cloned(),
        );

        // Simple flags union; valued options only where the key is new
        for option in &base.common.options {
            match option.split_once('=') {
                None => {
                    if !merged.common.options.contains(option) {
                        merged.common.options.push(option.clone());
                    }
                }
                Some((key, _)) => {
                    let clashes = merged.common.options.iter().any(|existing| {
                        existing.split_once('=').is_some_and(|(k, _)| k == key)
                    });
                    if !clashes {
                        merged.common.options.push(option.clone());
                    }
                }
            }
        }

        if merged.common.sd.is_empty() {
            merged.common.sd = base.common.sd.clone();
        }
        if merged.common.ld.is_empty() {
            merged.common.ld = base.common.ld.clone();
        }

        let child_names: HashSet<&str> =
            module.modules.iter().map(|m| m.common.name.as_str()).collect();
        merged.modules.extend(
            base.modules
                .iter()
                .filter(|m| !child_names.contains(m.common.name.as_str()))
                .cloned(),
        );

        merged.connections.extend(base.connections.iter().cloned());
        merged.defaults.extend(base.defaults.iter().cloned());
        if merged.clk_root.is_none() {
            merged.clk_root = base.clk_root.clone();
        }
        if merged.rst_root.is_none() {
            merged.rst_root = base.rst_root.clone();
        }
        Ok(merged)
    }

    fn build_tree(
        &self,
        project: &mut Project,
        module: &Mod,
        instance_name: &str,
        parent: Option<BlockId>,
        depth: u32,
    ) -> Result<BlockId, ElabError> {
        let merged;
        let module = if module.extends.is_some() {
            merged = self.resolve_inheritance(module, 0)?;
            &merged
        } else {
            module
        };

        // Stage 1: the block itself
        let block_id = project.blocks.next_id();
        let mut block = Block::new(
            block_id,
            instance_name,
            &module.common.name,
            parent,
            pick_description(&module.common.ld, &module.common.sd),
        );
        block.attributes = options_to_attributes(&module.common.options);
        block
            .attributes
            .insert("LEAF_NODE".to_string(), module.modules.is_empty().into());
        project.blocks.alloc(block);
        if let Some(parent_id) = parent {
            project.blocks[parent_id].children.push(block_id);
        }

        // Stage 2: boundary ports
        for decl in &module.ports {
            let count = self
                .scope
                .eval_u32(&decl.count, &format!("count of port `{}`", decl.common.name))?;
            if count == 0 {
                continue;
            }
            let role = parse_role(&decl.role, &decl.common.name)?;
            let direction = match role {
                NetRole::Slave => Direction::Input,
                NetRole::Master => Direction::Output,
                NetRole::Bidir => Direction::Inout,
            };
            ensure_interconnect(&decl.his_type, self.scope, project, &mut Vec::new())?;
            let pid = project.ports.alloc(Port {
                id: project.ports.next_id(),
                name: decl.common.name.clone(),
                his_type: decl.his_type.clone(),
                count,
                direction,
                block: block_id,
                description: pick_description(&decl.common.ld, &decl.common.sd),
                attributes: options_to_attributes(&decl.common.options),
            });
            project.blocks[block_id].ports.push(pid);
        }

        // Stage 3: automatic clock and reset ports
        let mut main_clock = None;
        let mut main_reset = None;
        let no_auto = module.common.has_option("NO_CLK_RST")
            || module.common.has_option("NO_AUTO_CLK_RST");
        if !no_auto {
            main_clock = Some(self.inject_principal(project, block_id, "clk", "clock", "AUTO_CLK")?);
            main_reset = Some(self.inject_principal(project, block_id, "rst", "reset", "AUTO_RST")?);
        }

        // Stage 4: when injection is disabled, nominate principals from
        // AUTO_CLK / AUTO_RST boundary ports
        let mut auto_clock_port = None;
        let mut auto_reset_port = None;
        if no_auto {
            for &pid in &project.blocks[block_id].ports {
                let port = &project.ports[pid];
                if port.direction != Direction::Input {
                    continue;
                }
                if auto_clock_port.is_none() && flag_set(&port.attributes, "AUTO_CLK") {
                    auto_clock_port = Some(pid);
                } else if auto_reset_port.is_none() && flag_set(&port.attributes, "AUTO_RST") {
                    auto_reset_port = Some(pid);
                }
            }
        }
        let main_clock = main_clock.or(auto_clock_port);
        let main_reset = main_reset.or(auto_reset_port);
        project.blocks[block_id].principal_clock = main_clock;
        project.blocks[block_id].principal_reset = main_reset;

        // Shallow elaboration stops at boundary ports
        if let Some(max) = self.max_depth {
            if depth >= max {
                return Ok(block_id);
            }
        }

        // Stage 5: expand children
        let mut xmap: IndexMap<String, Vec<String>> = IndexMap::new();
        for inst in &module.modules {
            let mod_ref = self
                .scope
                .get_mod(&inst.mod_type)
                .ok_or_else(|| ElabError::Unresolved {
                    kind: "module",
                    name: inst.mod_type.clone(),
                })?
                .clone();
            let count = self.scope.eval_u32(
                &inst.count,
                &format!("count of instance `{}`", inst.common.name),
            )?;
            let mut expands = Vec::new();
            for index in 0..count {
                let child_name = if count > 1 {
                    format!("{}_{index}", inst.common.name)
                } else {
                    inst.common.name.clone()
                };
                let child_id =
                    self.build_tree(project, &mod_ref, &child_name, Some(block_id), depth + 1)?;
                let description = pick_description(&inst.common.ld, &inst.common.sd);
                if !description.is_empty() {
                    project.blocks[child_id].description = description;
                }
                expands.push(child_name);
            }
            xmap.insert(inst.common.name.clone(), expands);
        }

        // Nominated distribution roots; the boundary principals stay
        // externally visible
        let mut dist_clock = main_clock;
        let mut dist_reset = main_reset;
        if let Some(point) = &module.clk_root {
            dist_clock = Some(resolve_point(project, block_id, &xmap, point)?[0]);
            if auto_clock_port.is_some() {
                self.sink
                    .emit(warn_root_and_auto(&module.common.name, "clk"));
            }
        }
        if let Some(point) = &module.rst_root {
            dist_reset = Some(resolve_point(project, block_id, &xmap, point)?[0]);
            if auto_reset_port.is_some() {
                self.sink
                    .emit(warn_root_and_auto(&module.common.name, "rst"));
            }
        }

        // Stage 6: explicit connections
        let mut cursors: HashMap<PortId, u32> = HashMap::new();
        for conn in &module.connections {
            self.wire_explicit(project, block_id, &xmap, conn, &mut cursors)?;
        }

        // Stage 7: clock and reset distribution
        let mut defaulted = Vec::new();
        for point in &module.defaults {
            defaulted.extend(resolve_point(project, block_id, &xmap, point)?);
        }
        for child in project.blocks[block_id].children.clone() {
            let child_clock = project.blocks[child].principal_clock;
            let child_reset = project.blocks[child].principal_reset;
            self.distribute(project, block_id, dist_clock, child_clock, &defaulted);
            self.distribute(project, block_id, dist_reset, child_reset, &defaulted);
        }

        // Stages 8 and 9: implicit inference, strict then relaxed
        for relaxed in [false, true] {
            let unconn = list_unconnected(project, block_id, &defaulted);
            self.pair_parent_to_children(project, block_id, &unconn.parent_in, &unconn.children, relaxed, false);
            self.pair_parent_to_children(project, block_id, &unconn.parent_bi, &unconn.children, relaxed, true);
            self.pair_children_to_parent(project, block_id, &unconn.parent_out, &unconn.children, relaxed);
            self.pair_child_to_child(project, block_id, &unconn.children, relaxed);
        }

        // Stage 12 runs before the warning sweep: an attached register set
        // marks the block as implementing its remaining ports
        if let Some(source) = self.registers.get(&module.common.name.to_ascii_lowercase()) {
            let groups =
                elaborate_registers(&source.config, &source.overrides, self.scope, project, self.sink)?;
            project.blocks[block_id].registers.extend(groups);
        }

        // Stages 10 and 11: defaults suppress, everything else warns
        let unconn = list_unconnected(project, block_id, &defaulted);
        let attrs = &project.blocks[block_id].attributes;
        let exempt_parent = !project.blocks[block_id].registers.is_empty()
            || flag_set(attrs, "IMP")
            || flag_set(attrs, "DECODER");
        if !exempt_parent {
            for &pid in unconn
                .parent_in
                .iter()
                .chain(&unconn.parent_out)
                .chain(&unconn.parent_bi)
            {
                self.sink.emit(warn_unconnected(&project.port_path(pid)));
            }
        }
        for child in &unconn.children {
            for &pid in child.inputs.iter().chain(&child.outputs).chain(&child.inouts) {
                self.sink.emit(warn_unconnected(&project.port_path(pid)));
            }
        }

        // Stage 13: address map
        if !module.addressmap.is_empty() {
            elaborate_map(&module.addressmap, block_id, self.scope, project)?;
        }

        Ok(block_id)
    }

    fn inject_principal(
        &self,
        project: &mut Project,
        block: BlockId,
        name: &str,
        his_type: &str,
        marker: &str,
    ) -> Result<PortId, ElabError> {
        ensure_interconnect(his_type, self.scope, project, &mut Vec::new())?;
        let mut attributes = keel_design::Attributes::new();
        attributes.insert(marker.to_string(), true.into());
        attributes.insert("EXPLICIT_NAME".to_string(), true.into());
        let pid = project.ports.alloc(Port {
            id: project.ports.next_id(),
            name: name.to_string(),
            his_type: his_type.to_string(),
            count: 1,
            direction: Direction::Input,
            block,
            description: String::new(),
            attributes,
        });
        project.blocks[block].ports.push(pid);
        Ok(pid)
    }

    fn wire_explicit(
        &self,
        project: &mut Project,
        block: BlockId,
        xmap: &IndexMap<String, Vec<String>>,
        conn: &keel_schema::Connect,
        cursors: &mut HashMap<PortId, u32>,
    ) -> Result<(), ElabError> {
        if !conn.points.is_empty() {
            let mut sources = Vec::new();
            let mut targets = Vec::new();
            for point in &conn.points {
                for pid in resolve_point(project, block, xmap, point)? {
                    let port = &project.ports[pid];
                    // A boundary input feeds the inside; a child input
                    // receives from the inside
                    let is_source = if port.block == block {
                        port.direction == Direction::Input
                    } else {
                        port.direction != Direction::Input
                    };
                    if is_source {
                        sources.push(pid);
                    } else {
                        targets.push(pid);
                    }
                }
            }

            let next = |cursors: &mut HashMap<PortId, u32>, project: &Project, pid: PortId| {
                let count = project.ports[pid].count;
                let entry = cursors.entry(pid).or_insert(0);
                let mut index = *entry;
                if index >= count {
                    index = 0;
                }
                *entry = index + 1;
                index
            };

            match (sources.len(), targets.len()) {
                (s, t) if s == t && s > 0 => {
                    for i in 0..s {
                        for _ in 0..project.ports[targets[i]].count {
                            let si = next(cursors, project, sources[i]);
                            let ti = next(cursors, project, targets[i]);
                            project.blocks[block]
                                .connections
                                .push(Connection::wire(sources[i], si, targets[i], ti));
                        }
                    }
                }
                (1, t) if t > 1 => {
                    for &target in &targets {
                        for _ in 0..project.ports[target].count {
                            let si = if project.ports[sources[0]].count > 1 {
                                next(cursors, project, sources[0])
                            } else {
                                0
                            };
                            let ti = next(cursors, project, target);
                            project.blocks[block]
                                .connections
                                .push(Connection::wire(sources[0], si, target, ti));
                        }
                    }
                }
                (s, 1) if s > 1 => {
                    for &source in &sources {
                        for _ in 0..project.ports[source].count {
                            let si = next(cursors, project, source);
                            let ti = next(cursors, project, targets[0]);
                            project.blocks[block]
                                .connections
                                .push(Connection::wire(source, si, targets[0], ti));
                        }
                    }
                }
                (s, t) => {
                    return Err(ElabError::BadConnection {
                        sources: s,
                        targets: t,
                    });
                }
            }
        }

        if !conn.constants.is_empty() {
            let mut constant = None;
            let mut tied = Vec::new();
            for end in &conn.constants {
                match end {
                    ConnectEnd::Const(tie) => {
                        if constant.is_some() {
                            return Err(ElabError::BadConstant {
                                detail: "multiple constants for a single connection".to_string(),
                            });
                        }
                        constant =
                            Some(self.scope.eval_i64(&tie.value, "constant tie value")?);
                    }
                    ConnectEnd::Point(point) => {
                        tied.extend(resolve_point(project, block, xmap, point)?);
                    }
                }
            }
            let Some(value) = constant else {
                return Err(ElabError::BadConstant {
                    detail: "no constant in the connection".to_string(),
                });
            };
            for pid in tied {
                let his_type = project.ports[pid].his_type.clone();
                if !is_primitive_type(project, &his_type) {
                    return Err(ElabError::BadConstant {
                        detail: format!(
                            "port `{}` has composite type `{his_type}` and cannot be tied",
                            project.port_path(pid)
                        ),
                    });
                }
                let tie_index = project.blocks[block]
                    .connections
                    .iter()
                    .filter(|c| c.target == pid)
                    .count() as u32;
                project.blocks[block]
                    .connections
                    .push(Connection::tie(value, pid, tie_index));
            }
        }
        Ok(())
    }

    fn distribute(
        &self,
        project: &mut Project,
        block: BlockId,
        source: Option<PortId>,
        target: Option<PortId>,
        defaulted: &[PortId],
    ) {
        let (Some(source), Some(target)) = (source, target) else {
            return;
        };
        if source == target {
            return;
        }
        let port = &project.ports[target];
        if port.direction != Direction::Input || port.block == block {
            return;
        }
        if defaulted.contains(&target) {
            return;
        }
        let already_driven = project.blocks[block]
            .connections
            .iter()
            .any(|c| c.target == target && c.target_index == 0);
        if already_driven {
            return;
        }
        project.blocks[block]
            .connections
            .push(Connection::wire(source, 0, target, 0));
    }

    fn matches(
        &self,
        project: &Project,
        a: PortId,
        b: PortId,
        relaxed: bool,
    ) -> bool {
        let pa = &project.ports[a];
        let pb = &project.ports[b];
        pa.his_type.eq_ignore_ascii_case(&pb.his_type) && (relaxed || pa.name == pb.name)
    }

    fn pair_parent_to_children(
        &self,
        project: &mut Project,
        block: BlockId,
        parent_ports: &[PortId],
        children: &[ChildPorts],
        relaxed: bool,
        bidir: bool,
    ) {
        for &top in parent_ports {
            for child in children {
                let candidates = if bidir { &child.inouts } else { &child.inputs };
                for &child_port in candidates {
                    if !self.matches(project, top, child_port, relaxed) {
                        continue;
                    }
                    let top_count = project.ports[top].count;
                    let child_count = project.ports[child_port].count;
                    let common = top_count.min(child_count);
                    let top_used = driver_uses(project, block, top);
                    let child_used = target_uses(project, block, child_port);
                    for i in 0..common {
                        let top_i = (i + top_used) % top_count;
                        let child_i = i + child_used;
                        if child_i >= child_count {
                            self.sink.emit(warn_multiple_candidates(
                                &project.port_path(child_port),
                                &project.blocks[block].name,
                            ));
                            break;
                        }
                        project.blocks[block]
                            .connections
                            .push(Connection::wire(top, top_i, child_port, child_i));
                    }
                }
            }
        }
    }

    fn pair_children_to_parent(
        &self,
        project: &mut Project,
        block: BlockId,
        parent_ports: &[PortId],
        children: &[ChildPorts],
        relaxed: bool,
    ) {
        for &top in parent_ports {
            for child in children {
                for &child_port in &child.outputs {
                    if !self.matches(project, top, child_port, relaxed) {
                        continue;
                    }
                    let top_count = project.ports[top].count;
                    let child_count = project.ports[child_port].count;
                    let common = top_count.min(child_count);
                    let child_used = driver_uses(project, block, child_port);
                    let top_used = target_uses(project, block, top);
                    for i in 0..common {
                        let child_i = (i + child_used) % child_count;
                        let top_i = i + top_used;
                        if top_i >= top_count {
                            self.sink.emit(warn_multiple_candidates(
                                &project.port_path(top),
                                &project.blocks[block].name,
                            ));
                            break;
                        }
                        project.blocks[block]
                            .connections
                            .push(Connection::wire(child_port, child_i, top, top_i));
                    }
                }
            }
        }
    }

    fn pair_child_to_child(
        &self,
        project: &mut Project,
        block: BlockId,
        children: &[ChildPorts],
        relaxed: bool,
    ) {
        for (a_index, a) in children.iter().enumerate() {
            for (b_index, b) in children.iter().enumerate() {
                // Never pair a block with itself
                if a_index == b_index {
                    continue;
                }
                for &source in &a.outputs {
                    for &target in &b.inputs {
                        if !self.matches(project, source, target, relaxed) {
                            continue;
                        }
                        let source_count = project.ports[source].count;
                        let target_count = project.ports[target].count;
                        let common = source_count.min(target_count);
                        let source_used = driver_uses(project, block, source);
                        let target_used = target_uses(project, block, target);
                        for i in 0..common {
                            let source_i = (i + source_used) % source_count;
                            let target_i = i + target_used;
                            if target_i >= target_count {
                                self.sink.emit(warn_multiple_candidates(
                                    &project.port_path(target),
                                    &project.blocks[block].name,
                                ));
                                break;
                            }
                            project.blocks[block]
                                .connections
                                .push(Connection::wire(source, source_i, target, target_i));
                        }
                    }
                }
            }
        }
    }
}

/// Resolves a `!Point` to the ports it names.
///
/// A point without a module names a boundary port; a point with a module
/// fans out over every expanded instance of that child.
pub(crate) fn resolve_point(
    project: &Project,
    block: BlockId,
    xmap: &IndexMap<String, Vec<String>>,
    point: &Point,
) -> Result<Vec<PortId>, ElabError> {
    match &point.module {
        None => {
            let pid = project.find_port(block, &point.port).ok_or_else(|| {
                ElabError::UnknownPoint {
                    port: point.port.clone(),
                    block: project.hierarchical_path(block),
                }
            })?;
            Ok(vec![pid])
        }
        Some(module) => {
            let instances = xmap
                .get(module)
                .cloned()
                .unwrap_or_else(|| vec![module.clone()]);
            let mut out = Vec::new();
            for instance in instances {
                let child = project.find_child(block, &instance).ok_or_else(|| {
                    ElabError::UnknownPoint {
                        port: point.port.clone(),
                        block: instance.clone(),
                    }
                })?;
                let pid = project.find_port(child, &point.port).ok_or_else(|| {
                    ElabError::UnknownPoint {
                        port: point.port.clone(),
                        block: project.hierarchical_path(child),
                    }
                })?;
                out.push(pid);
            }
            Ok(out)
        }
    }
}

/// Counts connections in the block using the port as a driver.
fn driver_uses(project: &Project, block: BlockId, port: PortId) -> u32 {
    project.blocks[block]
        .connections
        .iter()
        .filter(|c| c.driving_port().is_some_and(|(p, _)| p == port))
        .count() as u32
}

/// Counts connections in the block targeting the port.
fn target_uses(project: &Project, block: BlockId, port: PortId) -> u32 {
    project.blocks[block]
        .connections
        .iter()
        .filter(|c| c.target == port)
        .count() as u32
}

fn touched(project: &Project, block: BlockId, port: PortId) -> bool {
    project.blocks[block].connections.iter().any(|c| {
        c.target == port || c.driving_port().is_some_and(|(p, _)| p == port)
    })
}

/// Lists every port of the block and its children untouched by the block's
/// connections and not suppressed by `defaults`.
fn list_unconnected(project: &Project, block: BlockId, defaulted: &[PortId]) -> Unconnected {
    let split = |ports: &[PortId]| -> ChildPorts {
        let mut out = ChildPorts {
            inputs: Vec::new(),
            outputs: Vec::new(),
            inouts: Vec::new(),
        };
        for &pid in ports {
            if defaulted.contains(&pid) || touched(project, block, pid) {
                continue;
            }
            match project.ports[pid].direction {
                Direction::Input => out.inputs.push(pid),
                Direction::Output => out.outputs.push(pid),
                Direction::Inout => out.inouts.push(pid),
            }
        }
        out
    };
    let parent = split(&project.blocks[block].ports);
    let children = project.blocks[block]
        .children
        .iter()
        .map(|&child| split(&project.blocks[child].ports))
        .collect();
    Unconnected {
        parent_in: parent.inputs,
        parent_out: parent.outputs,
        parent_bi: parent.inouts,
        children,
    }
}

/// A type is primitive when it contains no complex components, so a single
/// constant value can drive it.
fn is_primitive_type(project: &Project, his_type: &str) -> bool {
    match project.interconnect_by_name(his_type) {
        Some(id) => project.interconnects[id]
            .components
            .iter()
            .all(|c| matches!(c.kind, keel_design::ComponentKind::Simple { .. })),
        None => false,
    }
}
