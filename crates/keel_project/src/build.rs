//! The `build_project` pipeline.

use indexmap::IndexMap;
use keel_check::{CheckError, CheckRegistry, RuleViolation, WaiverSet};
use keel_design::Project;
use keel_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use keel_elaborate::{
    elaborate, synthesize_config, ElabError, ElabScope, RegisterLookup, RegisterSource,
};
use keel_preprocess::{PreprocessError, Scope};
use keel_schema::{
    parse_documents, validate_documents, Doc, His, HisPort, ParseError, PortDecl, TagCommon,
};
use keel_source::{FileId, Loc};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::options::BuildOptions;

/// Pipeline progress message.
pub const I100: DiagnosticCode = DiagnosticCode::new(Category::Info, 100);
/// Per-stage profiling message.
pub const I101: DiagnosticCode = DiagnosticCode::new(Category::Info, 101);
/// No documents in the top file.
pub const W100: DiagnosticCode = DiagnosticCode::new(Category::Warning, 100);

const ORIGIN: &str = "project";

/// The result of a successful pipeline run.
#[derive(Debug)]
pub struct BuildOutput {
    /// The elaborated project; absent when a critical check violation fired
    /// or the top file contained no documents.
    pub project: Option<Project>,
    /// Rule violations that survived waiving.
    pub violations: Vec<RuleViolation>,
    /// The structured diagnostic report of the whole run.
    pub report: Vec<Diagnostic>,
    /// Every file opened by the preprocessor or parser.
    pub deps: Vec<PathBuf>,
}

/// Fatal pipeline failures.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// An include entry could not be scanned.
    #[error("could not scan include path `{path}`: {source}")]
    Include {
        /// The include entry.
        path: PathBuf,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// Preprocessing failed.
    #[error(transparent)]
    Preprocess(#[from] PreprocessError),

    /// Parsing the preprocessed text failed.
    #[error("{path}: {source}")]
    Parse {
        /// The file the error points into.
        path: PathBuf,
        /// The underlying parse failure.
        #[source]
        source: ParseError,
    },

    /// Validation found errors; the full findings are in `report`.
    #[error("validation failed with {errors} error(s)")]
    Validation {
        /// The number of error-severity findings.
        errors: usize,
        /// The report accumulated up to and including validation.
        report: Vec<Diagnostic>,
    },

    /// Elaboration failed.
    #[error(transparent)]
    Elaborate(#[from] ElabError),

    /// A waiver file could not be loaded.
    #[error(transparent)]
    Waivers(#[from] CheckError),
}

/// Runs the full pipeline over the top file.
pub fn build_project(options: &BuildOptions) -> Result<BuildOutput, BuildError> {
    let sink = if options.quiet {
        DiagnosticSink::quiet()
    } else {
        DiagnosticSink::new()
    };

    // Stage 1: register every file in the preprocessor scope
    let started = Instant::now();
    let mut scope = Scope::new();
    for (name, value) in &options.defines {
        scope.define(name, value.clone());
    }
    for entry in &options.includes {
        if entry.is_dir() {
            let mut found = Vec::new();
            collect_yaml_files(entry, &mut found).map_err(|source| BuildError::Include {
                path: entry.clone(),
                source,
            })?;
            for path in found {
                scope.add_file(&path)?;
            }
        } else {
            scope.add_file(entry)?;
        }
    }
    let top_name = base_name(&options.top_file);
    if !scope.has_file(&top_name) {
        scope.add_file(&options.top_file)?;
    }
    profile(&sink, options, "building scope", started);

    // Stage 2: evaluate the preprocessor from the top file; includes are
    // pulled in lazily
    let started = Instant::now();
    scope.evaluate(&top_name)?;
    sink.emit(Diagnostic::info(
        I100,
        ORIGIN,
        format!("{} file(s) in preprocessor scope", scope.source_db().len()),
    ));
    profile(&sink, options, "preprocessor evaluation", started);

    // Stage 3: parse the evaluated stream into schema documents
    let started = Instant::now();
    let lines = scope.result(&top_name).expect("top file was evaluated");
    let docs = parse_documents(lines).map_err(|source| {
        let path = if source.loc().is_dummy() {
            options.top_file.clone()
        } else {
            scope.source_db().get_file(source.loc().file).path.clone()
        };
        BuildError::Parse { path, source }
    })?;
    profile(&sink, options, "parsing", started);

    let deps = scope.source_db().paths();
    if docs.is_empty() {
        sink.emit(Diagnostic::warning(
            W100,
            ORIGIN,
            format!("no documents found in `{}`", options.top_file.display()),
        ));
        return Ok(BuildOutput {
            project: None,
            violations: Vec::new(),
            report: sink.take_all(),
            deps,
        });
    }

    // Stage 4: validation, aggregated across every record
    let started = Instant::now();
    let findings = validate_documents(&docs);
    let errors = findings
        .iter()
        .filter(|d| d.severity == keel_diagnostics::Severity::Error)
        .count();
    for finding in findings {
        sink.emit(finding);
    }
    if errors > 0 {
        return Err(BuildError::Validation {
            errors,
            report: sink.take_all(),
        });
    }
    profile(&sink, options, "validation", started);

    // Stage 5: build the elaboration scope, injecting the intrinsic clock
    // and reset types unless the input declares its own
    let started = Instant::now();
    let mut elab_scope = ElabScope::new();
    for doc in &docs {
        elab_scope.add_document(doc, &sink);
    }
    for (name, signal) in [("clock", "clk"), ("reset", "rst")] {
        if elab_scope.get_his(name).is_none() {
            elab_scope.add_document(&intrinsic_his(name, signal), &sink);
        }
    }

    let registers = build_register_lookup(&docs, &scope);

    // Stage 6: elaborate the top file's own documents
    let top_file_id = scope.file_id(&top_name).expect("top file was loaded");
    let top_docs: Vec<Doc> = docs
        .iter()
        .filter(|doc| doc.loc().file == top_file_id)
        .cloned()
        .collect();
    let project_id = options
        .top_file
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("design")
        .to_string();
    let mut project = Project::new(project_id);
    project.path = Some(options.top_file.clone());
    elaborate(
        &top_docs,
        &elab_scope,
        &registers,
        &mut project,
        &sink,
        options.max_depth,
    )?;
    profile(&sink, options, "elaboration", started);

    // Stage 7: optional rule checking with waivers
    let mut violations = Vec::new();
    if options.run_checks {
        let started = Instant::now();
        let mut waivers = WaiverSet::new();
        for path in &options.waivers {
            let loaded = waivers.load_file(path)?;
            sink.emit(Diagnostic::info(
                I100,
                ORIGIN,
                format!("loaded {loaded} waiver(s) from `{}`", path.display()),
            ));
        }
        let registry = CheckRegistry::with_builtins();
        match registry.run(&project, &waivers, &sink) {
            Ok(found) => violations = found,
            Err(critical) => {
                profile(&sink, options, "checking", started);
                return Ok(BuildOutput {
                    project: None,
                    violations: vec![critical.violation],
                    report: sink.take_all(),
                    deps,
                });
            }
        }
        profile(&sink, options, "checking", started);
    }

    Ok(BuildOutput {
        project: Some(project),
        violations,
        report: sink.take_all(),
        deps,
    })
}

fn profile(sink: &DiagnosticSink, options: &BuildOptions, stage: &str, started: Instant) {
    if options.profile {
        sink.emit(Diagnostic::info(
            I101,
            "project.profile",
            format!("{stage} took {:.2?}", started.elapsed()),
        ));
    }
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()?;
    entries.sort();
    for path in entries {
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            out.push(path);
        }
    }
    Ok(())
}

/// Builds the per-module register lookup: a module whose source file
/// `#include`s a file holding a `!Config` (or bare `!Group`s) gets that
/// register description attached during elaboration.
fn build_register_lookup(docs: &[Doc], scope: &Scope) -> RegisterLookup {
    let mut by_file: IndexMap<FileId, Vec<usize>> = IndexMap::new();
    for (index, doc) in docs.iter().enumerate() {
        by_file.entry(doc.loc().file).or_default().push(index);
    }

    let mut lookup = RegisterLookup::new();
    for doc in docs {
        let Doc::Mod(module) = doc else {
            continue;
        };
        let file_id = module.common.loc.file;
        if file_id == Loc::DUMMY.file {
            continue;
        }
        let file_name = scope.source_db().get_file(file_id).name().to_string();
        for include in scope.includes_of(&file_name) {
            let Some(inc_id) = scope.file_id(include) else {
                continue;
            };
            let Some(indices) = by_file.get(&inc_id) else {
                continue;
            };
            let mut config = None;
            let mut groups = Vec::new();
            let mut overrides = Vec::new();
            for &index in indices {
                match &docs[index] {
                    Doc::Config(found) if config.is_none() => config = Some(found.clone()),
                    Doc::Group(group) if !group.group_type.eq_ignore_ascii_case("macro") => {
                        groups.push(group.common.name.clone());
                    }
                    Doc::Define(define) => overrides.push(define.clone()),
                    _ => {}
                }
            }
            if config.is_none() && groups.is_empty() {
                continue;
            }
            let config = config.unwrap_or_else(|| synthesize_config(groups.into_iter()));
            lookup.insert(
                module.common.name.to_ascii_lowercase(),
                RegisterSource { config, overrides },
            );
            break;
        }
    }
    lookup
}

/// Constructs an intrinsic single-signal interconnect type.
fn intrinsic_his(name: &str, signal: &str) -> Doc {
    Doc::His(His {
        common: TagCommon::assemble(
            name.to_string(),
            format!("Intrinsic {name} distribution net"),
            String::new(),
            vec!["BOOL".to_string()],
            Loc::DUMMY,
        ),
        role: "master".to_string(),
        ports: vec![HisPort::Port(PortDecl {
            common: TagCommon::assemble(
                signal.to_string(),
                String::new(),
                String::new(),
                Vec::new(),
                Loc::DUMMY,
            ),
            width: "1".to_string(),
            count: "1".to_string(),
            default: "0".to_string(),
            role: "master".to_string(),
            enums: Vec::new(),
        })],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::Value;
    use keel_design::NodeRef;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn build(dir: &TempDir, top: &str) -> BuildOutput {
        let mut options = BuildOptions::new(dir.path().join(top));
        options.includes = vec![dir.path().to_path_buf()];
        build_project(&options).expect("pipeline should succeed")
    }

    #[test]
    fn minimal_module_pipeline() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "- !Mod\n  name: soc\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let output = build(&dir, "top.yaml");
        let project = output.project.expect("project built");
        assert_eq!(project.id, "top");
        assert!(project
            .principal_nodes()
            .any(|(name, node)| name == "soc" && matches!(node, NodeRef::Block(_))));
        assert!(output.violations.is_empty());
        assert!(output.deps.iter().any(|p| p.ends_with("top.yaml")));
    }

    #[test]
    fn preprocessor_values_reach_the_graph() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "#define LANES 4\n- !His\n  name: bus\n  ports:\n  - !Port [data, LANES * 8]\n",
        );
        let output = build(&dir, "top.yaml");
        let project = output.project.unwrap();
        let id = project.interconnect_by_name("bus").unwrap();
        assert!(matches!(
            project.interconnects[id].components[0].kind,
            keel_design::ComponentKind::Simple { width: 32, .. }
        ));
    }

    #[test]
    fn driver_defines_override_nothing_but_bind() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "#ifdef FAST\n- !Def [MODE, 2]\n#else\n- !Def [MODE, 1]\n#endif\n",
        );
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.defines = vec![("FAST".to_string(), Value::Bool(true))];
        let output = build_project(&options).unwrap();
        let project = output.project.unwrap();
        assert_eq!(project.defines.values().next().unwrap().value, 2);
    }

    #[test]
    fn included_registers_attach_to_module() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "leaf_regs.yaml",
            "- !Group\n  name: ctrl\n  regs:\n  - !Reg\n    name: status\n    fields:\n    - !Field [ready, 1]\n",
        );
        write(
            &dir,
            "top.yaml",
            "#include \"leaf_regs.yaml\"\n- !Mod\n  name: leaf\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let output = build(&dir, "top.yaml");
        let project = output.project.unwrap();
        let block = project.principal_blocks()[0];
        assert_eq!(project.blocks[block].registers.len(), 1);
        let group = &project.groups[project.blocks[block].registers[0]];
        assert_eq!(group.name, "ctrl");
        assert_eq!(group.registers.len(), 1);
    }

    #[test]
    fn register_overlap_is_fatal() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "regs.yaml",
            "- !Group\n  name: bad\n  options: [BYTE]\n  regs:\n  - !Reg [a, 0]\n  - !Reg [b, 2]\n",
        );
        write(
            &dir,
            "top.yaml",
            "#include \"regs.yaml\"\n- !Mod\n  name: leaf\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.includes = vec![dir.path().to_path_buf()];
        let err = build_project(&options).unwrap_err();
        assert!(matches!(
            err,
            BuildError::Elaborate(ElabError::AddressOverlap { .. })
        ));
    }

    #[test]
    fn validation_errors_abort_with_aggregate() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "- !Group\n  name: g\n  regs:\n  - !Reg\n    name: r\n    blockaccess: BOGUS\n    location: attic\n",
        );
        let options = BuildOptions::new(dir.path().join("top.yaml"));
        let err = build_project(&options).unwrap_err();
        let BuildError::Validation { errors, report } = err else {
            panic!("expected validation failure");
        };
        assert_eq!(errors, 2);
        assert!(!report.is_empty());
    }

    fn aperture_design(dir: &TempDir) {
        write(
            dir,
            "bus_if.yaml",
            "- !His\n  name: bus_if\n  ports:\n  - !Port [sel]\n",
        );
        write(
            dir,
            "xbar.yaml",
            "- !Mod\n  name: xbar_mod\n  options: [NO_CLK_RST, IMP]\n  ports:\n  - !HisRef [s0, bus_if, \"\", 1, Slave]\n  - !HisRef [t0, bus_if, \"\", 1, Master]\n  addressmap:\n  - !Initiator\n    port: !Point [s0]\n    mask: 0xFFFF\n  - !Target\n    port: !Point [t0]\n    aperture: 0x20\n",
        );
        write(
            dir,
            "leaf_regs.yaml",
            "- !Group\n  name: regs\n  options: [BYTE]\n  regs:\n  - !Reg [scratch, 0x1C, 2]\n",
        );
        write(
            dir,
            "leaf.yaml",
            "#include \"leaf_regs.yaml\"\n- !Mod\n  name: leaf_mod\n  options: [NO_CLK_RST]\n  ports:\n  - !HisRef [cfg, bus_if, \"\", 1, Slave]\n",
        );
        write(
            dir,
            "top.yaml",
            "#include \"bus_if.yaml\"\n#include \"xbar.yaml\"\n#include \"leaf.yaml\"\n- !Mod\n  name: soc\n  options: [NO_CLK_RST]\n  ports:\n  - !HisRef [cfg, bus_if, \"\", 1, Slave]\n  modules:\n  - !ModInst [xbar, xbar_mod]\n  - !ModInst [mem, leaf_mod]\n  connections:\n  - !Connect\n    points:\n    - !Point [cfg]\n    - !Point [s0, xbar]\n  - !Connect\n    points:\n    - !Point [t0, xbar]\n    - !Point [cfg, mem]\n",
        );
    }

    #[test]
    fn aperture_reachability_flags_overflowing_register() {
        let dir = TempDir::new().unwrap();
        aperture_design(&dir);
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.includes = vec![dir.path().to_path_buf()];
        options.run_checks = true;
        let output = build_project(&options).unwrap();
        assert!(output.project.is_some());
        assert_eq!(output.violations.len(), 1);
        // scratch_1 ends at 0x24, past the 0x20-byte aperture
        assert!(output.violations[0].message.contains("scratch_1"));
    }

    #[test]
    fn waiver_downgrades_known_violation() {
        let dir = TempDir::new().unwrap();
        aperture_design(&dir);
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.includes = vec![dir.path().to_path_buf()];
        options.run_checks = true;
        let first = build_project(&options).unwrap();
        assert_eq!(first.violations.len(), 1);

        let waiver_path = dir.path().join("known.waivers");
        fs::write(
            &waiver_path,
            format!("{} # accepted aperture gap\n", first.violations[0].id()),
        )
        .unwrap();
        options.waivers = vec![waiver_path];
        let second = build_project(&options).unwrap();
        assert!(second.violations.is_empty());
        assert!(second
            .report
            .iter()
            .any(|d| d.message.contains("waived violation")));
    }

    #[test]
    fn shallow_elaboration_limits_depth() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "- !Mod\n  name: inner\n  ports: []\n- !Mod\n  name: top_mod\n  ports: []\n  modules:\n  - !ModInst [u0, inner]\n",
        );
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.max_depth = Some(1);
        let output = build_project(&options).unwrap();
        let project = output.project.unwrap();
        let top = project
            .principal_blocks()
            .into_iter()
            .find(|&b| project.blocks[b].block_type == "top_mod")
            .unwrap();
        let child = project.blocks[top].children[0];
        assert!(project.blocks[child].children.is_empty());
    }

    #[test]
    fn empty_top_file_returns_no_project() {
        let dir = TempDir::new().unwrap();
        write(&dir, "top.yaml", "# nothing but comments\n");
        let options = BuildOptions::new(dir.path().join("top.yaml"));
        let output = build_project(&options).unwrap();
        assert!(output.project.is_none());
        assert!(output.violations.is_empty());
        assert!(output.report.iter().any(|d| d.code == W100));
    }

    #[test]
    fn deps_list_every_opened_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "extra.yaml", "- !Def [X, 1]\n");
        write(&dir, "never_used.yaml", "- !Def [Y, 2]\n");
        write(
            &dir,
            "top.yaml",
            "#include \"extra.yaml\"\n- !Mod\n  name: soc\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let output = build(&dir, "top.yaml");
        assert!(output.deps.iter().any(|p| p.ends_with("extra.yaml")));
        assert!(output.deps.iter().any(|p| p.ends_with("top.yaml")));
        // Lazy evaluation never opened the unreferenced file
        assert!(!output.deps.iter().any(|p| p.ends_with("never_used.yaml")));
    }

    #[test]
    fn quiet_suppresses_progress() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "- !Mod\n  name: soc\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.quiet = true;
        let output = build_project(&options).unwrap();
        assert!(output
            .report
            .iter()
            .all(|d| d.severity >= keel_diagnostics::Severity::Warning));
    }

    #[test]
    fn profile_reports_stage_timings() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "- !Mod\n  name: soc\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let mut options = BuildOptions::new(dir.path().join("top.yaml"));
        options.profile = true;
        let output = build_project(&options).unwrap();
        assert!(output.report.iter().any(|d| d.code == I101));
    }

    #[test]
    fn project_serializes_to_json() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "top.yaml",
            "- !Mod\n  name: soc\n  options: [NO_CLK_RST]\n  ports: []\n",
        );
        let output = build(&dir, "top.yaml");
        let json = output.project.unwrap().to_json();
        assert!(json.get("blocks").is_some());
        assert_eq!(json.get("id").and_then(|v| v.as_str()), Some("top"));
    }
}
