//! The check registry and run loop.

use crate::checks::register_builtin_checks;
use crate::violation::{CriticalViolation, RuleViolation};
use crate::waivers::WaiverSet;
use keel_design::Project;
use keel_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};

/// Checker diagnostic: violation raised.
pub const E701: DiagnosticCode = DiagnosticCode::new(Category::Error, 701);
/// Checker diagnostic: violation waived.
pub const W701: DiagnosticCode = DiagnosticCode::new(Category::Warning, 701);
/// Checker diagnostic: check executed.
pub const I701: DiagnosticCode = DiagnosticCode::new(Category::Info, 701);

const ORIGIN: &str = "check";

/// One rule check over the elaborated design.
pub trait Check {
    /// The check's name; used in violation ids, so it must stay stable.
    fn name(&self) -> &str;

    /// One line describing what the check verifies.
    fn description(&self) -> &str;

    /// Runs the check, returning recoverable violations.
    ///
    /// A critical violation aborts the whole checking stage.
    fn run(
        &self,
        project: &Project,
        sink: &DiagnosticSink,
    ) -> Result<Vec<RuleViolation>, CriticalViolation>;
}

/// The registry of checks, populated once at startup.
pub struct CheckRegistry {
    checks: Vec<Box<dyn Check>>,
}

impl CheckRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Creates a registry with every built-in check registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        register_builtin_checks(&mut registry);
        registry
    }

    /// Registers a check.
    pub fn register(&mut self, check: Box<dyn Check>) {
        self.checks.push(check);
    }

    /// Returns the number of registered checks.
    pub fn count(&self) -> usize {
        self.checks.len()
    }

    /// Returns the names of all registered checks.
    pub fn names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Runs every registered check over the project.
    ///
    /// Recoverable violations whose id appears in the waiver set are
    /// downgraded to warnings; the rest are returned. A non-waived critical
    /// violation aborts checking immediately.
    pub fn run(
        &self,
        project: &Project,
        waivers: &WaiverSet,
        sink: &DiagnosticSink,
    ) -> Result<Vec<RuleViolation>, CriticalViolation> {
        let mut violations = Vec::new();
        for check in &self.checks {
            sink.emit(Diagnostic::info(
                I701,
                ORIGIN,
                format!("executing check `{}`", check.name()),
            ));
            match check.run(project, sink) {
                Ok(found) => {
                    for violation in found {
                        let id = violation.id();
                        if waivers.contains(&id) {
                            sink.emit(Diagnostic::warning(
                                W701,
                                ORIGIN,
                                format!(
                                    "waived violation `{id}` from {} on {}::{}",
                                    violation.check, violation.node_kind, violation.node_path
                                ),
                            ));
                        } else {
                            sink.emit(Diagnostic::error(
                                E701,
                                ORIGIN,
                                format!(
                                    "{} raised violation `{id}` on {}::{}: {}",
                                    violation.check,
                                    violation.node_kind,
                                    violation.node_path,
                                    violation.message
                                ),
                            ));
                            violations.push(violation);
                        }
                    }
                }
                Err(critical) => {
                    let id = critical.violation.id();
                    if waivers.contains(&id) {
                        sink.emit(Diagnostic::warning(
                            W701,
                            ORIGIN,
                            format!(
                                "waived critical violation `{id}` from {}",
                                critical.violation.check
                            ),
                        ));
                    } else {
                        sink.emit(Diagnostic::error(
                            E701,
                            ORIGIN,
                            format!("{critical}"),
                        ));
                        return Err(critical);
                    }
                }
            }
        }
        Ok(violations)
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
