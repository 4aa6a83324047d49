//! Structured diagnostic messages with severity, code, origin, and location.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use keel_source::Loc;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message.
///
/// Each diagnostic carries a severity, a unique code, an origin category path
/// naming the pipeline stage that produced it (e.g. `elaborate.module`), the
/// message itself, an optional source location, and optional notes and help
/// lines for the renderer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// Origin category path, e.g. `preprocess.file` or `elaborate.registers`.
    pub origin: String,
    /// The main diagnostic message.
    pub message: String,
    /// The source location the message refers to, if known.
    pub loc: Option<Loc>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
    /// Actionable suggestions.
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        code: DiagnosticCode,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code,
            origin: origin.into(),
            message: message.into(),
            loc: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(
        code: DiagnosticCode,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Error, code, origin, message)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(
        code: DiagnosticCode,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Warning, code, origin, message)
    }

    /// Creates a new informational diagnostic.
    pub fn info(
        code: DiagnosticCode,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Info, code, origin, message)
    }

    /// Creates a new debug diagnostic.
    pub fn debug(
        code: DiagnosticCode,
        origin: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(Severity::Debug, code, origin, message)
    }

    /// Attaches a source location.
    pub fn at(mut self, loc: Loc) -> Self {
        self.loc = Some(loc);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;
    use keel_source::FileId;

    #[test]
    fn create_error() {
        let code = DiagnosticCode::new(Category::Error, 301);
        let diag = Diagnostic::error(code, "preprocess.file", "unknown directive");
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "unknown directive");
        assert_eq!(diag.origin, "preprocess.file");
        assert_eq!(format!("{}", diag.code), "E301");
        assert!(diag.loc.is_none());
    }

    #[test]
    fn builder_methods() {
        let code = DiagnosticCode::new(Category::Warning, 611);
        let diag = Diagnostic::warning(code, "elaborate.module", "port unconnected")
            .at(Loc::new(FileId::from_raw(0), 4))
            .with_note("left floating after both inference passes")
            .with_help("list the port under `defaults` to silence this");
        assert_eq!(diag.loc.unwrap().line, 4);
        assert_eq!(diag.notes.len(), 1);
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn severities() {
        let code = DiagnosticCode::new(Category::Info, 100);
        assert_eq!(
            Diagnostic::info(code, "project", "elaborating").severity,
            Severity::Info
        );
        assert_eq!(
            Diagnostic::debug(code, "project", "details").severity,
            Severity::Debug
        );
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Error, 301);
        let diag = Diagnostic::error(code, "preprocess.file", "oops");
        let json = serde_json::to_string(&diag).unwrap();
        let back: Diagnostic = serde_json::from_str(&json).unwrap();
        assert_eq!(back.message, "oops");
        assert_eq!(back.severity, Severity::Error);
    }
}
