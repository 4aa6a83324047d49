//! Structured diagnostics for the Keel pipeline.
//!
//! Every user-facing message — errors, warnings, progress information —
//! is a [`Diagnostic`] accumulated in a [`DiagnosticSink`]. External tools
//! render the report; the core only records it.

#![warn(missing_docs)]

mod code;
mod diagnostic;
mod severity;
mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use severity::Severity;
pub use sink::DiagnosticSink;
