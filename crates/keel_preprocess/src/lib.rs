//! Lazy text preprocessor for the Keel pipeline.
//!
//! A [`Scope`] owns a set of named files and a mutable define environment.
//! Files are registered up front but only read and evaluated on first
//! reference; `#include` pulls another file of the same scope into the
//! output in place. Directives (`#define`, `#if`/`#elif`/`#else`/`#endif`,
//! `#ifdef`/`#ifndef`, `#for`/`#endfor`) drive block evaluation, and
//! `<NAME>`, bare define names, and `$(expr)` (inside `#for` bodies) are
//! substituted on output lines.

#![warn(missing_docs)]

mod block;
mod error;
mod line;
mod scope;
mod statement;

pub use block::{IfCond, Item};
pub use error::PreprocessError;
pub use line::OutLine;
pub use scope::{DefineEnv, Scope};
pub use statement::Directive;
