//! Shared primitives for the Keel toolchain.
//!
//! This crate provides the content hash used for waiver identifiers, the
//! interned identifier type used by the preprocessor define environment,
//! the internal-error result type, and the integer/boolean expression
//! engine shared by the preprocessor and the elaborators.

#![warn(missing_docs)]

mod expr;
mod hash;
mod ident;
mod result;

pub use expr::{evaluate, evaluate_int, EvalError, Resolver, Value};
pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use result::{InternalError, KeelResult};
