//! The Keel pipeline driver.
//!
//! [`build_project`] runs the full pipeline — preprocess, parse, validate,
//! elaborate, check — over a top file and its includes, returning the
//! elaborated project, the surviving rule violations, the structured
//! diagnostic report, and the dependency list.

#![warn(missing_docs)]

mod build;
mod options;

pub use build::{build_project, BuildError, BuildOutput};
pub use options::BuildOptions;
