//! Source file database for the Keel pipeline.
//!
//! Every file the preprocessor or parser touches is registered here once and
//! addressed by an opaque [`FileId`]. Schema records and diagnostics carry a
//! [`Loc`] (file + 1-based line) that resolves back through the database for
//! reporting, and the set of loaded files doubles as the dependency list.

#![warn(missing_docs)]

mod file_id;
mod loc;
mod source_db;
mod source_file;

pub use file_id::FileId;
pub use loc::Loc;
pub use source_db::SourceDb;
pub use source_file::SourceFile;
