//! Central database of all source files opened during a run.

use crate::file_id::FileId;
use crate::loc::Loc;
use crate::source_file::SourceFile;
use std::io;
use std::path::{Path, PathBuf};

/// The source database, owning all loaded source text.
///
/// Files are registered exactly once; the registration order is stable, and
/// [`SourceDb::paths`] returns every file actually loaded — which is exactly
/// the dependency list the driver reports.
pub struct SourceDb {
    files: Vec<SourceFile>,
}

impl SourceDb {
    /// Creates an empty source database.
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Loads a source file from the filesystem and returns its [`FileId`].
    pub fn load_file(&mut self, path: &Path) -> Result<FileId, io::Error> {
        let content = std::fs::read_to_string(path)?;
        Ok(self.add_source(path.to_path_buf(), content))
    }

    /// Adds a source file from an in-memory string (useful for tests).
    ///
    /// The `name` parameter is used as the file path in diagnostics.
    pub fn add_source(&mut self, name: impl Into<PathBuf>, content: String) -> FileId {
        let id = FileId::from_raw(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content));
        id
    }

    /// Returns the [`SourceFile`] for the given [`FileId`].
    ///
    /// # Panics
    ///
    /// Panics if the `FileId` is invalid.
    pub fn get_file(&self, id: FileId) -> &SourceFile {
        &self.files[id.as_raw() as usize]
    }

    /// Renders a [`Loc`] as `path:line` for messages.
    pub fn describe(&self, loc: Loc) -> String {
        if loc.is_dummy() {
            return "<unknown>".to_string();
        }
        let file = self.get_file(loc.file);
        format!("{}:{}", file.path.display(), loc.line)
    }

    /// Returns the paths of every loaded file, in load order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Returns the number of loaded files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Returns `true` if no files have been loaded.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Default for SourceDb {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_and_get() {
        let mut db = SourceDb::new();
        let id = db.add_source("test.yaml", "hello world".to_string());
        assert_eq!(db.get_file(id).content, "hello world");
    }

    #[test]
    fn describe_loc() {
        let mut db = SourceDb::new();
        let id = db.add_source("test.yaml", "abc\ndef".to_string());
        assert_eq!(db.describe(Loc::new(id, 2)), "test.yaml:2");
        assert_eq!(db.describe(Loc::DUMMY), "<unknown>");
    }

    #[test]
    fn multiple_files() {
        let mut db = SourceDb::new();
        let a = db.add_source("a.yaml", "file one".to_string());
        let b = db.add_source("b.yaml", "file two".to_string());
        assert_ne!(a, b);
        assert_eq!(db.len(), 2);
        assert_eq!(db.paths().len(), 2);
    }

    #[test]
    fn load_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loaded.yaml");
        std::fs::write(&path, "- !Def [X, 1]").unwrap();

        let mut db = SourceDb::new();
        let id = db.load_file(&path).unwrap();
        assert_eq!(db.get_file(id).content, "- !Def [X, 1]");
    }

    #[test]
    fn load_missing_file_errors() {
        let mut db = SourceDb::new();
        assert!(db.load_file(Path::new("/nonexistent/nope.yaml")).is_err());
    }
}
