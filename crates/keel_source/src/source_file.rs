//! A single registered source file.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A source file registered in the [`SourceDb`](crate::SourceDb).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceFile {
    /// This file's id within the database.
    pub id: FileId,
    /// The path the file was loaded from (or a synthetic name for in-memory
    /// sources).
    pub path: PathBuf,
    /// The full text content of the file.
    pub content: String,
}

impl SourceFile {
    /// Creates a new source file record.
    pub fn new(id: FileId, path: PathBuf, content: String) -> Self {
        Self { id, path, content }
    }

    /// Returns the file name component of the path.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>")
    }

    /// Returns the 1-based line at the given index, without its terminator.
    pub fn line(&self, line: u32) -> Option<&str> {
        self.content.lines().nth(line.saturating_sub(1) as usize)
    }

    /// Returns the number of lines in the file.
    pub fn line_count(&self) -> u32 {
        self.content.lines().count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make(content: &str) -> SourceFile {
        SourceFile::new(
            FileId::from_raw(0),
            PathBuf::from("dir/test.yaml"),
            content.to_string(),
        )
    }

    #[test]
    fn name_is_basename() {
        assert_eq!(make("").name(), "test.yaml");
    }

    #[test]
    fn line_lookup() {
        let file = make("first\nsecond\nthird");
        assert_eq!(file.line(1), Some("first"));
        assert_eq!(file.line(3), Some("third"));
        assert_eq!(file.line(4), None);
    }

    #[test]
    fn line_count() {
        assert_eq!(make("a\nb\nc").line_count(), 3);
        assert_eq!(make("").line_count(), 0);
    }
}
