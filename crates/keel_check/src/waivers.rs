//! Waiver files: hash-indexed suppression of specific rule violations.

use keel_common::ContentHash;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Errors raised while loading waiver files.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// A waiver file could not be read.
    #[error("could not open waiver file `{path}`: {source}")]
    Io {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },
}

/// A set of waived violation ids.
///
/// Waiver files contain one 32-hex-character hash per line; `#` starts a
/// comment and blank lines are ignored. Duplicate hashes are idempotent.
#[derive(Default)]
pub struct WaiverSet {
    hashes: HashSet<ContentHash>,
}

impl WaiverSet {
    /// Creates an empty waiver set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the given violation id is waived.
    pub fn contains(&self, id: &ContentHash) -> bool {
        self.hashes.contains(id)
    }

    /// Adds one waived id.
    pub fn insert(&mut self, id: ContentHash) {
        self.hashes.insert(id);
    }

    /// Returns the number of distinct waived ids.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` if nothing is waived.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Parses waiver text, returning how many hashes were recognized.
    ///
    /// Lines that do not start with a hash are skipped.
    pub fn parse(&mut self, text: &str) -> usize {
        let mut added = 0;
        for line in text.lines() {
            let content = match line.find('#') {
                Some(idx) => &line[..idx],
                None => line,
            };
            let content = content.trim();
            if content.is_empty() {
                continue;
            }
            if let Some(hash) = ContentHash::from_hex(content) {
                self.hashes.insert(hash);
                added += 1;
            }
        }
        added
    }

    /// Loads a waiver file from disk.
    pub fn load_file(&mut self, path: &Path) -> Result<usize, CheckError> {
        let text = std::fs::read_to_string(path).map_err(|source| CheckError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.parse(&text))
    }
}
