//! Source locations as (file, line) pairs.

use crate::file_id::FileId;
use serde::{Deserialize, Serialize};

/// A location within a source file.
///
/// The pipeline is line-oriented: the preprocessor substitutes whole lines and
/// the tag reader consumes one line at a time, so a file id plus a 1-based
/// line number identifies everything that needs reporting.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Loc {
    /// The source file this location belongs to.
    pub file: FileId,
    /// The 1-based line number within the file.
    pub line: u32,
}

impl Loc {
    /// A dummy location used when no source position is available.
    pub const DUMMY: Loc = Loc {
        file: FileId::DUMMY,
        line: 0,
    };

    /// Creates a new location.
    pub fn new(file: FileId, line: u32) -> Self {
        Self { file, line }
    }

    /// Returns `true` if this is the dummy location.
    pub fn is_dummy(&self) -> bool {
        self.file == FileId::DUMMY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construct() {
        let loc = Loc::new(FileId::from_raw(0), 12);
        assert_eq!(loc.line, 12);
        assert!(!loc.is_dummy());
    }

    #[test]
    fn dummy() {
        assert!(Loc::DUMMY.is_dummy());
    }

    #[test]
    fn serde_roundtrip() {
        let loc = Loc::new(FileId::from_raw(3), 44);
        let json = serde_json::to_string(&loc).unwrap();
        let back: Loc = serde_json::from_str(&json).unwrap();
        assert_eq!(loc, back);
    }
}
