//! Opaque identifier for a source file.

use serde::{Deserialize, Serialize};

/// Identifies a file registered in the [`SourceDb`](crate::SourceDb).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct FileId(u32);

impl FileId {
    /// A sentinel id used when no source file is available.
    pub const DUMMY: FileId = FileId(u32::MAX);

    /// Creates a `FileId` from a raw `u32` index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw `u32` index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let id = FileId::from_raw(7);
        assert_eq!(id.as_raw(), 7);
    }

    #[test]
    fn dummy_is_distinct() {
        assert_ne!(FileId::DUMMY, FileId::from_raw(0));
    }
}
