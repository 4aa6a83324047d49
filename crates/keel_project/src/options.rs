//! Build options.

use keel_common::Value;
use std::path::PathBuf;

/// Configuration for one [`build_project`](crate::build_project) run.
#[derive(Default)]
pub struct BuildOptions {
    /// The file to start elaboration from.
    pub top_file: PathBuf,
    /// Search path entries: directories (scanned recursively for `.yaml`
    /// files) and explicit file paths.
    pub includes: Vec<PathBuf>,
    /// Initial define environment: integer, boolean, or string bindings.
    pub defines: Vec<(String, Value)>,
    /// Maximum module elaboration depth; `None` is unlimited, `Some(1)`
    /// elaborates children to boundary ports only.
    pub max_depth: Option<u32>,
    /// Whether to invoke the checker after elaboration.
    pub run_checks: bool,
    /// Waiver files for the checking stage.
    pub waivers: Vec<PathBuf>,
    /// Whether to collect per-stage timings into the report.
    pub profile: bool,
    /// Suppress progress (Info/Debug) diagnostics.
    pub quiet: bool,
}

impl BuildOptions {
    /// Creates options for a top file with everything else defaulted.
    pub fn new(top_file: impl Into<PathBuf>) -> Self {
        Self {
            top_file: top_file.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = BuildOptions::new("design/top.yaml");
        assert_eq!(options.top_file, PathBuf::from("design/top.yaml"));
        assert!(options.includes.is_empty());
        assert!(options.max_depth.is_none());
        assert!(!options.run_checks);
        assert!(!options.quiet);
    }
}
