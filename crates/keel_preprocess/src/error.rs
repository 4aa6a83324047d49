//! Preprocessing errors.

use keel_common::EvalError;
use std::path::PathBuf;

/// Errors raised while loading or evaluating preprocessor files.
///
/// Every variant that originates inside a file carries the path and 1-based
/// line number of the offending input line.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// A directive line could not be parsed.
    #[error("{path}:{line}: bad directive syntax: {detail}")]
    BadSyntax {
        /// File containing the bad line.
        path: PathBuf,
        /// Line number of the bad line.
        line: u32,
        /// What went wrong.
        detail: String,
    },

    /// A `#word` line named a directive that does not exist.
    #[error("{path}:{line}: unknown directive `#{word}`")]
    UnknownDirective {
        /// File containing the directive.
        path: PathBuf,
        /// Line number of the directive.
        line: u32,
        /// The unrecognized directive word.
        word: String,
    },

    /// Block open/close directives did not balance.
    #[error("{path}:{line}: unbalanced `#{directive}`")]
    Nesting {
        /// File containing the directive.
        path: PathBuf,
        /// Line number of the directive.
        line: u32,
        /// The directive that did not balance.
        directive: String,
    },

    /// An expression inside a directive or substitution failed to evaluate.
    #[error("{path}:{line}: {source}")]
    Expression {
        /// File containing the expression.
        path: PathBuf,
        /// Line number of the expression.
        line: u32,
        /// The underlying evaluation failure.
        #[source]
        source: EvalError,
    },

    /// A `#for` iterable did not evaluate to a finite list.
    #[error("{path}:{line}: `#for` iterable is not a finite list")]
    BadIterable {
        /// File containing the loop.
        path: PathBuf,
        /// Line number of the `#for`.
        line: u32,
    },

    /// A registered file could not be read from disk.
    #[error("could not open file `{path}`: {source}")]
    Io {
        /// The file that failed to open.
        path: PathBuf,
        /// The underlying IO failure.
        #[source]
        source: std::io::Error,
    },

    /// An `#include` named a file not registered in the scope.
    #[error("{path}:{line}: cannot resolve include `{name}`")]
    IncludeNotFound {
        /// File containing the include.
        path: PathBuf,
        /// Line number of the include.
        line: u32,
        /// The include name that failed to resolve.
        name: String,
    },

    /// A file included itself, directly or indirectly.
    #[error("{path}:{line}: cyclic include of `{name}`")]
    CyclicInclude {
        /// File containing the include.
        path: PathBuf,
        /// Line number of the include.
        line: u32,
        /// The file being re-entered.
        name: String,
    },

    /// Two registered files share the same name within the scope.
    #[error("file `{name}` already registered in scope (first from `{first}`)")]
    DuplicateFile {
        /// The clashing file name.
        name: String,
        /// Path of the first registration.
        first: PathBuf,
    },

    /// A file was requested that was never registered.
    #[error("file `{name}` is not registered in this scope")]
    UnknownFile {
        /// The requested file name.
        name: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_location() {
        let err = PreprocessError::UnknownDirective {
            path: PathBuf::from("top.yaml"),
            line: 3,
            word: "frobnicate".to_string(),
        };
        assert_eq!(format!("{err}"), "top.yaml:3: unknown directive `#frobnicate`");
    }

    #[test]
    fn display_duplicate_file() {
        let err = PreprocessError::DuplicateFile {
            name: "common.yaml".to_string(),
            first: PathBuf::from("/a/common.yaml"),
        };
        assert!(format!("{err}").contains("already registered"));
    }
}
