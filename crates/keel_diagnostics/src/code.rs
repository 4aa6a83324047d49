//! Diagnostic codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category letter of a diagnostic code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Errors (`Exxx`).
    Error,
    /// Warnings (`Wxxx`).
    Warning,
    /// Informational messages (`Ixxx`).
    Info,
}

/// A diagnostic code such as `E301` or `W611`.
///
/// Code ranges are allocated per stage: `3xx` preprocessor, `4xx` parser,
/// `5xx` validator, `6xx` elaborator, `7xx` checker.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category letter.
    pub category: Category,
    /// The number within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.category {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Info => 'I',
        };
        write!(f, "{letter}{}", self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(
            format!("{}", DiagnosticCode::new(Category::Error, 301)),
            "E301"
        );
        assert_eq!(
            format!("{}", DiagnosticCode::new(Category::Warning, 611)),
            "W611"
        );
        assert_eq!(
            format!("{}", DiagnosticCode::new(Category::Info, 100)),
            "I100"
        );
    }

    #[test]
    fn equality() {
        let a = DiagnosticCode::new(Category::Error, 301);
        let b = DiagnosticCode::new(Category::Error, 301);
        let c = DiagnosticCode::new(Category::Warning, 301);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
