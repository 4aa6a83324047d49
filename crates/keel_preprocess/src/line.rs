//! Output lines with source provenance.

use keel_source::Loc;

/// A line of preprocessor output, tagged with the input location it came
/// from so later stages can report against the original file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutLine {
    /// The line text after substitution, without a terminator.
    pub text: String,
    /// The input file and line this text originated at.
    pub loc: Loc,
}

impl OutLine {
    /// Creates a new output line.
    pub fn new(text: impl Into<String>, loc: Loc) -> Self {
        Self {
            text: text.into(),
            loc,
        }
    }
}
