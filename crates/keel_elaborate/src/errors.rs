//! Elaboration errors and diagnostic helpers.
//!
//! Fatal failures — unresolved references, layout conflicts, cycles — abort
//! the run as [`ElabError`]s. Non-fatal findings use warning codes
//! `W601`--`W613` through the helpers below.

use keel_common::EvalError;
use keel_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// Duplicate document in scope.
pub const W601: DiagnosticCode = DiagnosticCode::new(Category::Warning, 601);
/// Multiple candidates for an automatic connection.
pub const W603: DiagnosticCode = DiagnosticCode::new(Category::Warning, 603);
/// Port left unconnected after elaboration.
pub const W610: DiagnosticCode = DiagnosticCode::new(Category::Warning, 610);
/// `clk_root`/`rst_root` co-occurring with `AUTO_CLK`/`AUTO_RST` ports.
pub const W611: DiagnosticCode = DiagnosticCode::new(Category::Warning, 611);
/// Register auto-widened to fit its fields.
pub const W612: DiagnosticCode = DiagnosticCode::new(Category::Warning, 612);
/// Enumeration value exceeds the width of its field.
pub const W613: DiagnosticCode = DiagnosticCode::new(Category::Warning, 613);
/// Zero-width field skipped.
pub const W614: DiagnosticCode = DiagnosticCode::new(Category::Warning, 614);

/// Fatal elaboration failures.
#[derive(Debug, thiserror::Error)]
pub enum ElabError {
    /// A name did not resolve to a document of the expected kind.
    #[error("could not resolve {kind} `{name}`")]
    Unresolved {
        /// What kind of document was expected.
        kind: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// A point did not resolve to a port.
    #[error("could not find port `{port}` on block `{block}`")]
    UnknownPoint {
        /// The referenced port name.
        port: String,
        /// The block searched.
        block: String,
    },

    /// Interconnect types reference each other in a cycle.
    #[error("cyclic interconnect definition: {cycle}")]
    CyclicHis {
        /// The members of the cycle, joined with ` -> `.
        cycle: String,
    },

    /// Defines reference each other in a cycle.
    #[error("cyclic define dependency: {cycle}")]
    CyclicDefine {
        /// The members of the cycle, joined with ` -> `.
        cycle: String,
    },

    /// Instructions extend each other in a cycle.
    #[error("cyclic instruction inheritance through `{name}`")]
    CyclicInst {
        /// The instruction re-entered.
        name: String,
    },

    /// Modules extend each other in a cycle.
    #[error("cyclic module inheritance through `{name}`")]
    CyclicMod {
        /// The module re-entered.
        name: String,
    },

    /// Two placed registers occupy intersecting byte ranges.
    #[error(
        "register `{first}` ({first_range}) overlaps register `{second}` ({second_range})"
    )]
    AddressOverlap {
        /// The earlier-placed register.
        first: String,
        /// Its byte range.
        first_range: String,
        /// The later-placed register.
        second: String,
        /// Its byte range.
        second_range: String,
    },

    /// A register's fixed address is unusable.
    #[error("register `{reg}`: {detail}")]
    BadAddress {
        /// The register.
        reg: String,
        /// What is wrong with its address.
        detail: String,
    },

    /// Two fields occupy intersecting bit ranges.
    #[error("field `{reg}.{first}` overlaps field `{reg}.{second}`")]
    FieldOverlap {
        /// The owning register.
        reg: String,
        /// The earlier-placed field.
        first: String,
        /// The later-placed field.
        second: String,
    },

    /// A field attribute set is inconsistent.
    #[error("field `{reg}.{field}`: {detail}")]
    Field {
        /// The owning register.
        reg: String,
        /// The field.
        field: String,
        /// What is inconsistent.
        detail: String,
    },

    /// An access attribute did not survive normalization.
    #[error("register `{reg}` has unusable access value `{value}`")]
    BadAccess {
        /// The register.
        reg: String,
        /// The offending value.
        value: String,
    },

    /// A group was placed through the wrong directive kind.
    #[error("group `{group}`: {detail}")]
    Group {
        /// The group.
        group: String,
        /// What went wrong.
        detail: String,
    },

    /// An explicit connection had an unsupported source/target shape.
    #[error("bad connection: {sources} sources => {targets} targets")]
    BadConnection {
        /// The number of resolved sources.
        sources: usize,
        /// The number of resolved targets.
        targets: usize,
    },

    /// A constant tie was malformed or aimed at a non-primitive port.
    #[error("bad constant tie: {detail}")]
    BadConstant {
        /// What went wrong.
        detail: String,
    },

    /// An address map could not be built.
    #[error("address map of `{block}`: {detail}")]
    Map {
        /// The owning block.
        block: String,
        /// What went wrong.
        detail: String,
    },

    /// An instruction could not be collapsed.
    #[error("instruction `{inst}`: {detail}")]
    Instruction {
        /// The instruction.
        inst: String,
        /// What went wrong.
        detail: String,
    },

    /// An expression failed to evaluate.
    #[error("while evaluating `{context}`: {source}")]
    Expression {
        /// What the expression was for.
        context: String,
        /// The underlying failure.
        #[source]
        source: EvalError,
    },

    /// An internal invariant failed.
    #[error(transparent)]
    Internal(#[from] keel_common::InternalError),
}

/// Creates the duplicate-document warning.
pub fn warn_duplicate_doc(kind: &str, name: &str) -> Diagnostic {
    Diagnostic::warning(
        W601,
        "elaborate.scope",
        format!("{kind} `{name}` already exists in scope; keeping the first definition"),
    )
}

/// Creates the multiple-candidates warning for automatic connection.
pub fn warn_multiple_candidates(target: &str, block: &str) -> Diagnostic {
    Diagnostic::warning(
        W603,
        "elaborate.module",
        format!("multiple candidates for automatic connection to port {target} in block {block}"),
    )
}

/// Creates the unconnected-port warning.
pub fn warn_unconnected(path: &str) -> Diagnostic {
    Diagnostic::warning(
        W610,
        "elaborate.module",
        format!("port unconnected after elaboration: {path}"),
    )
    .with_help("list the port under `defaults` if this is intentional")
}

/// Creates the clk-root/auto-clock co-occurrence warning.
pub fn warn_root_and_auto(block: &str, what: &str) -> Diagnostic {
    Diagnostic::warning(
        W611,
        "elaborate.module",
        format!("block `{block}` nominates both {what}_root and an AUTO_{} port", what.to_uppercase()),
    )
    .with_note("the boundary port stays externally principal; the root only drives distribution")
}

/// Creates the register auto-widen warning.
pub fn warn_auto_widened(reg: &str, from: u32, to: u32) -> Diagnostic {
    Diagnostic::warning(
        W612,
        "elaborate.registers",
        format!("register `{reg}` widened from {from} to {to} bits to fit its fields"),
    )
}

/// Creates the enum-exceeds-width warning.
pub fn warn_enum_width(owner: &str, name: &str, value: i64, width: u32) -> Diagnostic {
    Diagnostic::warning(
        W613,
        "elaborate.registers",
        format!("enumeration `{name}`={value} exceeds the {width}-bit width of `{owner}`"),
    )
}

/// Creates the zero-width-field warning.
pub fn warn_zero_width_field(reg: &str, field: &str) -> Diagnostic {
    Diagnostic::warning(
        W614,
        "elaborate.registers",
        format!("field `{reg}.{field}` has zero width and was skipped"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ElabError::Unresolved {
            kind: "module",
            name: "dma".to_string(),
        };
        assert_eq!(format!("{err}"), "could not resolve module `dma`");

        let err = ElabError::AddressOverlap {
            first: "a".to_string(),
            first_range: "0x0..0x4".to_string(),
            second: "b".to_string(),
            second_range: "0x2..0x6".to_string(),
        };
        let text = format!("{err}");
        assert!(text.contains("`a`"));
        assert!(text.contains("`b`"));
        assert!(text.contains("0x2..0x6"));
    }

    #[test]
    fn warning_helpers() {
        let diag = warn_unconnected("top.dma[irq]");
        assert_eq!(diag.code, W610);
        assert!(diag.message.contains("top.dma[irq]"));

        let diag = warn_auto_widened("ctrl", 32, 40);
        assert_eq!(diag.code, W612);
    }
}
