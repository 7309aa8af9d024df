//! Diagnostic codes with category prefixes for structured error identification.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic, matching the pipeline error-kind taxonomy of
/// `spec.md` §7: malformed input, unsupported construct, invariant violation,
/// and I/O failure. `Lint` covers non-fatal advisory diagnostics (e.g. a
/// valid-condition trace that fell back to "constant 1").
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Missing attribute, wrong cell shape, or otherwise malformed IR.
    Malformed,
    /// A construct outside the set this pass accepts (e.g. a DPI argument
    /// type Loom does not support, or a non-constant reset value).
    Unsupported,
    /// A downstream invariant would be violated (e.g. a dangling port).
    Invariant,
    /// Failure reading source or writing an emitted artifact.
    Io,
    /// Advisory-only; never blocks the pipeline.
    Lint,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Malformed => 'M',
            Category::Unsupported => 'U',
            Category::Invariant => 'I',
            Category::Io => 'F',
            Category::Lint => 'L',
        }
    }
}

/// A structured diagnostic code combining a category prefix and a numeric identifier.
///
/// Displayed as the category prefix followed by a zero-padded 3-digit number,
/// e.g. `M101`, `I203`, `F001`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_prefixes() {
        assert_eq!(Category::Malformed.prefix(), 'M');
        assert_eq!(Category::Unsupported.prefix(), 'U');
        assert_eq!(Category::Invariant.prefix(), 'I');
        assert_eq!(Category::Io.prefix(), 'F');
        assert_eq!(Category::Lint.prefix(), 'L');
    }

    #[test]
    fn display_format() {
        let code = DiagnosticCode::new(Category::Invariant, 101);
        assert_eq!(format!("{code}"), "I101");

        let code = DiagnosticCode::new(Category::Io, 3);
        assert_eq!(format!("{code}"), "F003");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Unsupported, 101);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
