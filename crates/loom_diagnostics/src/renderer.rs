//! Diagnostic rendering backends for human-readable and machine-readable output.

use crate::diagnostic::Diagnostic;
use crate::location::Location;
use loom_common::Interner;

/// Trait for rendering diagnostics into formatted output strings.
///
/// Implementations format diagnostics for different output targets: terminal
/// (human-readable) or a structured form for scripted consumption.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, interner: &Interner) -> String;
}

/// Renders diagnostics in a compiler-style terminal format, e.g.:
/// ```text
/// error[I203]: dangling input after pass `loom_instrument`
///   --> top.loom_dpi_valid
///    = note: every cell port must be driven before the pass completes
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn location_str(&self, location: &Location, interner: &Interner) -> Option<String> {
        match location {
            Location::Global => None,
            Location::Module { module } => Some(interner.resolve(*module).to_string()),
            Location::Cell { module, cell } => Some(format!(
                "{}.{}",
                interner.resolve(*module),
                interner.resolve(*cell)
            )),
            Location::Wire { module, wire } => Some(format!(
                "{}.{}",
                interner.resolve(*module),
                interner.resolve(*wire)
            )),
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, interner: &Interner) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{}[{}]: {}\n",
            diag.severity, diag.code, diag.message
        ));

        if let Some(loc) = self.location_str(&diag.location, interner) {
            out.push_str(&format!("  --> {loc}\n"));
        }

        for label in &diag.labels {
            if let Some(loc) = self.location_str(&label.location, interner) {
                out.push_str(&format!("    {loc}: {}\n", label.message));
            }
        }

        for note in &diag.notes {
            out.push_str(&format!("   = note: {note}\n"));
        }

        out
    }
}
