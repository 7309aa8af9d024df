//! Structured diagnostic messages with severity, codes, labels, and locations.

use crate::code::DiagnosticCode;
use crate::label::Label;
use crate::location::Location;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};

/// A structured diagnostic message anchored to a netlist [`Location`].
///
/// Diagnostics are the primary mechanism for reporting pipeline errors and
/// warnings and host-runtime errors to the user. Each diagnostic includes a
/// severity, a machine-matchable code, a human message, the offending
/// location, and optional secondary labels and notes (`spec.md` §7's
/// "diagnostics contract").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique error code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The primary location where the issue was detected.
    pub location: Location,
    /// Additional annotated locations providing context.
    pub labels: Vec<Label>,
    /// Explanatory footnotes (e.g. "note: ...").
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error diagnostic with the given code, message, and location.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            location,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Creates a new warning diagnostic with the given code, message, and location.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, location: Location) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            location,
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Adds a label to this diagnostic.
    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}
