//! Types describing DPI import sites and `$display`-style format strings.
//!
//! These are the typed fields carried by the opaque
//! [`CellKind::DpiCall`](crate::cell::CellKind::DpiCall) and
//! [`CellKind::Print`](crate::cell::CellKind::Print) cell kinds the
//! front-end emits — modeled as real fields rather than an attribute bag,
//! per this codebase's opaque-cell discipline.

use loom_common::Ident;
use serde::{Deserialize, Serialize};

/// The accepted set of DPI-C scalar argument/return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DpiType {
    /// `byte` — 8 bits, signed.
    Byte,
    /// `shortint` — 16 bits, signed.
    Shortint,
    /// `int` — 32 bits, signed.
    Int,
    /// `longint` — 64 bits, signed.
    Longint,
    /// `bit`/`logic` vector of the given width.
    Logic(u32),
    /// `string` — a compile-time constant; never routed through hardware.
    CString,
}

impl DpiType {
    /// Returns the hardware bit width this type occupies, or `None` for
    /// `string` (which carries no hardware signal, only a constant value).
    pub fn hw_width(self) -> Option<u32> {
        match self {
            DpiType::Byte => Some(8),
            DpiType::Shortint => Some(16),
            DpiType::Int => Some(32),
            DpiType::Longint => Some(64),
            DpiType::Logic(w) => Some(w),
            DpiType::CString => None,
        }
    }
}

/// The direction of a DPI function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgDirection {
    /// Value flows from the DUT to the host callback.
    Input,
    /// Value flows from the host callback back to the DUT.
    Output,
    /// Value flows both ways.
    InOut,
}

/// One argument of a DPI import-function declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DpiArgDecl {
    /// The argument name, as declared in the import.
    pub name: Ident,
    /// The argument's DPI type.
    pub ty: DpiType,
    /// The direction of data flow.
    pub direction: ArgDirection,
    /// For `string`-typed arguments, the compile-time constant value (these
    /// are never routed through hardware — `emu_top` does not allocate them
    /// a register).
    pub const_value: Option<String>,
}

/// The base used to render an integer span in a lowered `$print` format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumBase {
    /// Decimal (`%d`).
    Dec,
    /// Hexadecimal (`%x`).
    Hex,
    /// Octal (`%o`).
    Octal,
    /// Binary (`%b`).
    Binary,
}

/// One span of a parsed `$display`/`$print`-style format descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FormatSpan {
    /// A literal run of characters copied verbatim into the reconstructed
    /// C `printf` format string.
    Literal(String),
    /// A `%`-conversion substituting one of the call's varying signals.
    Integer {
        /// Numeric base to render in.
        base: NumBase,
        /// Whether the value is sign-extended before printing.
        signed: bool,
        /// Whether hex digits are rendered upper-case.
        upper_case: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hw_width_of_scalars() {
        assert_eq!(DpiType::Byte.hw_width(), Some(8));
        assert_eq!(DpiType::Int.hw_width(), Some(32));
        assert_eq!(DpiType::Logic(17).hw_width(), Some(17));
        assert_eq!(DpiType::CString.hw_width(), None);
    }

    #[test]
    fn arg_decl_with_string_const() {
        let arg = DpiArgDecl {
            name: Ident::from_raw(1),
            ty: DpiType::CString,
            direction: ArgDirection::Input,
            const_value: Some("val=%0d\n".to_string()),
        };
        assert_eq!(arg.const_value.as_deref(), Some("val=%0d\n"));
    }

    #[test]
    fn format_span_roundtrip() {
        let spans = vec![
            FormatSpan::Literal("val=".to_string()),
            FormatSpan::Integer {
                base: NumBase::Dec,
                signed: false,
                upper_case: false,
            },
            FormatSpan::Literal("\n".to_string()),
        ];
        let json = serde_json::to_string(&spans).unwrap();
        let restored: Vec<FormatSpan> = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, spans);
    }
}
