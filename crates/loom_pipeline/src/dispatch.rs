//! Generates the DPI dispatch-table C source (`spec.md` §4.4.5, §6.3):
//! one typed wrapper per function, unpacking the 32-bit argument register
//! array into C values, calling the user callback (or the builtin
//! `printf` emitted by `loom_instrument` for `$display`), writing any
//! output-direction arguments back into a caller-supplied buffer, and
//! packing a 64-bit return value back. `loom_host::dpi_module` loads the
//! resulting `loom_dispatch_table` array with a single `dlsym`/
//! `libloading` lookup — the runtime never resolves an individual
//! function by name.

use loom_passes::artifacts::{DpiFunctionRecord, DpiMetadata};

const HEADER: &str = "// Generated by loomc. Do not edit by hand.\n#include <stdint.h>\n#include <stdio.h>\n\ntypedef struct {\n    uint32_t id;\n    const char *name;\n    uint32_t n_args;\n    uint32_t ret_width;\n    uint64_t (*call)(const uint32_t *args, uint32_t *out_args);\n} loom_dpi_entry_t;\n";

/// Emits the full dispatch-table source for `metadata`.
pub fn generate_dispatch_table(metadata: &DpiMetadata) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');

    for func in &metadata.functions {
        emit_wrapper(&mut out, func);
        out.push('\n');
    }

    out.push_str("const loom_dpi_entry_t loom_dispatch_table[] = {\n");
    for func in &metadata.functions {
        out.push_str(&format!(
            "    {{ {}, \"{}\", {}, {}, loom_wrap_{} }},\n",
            func.id,
            func.name,
            func.args.len(),
            func.return_ty.as_ref().map(|r| r.width).unwrap_or(0),
            c_symbol(&func.name)
        ));
    }
    out.push_str("};\n\n");
    out.push_str(&format!("const uint32_t loom_dispatch_table_len = {};\n", metadata.functions.len()));
    out
}

fn emit_wrapper(out: &mut String, func: &DpiFunctionRecord) {
    if func.is_builtin {
        emit_builtin_wrapper(out, func);
    } else {
        emit_user_wrapper(out, func);
    }
}

/// Emits the user callback's `extern` declaration and its wrapper. The
/// callback is declared with the DPI-import's own C-compatible signature;
/// loomc never sees its body, only its name and argument shapes (from
/// `loom_instrument`'s recorded metadata). Output and inout arguments are
/// passed by pointer, matching the SystemVerilog DPI-C calling convention,
/// and their updated values are copied into `out_args` before the wrapper
/// returns.
fn emit_user_wrapper(out: &mut String, func: &DpiFunctionRecord) {
    let c_args: Vec<String> = func
        .args
        .iter()
        .map(|a| {
            let ty = dpi_c_type(&a.ty);
            if a.direction == "input" { format!("{ty} {}", a.name) } else { format!("{ty} *{}", a.name) }
        })
        .collect();
    out.push_str(&format!(
        "extern {} {}({});\n",
        func.return_ty.as_ref().map(|r| dpi_c_type(&r.ty)).unwrap_or("void"),
        func.name,
        c_args.join(", ")
    ));

    let symbol = c_symbol(&func.name);
    out.push_str(&format!("static uint64_t loom_wrap_{symbol}(const uint32_t *args, uint32_t *out_args) {{\n"));

    let out_indices: Vec<usize> = func.args.iter().enumerate().filter(|(_, a)| a.direction != "input").map(|(i, _)| i).collect();
    if out_indices.is_empty() {
        out.push_str("    (void)out_args;\n");
    }

    for (i, arg) in func.args.iter().enumerate() {
        out.push_str(&format!("    {} arg_{} = ({})args[{}];\n", dpi_c_type(&arg.ty), i, dpi_c_type(&arg.ty), i));
    }
    let call_args: Vec<String> = func
        .args
        .iter()
        .enumerate()
        .map(|(i, a)| if a.direction == "input" { format!("arg_{i}") } else { format!("&arg_{i}") })
        .collect();
    match &func.return_ty {
        Some(ret) => out.push_str(&format!("    {} result = {}({});\n", dpi_c_type(&ret.ty), func.name, call_args.join(", "))),
        None => out.push_str(&format!("    {}({});\n", func.name, call_args.join(", "))),
    }

    // Write host-produced output args back before the return value, the
    // same args-then-return ordering `loom_host::service::service_round`
    // uses when it copies them out of this buffer into the register file.
    for (slot, &i) in out_indices.iter().enumerate() {
        out.push_str(&format!("    out_args[{slot}] = (uint32_t)arg_{i};\n"));
    }

    match &func.return_ty {
        Some(_) => out.push_str("    return (uint64_t)result;\n"),
        None => out.push_str("    return 0;\n"),
    }
    out.push_str("}\n");
}

/// Emits a `$display`/`$print` wrapper (`loom_instrument::lower_prints`'s
/// synthesized `is_builtin` calls). There is no user-supplied callback to
/// declare `extern` — the wrapper's body calls `printf` directly with the
/// compile-time format string baked into `args[0]`'s constant value and
/// the remaining hardware arguments. Builtins never have output args.
fn emit_builtin_wrapper(out: &mut String, func: &DpiFunctionRecord) {
    let symbol = c_symbol(&func.name);
    out.push_str(&format!("static uint64_t loom_wrap_{symbol}(const uint32_t *args, uint32_t *out_args) {{\n"));
    out.push_str("    (void)out_args;\n");

    let fmt = func.args.first().and_then(|a| a.value.as_deref()).unwrap_or("");
    let hw_args = func.args.get(1..).unwrap_or(&[]);
    for (i, arg) in hw_args.iter().enumerate() {
        out.push_str(&format!("    {} arg_{} = ({})args[{}];\n", dpi_c_type(&arg.ty), i, dpi_c_type(&arg.ty), i));
    }
    let call_args: String = (0..hw_args.len()).map(|i| format!(", arg_{i}")).collect();
    out.push_str(&format!("    printf(\"{}\"{});\n", escape_c_string(fmt), call_args));
    out.push_str("    return 0;\n");
    out.push_str("}\n");
}

/// Maps a DPI type name (per `loom_ir::signal::DpiType`) to its C
/// equivalent. `string` arguments are compile-time constants baked into
/// the metadata, not passed through the register file, so they never
/// reach a wrapper's argument list.
fn dpi_c_type(ty: &str) -> &'static str {
    match ty {
        "byte" => "int8_t",
        "shortint" => "int16_t",
        "int" => "int32_t",
        "longint" => "int64_t",
        "bit" | "logic" => "uint32_t",
        _ => "uint32_t",
    }
}

/// Sanitizes a DPI function name into a valid C identifier suffix for the
/// generated `loom_wrap_*` symbol. Builtin names like `$__loom_display_0`
/// are not valid C identifiers on their own; user function names are
/// already valid C identifiers and pass through unchanged.
fn c_symbol(name: &str) -> String {
    let mut sanitized: String = name.chars().map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if sanitized.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }
    sanitized
}

/// Escapes a Rust string for embedding as a C string literal body (between
/// the surrounding quotes emitted by the caller).
fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_passes::artifacts::{DpiArgRecord, DpiReturnRecord};

    fn sample_metadata() -> DpiMetadata {
        DpiMetadata {
            functions: vec![DpiFunctionRecord {
                id: 0,
                name: "dpi_add".to_string(),
                base_addr: 0x100,
                return_ty: Some(DpiReturnRecord { ty: "int".to_string(), width: 32 }),
                args: vec![
                    DpiArgRecord { name: "a".to_string(), direction: "input".to_string(), ty: "int".to_string(), width: Some(32), value: None },
                    DpiArgRecord { name: "b".to_string(), direction: "input".to_string(), ty: "int".to_string(), width: Some(32), value: None },
                ],
                is_builtin: false,
            }],
            mailbox_base: 0x0f0,
            dpi_base: 0x100,
            func_block_size: 64,
        }
    }

    fn display_metadata() -> DpiMetadata {
        DpiMetadata {
            functions: vec![DpiFunctionRecord {
                id: 0,
                name: "$__loom_display_0".to_string(),
                base_addr: 0x100,
                return_ty: None,
                args: vec![
                    DpiArgRecord { name: "fmt".to_string(), direction: "input".to_string(), ty: "string".to_string(), width: None, value: Some("val=%d\\n".to_string()) },
                    DpiArgRecord { name: "a0".to_string(), direction: "input".to_string(), ty: "logic".to_string(), width: Some(8), value: None },
                ],
                is_builtin: true,
            }],
            mailbox_base: 0x0f0,
            dpi_base: 0x100,
            func_block_size: 64,
        }
    }

    fn output_arg_metadata() -> DpiMetadata {
        DpiMetadata {
            functions: vec![DpiFunctionRecord {
                id: 0,
                name: "dpi_divmod".to_string(),
                base_addr: 0x100,
                return_ty: Some(DpiReturnRecord { ty: "int".to_string(), width: 32 }),
                args: vec![
                    DpiArgRecord { name: "a".to_string(), direction: "input".to_string(), ty: "int".to_string(), width: Some(32), value: None },
                    DpiArgRecord { name: "rem".to_string(), direction: "output".to_string(), ty: "int".to_string(), width: Some(32), value: None },
                ],
                is_builtin: false,
            }],
            mailbox_base: 0x0f0,
            dpi_base: 0x100,
            func_block_size: 64,
        }
    }

    #[test]
    fn emits_one_wrapper_per_function() {
        let source = generate_dispatch_table(&sample_metadata());
        assert!(source.contains("static uint64_t loom_wrap_dpi_add"));
        assert!(source.contains("extern int32_t dpi_add(int32_t a, int32_t b);"));
    }

    #[test]
    fn emits_const_dispatch_array() {
        let source = generate_dispatch_table(&sample_metadata());
        assert!(source.contains("const loom_dpi_entry_t loom_dispatch_table[]"));
        assert!(source.contains("{ 0, \"dpi_add\", 2, 32, loom_wrap_dpi_add },"));
        assert!(source.contains("const uint32_t loom_dispatch_table_len = 1;"));
    }

    #[test]
    fn void_function_returns_zero() {
        let mut meta = sample_metadata();
        meta.functions[0].return_ty = None;
        let source = generate_dispatch_table(&meta);
        assert!(source.contains("extern void dpi_add"));
        assert!(source.contains("return 0;"));
    }

    #[test]
    fn builtin_display_has_no_extern_and_calls_printf() {
        let source = generate_dispatch_table(&display_metadata());
        assert!(!source.contains("extern"));
        assert!(source.contains("printf(\"val=%d\\n\", arg_0);"));
    }

    #[test]
    fn builtin_display_sanitizes_dollar_prefixed_symbol() {
        let source = generate_dispatch_table(&display_metadata());
        assert!(source.contains("static uint64_t loom_wrap____loom_display_0"));
        assert!(source.contains("loom_wrap____loom_display_0 },"));
        assert!(!source.contains('$'));
    }

    #[test]
    fn builtin_fmt_arg_is_not_unpacked_as_a_hardware_arg() {
        let source = generate_dispatch_table(&display_metadata());
        // only the one hardware varying arg (fmt is the const format string)
        assert!(source.contains("arg_0 = (uint32_t)args[0];"));
        assert!(!source.contains("arg_1"));
    }

    #[test]
    fn output_arg_is_passed_by_pointer_and_written_back() {
        let source = generate_dispatch_table(&output_arg_metadata());
        assert!(source.contains("extern int32_t dpi_divmod(int32_t a, int32_t *rem);"));
        assert!(source.contains("dpi_divmod(arg_0, &arg_1);"));
        assert!(source.contains("out_args[0] = (uint32_t)arg_1;"));
    }

    #[test]
    fn all_input_wrapper_marks_out_args_unused() {
        let source = generate_dispatch_table(&sample_metadata());
        assert!(source.contains("(void)out_args;"));
    }
}
