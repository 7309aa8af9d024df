//! `loomc` — the netlist compiler (`spec.md` §6.4): elaborates sources,
//! runs the five-pass pipeline, and emits a synthesizable wrapper plus its
//! artifact documents to `-work DIR`.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use loom_diagnostics::{DiagnosticRenderer, DiagnosticSink, TerminalRenderer};
use loom_pipeline::driver::PipelineConfig;

/// `loomc` — compiles a netlist front-end dump into an emulation-ready
/// SystemVerilog wrapper.
#[derive(Parser, Debug)]
#[command(name = "loomc", version, about = "Loom netlist compiler")]
struct Args {
    /// Top module name.
    #[arg(short = 't', long = "top")]
    top: Option<String>,

    /// Output directory for the emitted wrapper and artifact documents.
    #[arg(short = 'w', long = "work")]
    work: Option<String>,

    /// A file listing additional source paths, one per line.
    #[arg(short = 'f', long = "filelist")]
    filelist: Option<PathBuf>,

    /// Clock port name on the top module.
    #[arg(long = "clk")]
    clk: Option<String>,

    /// Active-low reset port name on the top module.
    #[arg(long = "rst")]
    rst: Option<String>,

    /// Verbose (debug-level) logging.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Input source files.
    sources: Vec<PathBuf>,
}

fn main() {
    let args = Args::parse();
    loom_cli::init_logging(args.verbose);

    let cwd = std::env::current_dir().unwrap_or_default();
    let config = loom_config::discover_config(&cwd).unwrap_or_default();
    let overrides = loom_config::CliOverrides {
        top: args.top.clone(),
        clk: args.clk.clone(),
        rst: args.rst.clone(),
        out_dir: args.work.clone(),
        ..Default::default()
    };
    let resolved = loom_config::resolve(&config, &overrides);

    let Some(top) = resolved.top else {
        eprintln!("error: no top module given (use -top or set project.top in loom.toml)");
        process::exit(1);
    };

    let mut sources = args.sources;
    if let Some(path) = &args.filelist {
        match std::fs::read_to_string(path) {
            Ok(content) => sources.extend(content.lines().map(str::trim).filter(|l| !l.is_empty()).map(PathBuf::from)),
            Err(e) => {
                eprintln!("error: could not read filelist {}: {e}", path.display());
                process::exit(1);
            }
        }
    }
    if sources.is_empty() {
        eprintln!("error: no source files given");
        process::exit(1);
    }

    let pipeline_config = PipelineConfig { clk: resolved.clk, rst: resolved.rst, verbose: args.verbose };
    let diags = DiagnosticSink::new();
    let out_dir = PathBuf::from(resolved.out_dir);
    let interner = loom_common::Interner::new();

    match loom_pipeline::compile_to_dir(&sources, &top, &pipeline_config, &interner, &out_dir, &diags) {
        Ok(output) => {
            report_diagnostics(&diags, &interner);
            if args.verbose {
                log::info!(
                    "wrote {} ({} DPI functions, scan chain {} bits)",
                    out_dir.join("top.sv").display(),
                    output.artifacts.dpi_metadata.as_ref().map(|m| m.functions.len()).unwrap_or(0),
                    output.artifacts.scan_map.as_ref().map(|m| m.chain_length).unwrap_or(0)
                );
            }
            process::exit(0);
        }
        Err(e) => {
            report_diagnostics(&diags, &interner);
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn report_diagnostics(diags: &DiagnosticSink, interner: &loom_common::Interner) {
    let renderer = TerminalRenderer::new(false);
    for diag in diags.diagnostics() {
        eprintln!("{}", renderer.render(&diag, interner));
    }
}
