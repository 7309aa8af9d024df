//! `loom` — the execution host (`spec.md` §6.4): connects to a running (or
//! freshly-spawned) simulation over the transport, loads the compiler's
//! artifact documents from `-work DIR`, and drives the session through
//! either an interactive REPL or a `-f SCRIPT`.

use std::path::{Path, PathBuf};
use std::process::{self, Child, Command};

use clap::Parser;

use loom_host::dpi_module::DpiModule;
use loom_host::session::Session;
use loom_host::transport::{Transport, UnixTransport};
use loom_passes::artifacts::{DpiMetadata, MemoryMap, ScanMap};

/// `loom` — the emulation execution host.
#[derive(Parser, Debug)]
#[command(name = "loom", version, about = "Loom execution host")]
struct Args {
    /// Directory containing the compiler's artifact documents.
    #[arg(short = 'w', long = "work")]
    work: Option<String>,

    /// Path to the compiled user DPI shared object.
    #[arg(long = "sv_lib")]
    sv_lib: Option<String>,

    /// Path to the Verilator simulation binary to spawn.
    #[arg(long = "sim")]
    sim: Option<String>,

    /// A script of shell commands to run non-interactively.
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// UNIX-domain socket path to connect to.
    #[arg(short = 's', long = "socket")]
    socket: Option<String>,

    /// Connect to an already-running simulation instead of spawning one.
    #[arg(long = "no-sim")]
    no_sim: bool,

    /// Verbose (debug-level) logging.
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    loom_cli::init_logging(args.verbose);

    let cwd = std::env::current_dir().unwrap_or_default();
    let config = loom_config::discover_config(&cwd).unwrap_or_default();
    let overrides = loom_config::CliOverrides {
        out_dir: args.work.clone(),
        sv_lib: args.sv_lib.clone(),
        sim: args.sim.clone(),
        socket: args.socket.clone(),
        no_sim: args.no_sim,
        ..Default::default()
    };
    let resolved = loom_config::resolve(&config, &overrides);
    let work_dir = PathBuf::from(&resolved.out_dir);

    let metadata = match load_artifact::<DpiMetadata>(&work_dir, "dpi_metadata.json") {
        Ok(meta) => meta.unwrap_or_else(|| DpiMetadata {
            functions: vec![],
            mailbox_base: loom_host::regmap::MAILBOX_BASE,
            dpi_base: loom_host::regmap::DPI_BASE,
            func_block_size: loom_host::regmap::FUNC_BLOCK_SIZE,
        }),
        Err(e) => fail(&e.to_string()),
    };
    if let Err(e) = loom_host::regmap::validate_layout(&metadata) {
        fail(&e);
    }
    let scan_map = match load_artifact::<ScanMap>(&work_dir, "scan_map.json") {
        Ok(m) => m,
        Err(e) => fail(&e.to_string()),
    };
    let memory_map = match load_artifact::<MemoryMap>(&work_dir, "memory_map.json") {
        Ok(m) => m,
        Err(e) => fail(&e.to_string()),
    };

    let socket_path = resolved.socket.clone().unwrap_or_else(|| work_dir.join("loom.sock").to_string_lossy().into_owned());

    let mut child: Option<Child> = None;
    if !resolved.no_sim {
        let Some(sim_bin) = &resolved.sim else {
            fail("no simulation binary given (use -sim or set transport.sim in loom.toml, or pass --no-sim)");
        };
        log::info!("spawning simulation {sim_bin}");
        match Command::new(sim_bin).arg("-s").arg(&socket_path).spawn() {
            Ok(c) => child = Some(c),
            Err(e) => fail(&format!("failed to spawn simulation {sim_bin}: {e}")),
        }
    }

    let transport: Box<dyn Transport> = match UnixTransport::connect(Path::new(&socket_path)) {
        Ok(t) => Box::new(t),
        Err(e) => {
            if let Some(mut c) = child {
                let _ = c.kill();
            }
            fail(&format!("failed to connect to {socket_path}: {e}"));
        }
    };

    let dpi: Option<Box<dyn loom_host::dpi_module::Dispatch>> = match &resolved.sv_lib {
        Some(path) => match DpiModule::load(Path::new(path)) {
            Ok(module) => Some(Box::new(module)),
            Err(e) => fail(&format!("failed to load DPI module {path}: {e}")),
        },
        None => None,
    };

    let mut session = Session::new(transport, dpi, metadata, scan_map, memory_map);

    let exit_code = match &args.file {
        Some(script_path) => {
            let script = match std::fs::read_to_string(script_path) {
                Ok(s) => s,
                Err(e) => fail(&format!("could not read script {}: {e}", script_path.display())),
            };
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            loom_host::shell::run_script(&mut session, &script, &mut out)
        }
        None => {
            let stdin = std::io::stdin();
            let mut input = stdin.lock();
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            loom_host::shell::run_repl(&mut session, &mut input, &mut out)
        }
    };

    if let Some(mut c) = child {
        let _ = c.kill();
    }

    match exit_code {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn load_artifact<T: serde::de::DeserializeOwned>(work_dir: &Path, name: &str) -> Result<Option<T>, std::io::Error> {
    let path = work_dir.join(name);
    if !path.is_file() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
}

fn fail(msg: &str) -> ! {
    eprintln!("error: {msg}");
    process::exit(1);
}
