//! The shell that drives a [`Session`] (`spec.md` §6.4's execution host
//! CLI): commands are strictly serialized — `run`, `stop`, `step`,
//! `status`, `dump`, `reset`, `exit` — whether read from an interactive
//! REPL or a script file.

use std::io::{BufRead, Write};

use crate::error::RuntimeError;
use crate::regmap::ControllerState;
use crate::session::Session;

/// One shell command, parsed from a line of input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShellCommand {
    /// Run until frozen/finished, or for `N` cycles if given.
    Run { cycles: Option<u64> },
    /// Stop a running emulation without resetting it.
    Stop,
    /// Run for exactly `N` cycles (0 if omitted — a no-op round trip used
    /// by the scan-restore scenario to settle the controller without
    /// advancing time).
    Step { cycles: u64 },
    /// Report controller state, cycle count, and finish code.
    Status,
    /// Capture the scan chain and print it as a hex image.
    Dump,
    /// Reset the controller.
    Reset,
    /// Leave the shell.
    Exit,
}

/// The outcome of one command, for the REPL/script loop to render.
#[derive(Debug)]
pub enum CommandOutcome {
    /// Plain text to print.
    Output(String),
    /// The shell should exit with this code.
    Exit(i32),
}

/// Parses one line of shell input. Blank lines and `#`-prefixed lines are
/// not commands; callers should skip them before calling this.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let (cmd, args) = parts.split_first().ok_or("empty command")?;
    match *cmd {
        "run" => Ok(ShellCommand::Run { cycles: parse_optional_u64(args)? }),
        "stop" => Ok(ShellCommand::Stop),
        "step" => Ok(ShellCommand::Step { cycles: parse_optional_u64(args)?.unwrap_or(0) }),
        "status" => Ok(ShellCommand::Status),
        "dump" => Ok(ShellCommand::Dump),
        "reset" => Ok(ShellCommand::Reset),
        "exit" | "quit" => Ok(ShellCommand::Exit),
        other => Err(format!("unknown command: '{other}'")),
    }
}

fn parse_optional_u64(args: &[&str]) -> Result<Option<u64>, String> {
    match args {
        [] => Ok(None),
        [n] => n.parse().map(Some).map_err(|_| format!("not a cycle count: '{n}'")),
        _ => Err("too many arguments".to_string()),
    }
}

/// Executes one command against `session`, producing the text the shell
/// prints.
pub fn execute(session: &mut Session, cmd: &ShellCommand) -> Result<CommandOutcome, RuntimeError> {
    match cmd {
        ShellCommand::Run { cycles } => {
            let report = session.run(*cycles)?;
            Ok(CommandOutcome::Output(format_run_report(&report)))
        }
        ShellCommand::Stop => {
            session.stop()?;
            Ok(CommandOutcome::Output("stopped".to_string()))
        }
        ShellCommand::Step { cycles } => {
            let report = session.run(Some(*cycles))?;
            Ok(CommandOutcome::Output(format_run_report(&report)))
        }
        ShellCommand::Status => {
            let status = session.status()?;
            Ok(CommandOutcome::Output(format!(
                "state={} cycle={} finish_code={} dpi_funcs={}",
                format_state(status.state),
                status.cycle,
                status.finish_code,
                status.n_dpi_funcs
            )))
        }
        ShellCommand::Dump => {
            let image = session.dump()?;
            Ok(CommandOutcome::Output(hex_encode(&image)))
        }
        ShellCommand::Reset => {
            session.reset()?;
            Ok(CommandOutcome::Output("reset".to_string()))
        }
        ShellCommand::Exit => Ok(CommandOutcome::Exit(0)),
    }
}

fn format_run_report(report: &crate::session::RunReport) -> String {
    let mut out = String::new();
    for call in &report.serviced {
        out.push_str(&format!("[dpi] fn {} -> {}\n", call.func_id, call.result));
    }
    if let Some(status) = report.status {
        out.push_str(&format!("state={} cycle={} finish_code={}", format_state(status.state), status.cycle, status.finish_code));
    }
    out
}

fn format_state(state: ControllerState) -> &'static str {
    match state {
        ControllerState::Idle => "idle",
        ControllerState::Running => "running",
        ControllerState::Frozen => "frozen",
        ControllerState::Error => "error",
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Runs the interactive REPL, reading from `input` and writing to
/// `output`. `-f SCRIPT` mode uses [`run_script`] instead, which shares
/// this same [`execute`] but exits non-zero on the first error rather
/// than reporting and continuing.
pub fn run_repl<R: BufRead, W: Write>(session: &mut Session, input: &mut R, output: &mut W) -> Result<i32, RuntimeError> {
    let mut history: Vec<String> = Vec::new();
    let mut line = String::new();
    loop {
        write!(output, "loom> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(0);
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        history.push(trimmed.to_string());

        match parse_command(trimmed) {
            Ok(cmd) => match execute(session, &cmd) {
                Ok(CommandOutcome::Output(text)) => {
                    if !text.is_empty() {
                        writeln!(output, "{text}")?;
                    }
                }
                Ok(CommandOutcome::Exit(code)) => return Ok(code),
                Err(err) => writeln!(output, "error: {err}")?,
            },
            Err(msg) => writeln!(output, "error: {msg}")?,
        }
    }
}

/// Runs every command in `script`, in order, stopping at the first error
/// (`spec.md` §6.4: "Exit 0 on clean finish; non-zero if the simulation
/// died or an error surfaced"). Lines starting with `#` are comments.
pub fn run_script<W: Write>(session: &mut Session, script: &str, output: &mut W) -> Result<i32, RuntimeError> {
    for line in script.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let cmd = match parse_command(trimmed) {
            Ok(cmd) => cmd,
            Err(msg) => {
                writeln!(output, "error: {msg}")?;
                return Ok(1);
            }
        };
        match execute(session, &cmd) {
            Ok(CommandOutcome::Output(text)) => {
                if !text.is_empty() {
                    writeln!(output, "{text}")?;
                }
            }
            Ok(CommandOutcome::Exit(code)) => return Ok(code),
            Err(err) => {
                writeln!(output, "error: {err}")?;
                return Ok(1);
            }
        }
    }
    Ok(0)
}
