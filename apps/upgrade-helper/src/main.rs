#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! upgrade-helper — the process supervisor for server upgrades
//!
//! Invoked as `upgrade-helper <new-binary-path>` once an upgrade has been
//! applied. Reads the pid the server recorded at startup, terminates that
//! process, and launches the new binary detached with inherited stdio. The
//! reload is best-effort, not transactional: if the old process is already
//! gone the new one is started anyway. Always exits 0 — the parent that
//! spawned this helper is expected to be dead before errors could be
//! observed, so failures are logged, never returned.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(
    name = "upgrade-helper",
    about = "Terminates the running Malt server and starts the new binary"
)]
struct Cli {
    /// The server binary to launch after the old process is gone
    new_binary: PathBuf,

    /// Pid file the server wrote at startup
    #[arg(long, default_value = "pid.tmp")]
    pid_file: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match read_pid(&cli.pid_file) {
        Ok(pid) => match kill_process(pid) {
            Ok(()) => info!(pid, "old server terminated"),
            Err(e) => warn!(pid, error = %e, "could not terminate old server, starting anyway"),
        },
        Err(e) => warn!(pid_file = %cli.pid_file.display(), error = %e, "no usable pid file, starting anyway"),
    }

    match launch(&cli.new_binary) {
        Ok(()) => info!(binary = %cli.new_binary.display(), "new server launched"),
        Err(e) => error!(binary = %cli.new_binary.display(), error = %e, "reload failed"),
    }
}

/// Read the decimal pid from the file's first line
fn read_pid(path: &Path) -> Result<u32, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    parse_pid(&content)
}

fn parse_pid(content: &str) -> Result<u32, String> {
    let line = content.lines().next().unwrap_or("").trim();
    line.parse().map_err(|_| format!("not a pid: {line:?}"))
}

#[cfg(unix)]
fn kill_process(pid: u32) -> std::io::Result<()> {
    #[allow(unsafe_code)]
    let result = unsafe { libc::kill(pid_t(pid), libc::SIGKILL) };
    if result == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(unix)]
#[allow(clippy::cast_possible_wrap)]
fn pid_t(pid: u32) -> libc::pid_t {
    pid as libc::pid_t
}

#[cfg(windows)]
fn kill_process(pid: u32) -> std::io::Result<()> {
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/F"])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!("taskkill exited {status}")))
    }
}

/// Start the new binary detached, inheriting this process's stdio. The
/// helper does not wait for it.
fn launch(binary: &Path) -> std::io::Result<()> {
    Command::new(binary)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .map(|_| ())
}
