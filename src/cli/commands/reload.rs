//! The `reload` subcommand: find a running daemon and send SIGHUP.

use std::error::Error;
use std::path::Path;

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::daemon::pidfile;

pub fn execute(pid_file: Option<&Path>) -> Result<(), Box<dyn Error>> {
    let path = pidfile::find(pid_file).ok_or_else(|| match pid_file {
        Some(p) => format!("specified --pid-file not found: {}", p.display()),
        None => "pidfile not found in default locations".to_string(),
    })?;

    let pid = Pid::from_raw(pidfile::read_pid(&path)?);

    // Signal 0 probes liveness without delivering anything.
    signal::kill(pid, None)
        .map_err(|e| format!("process {pid} not running (from {}): {e}", path.display()))?;

    signal::kill(pid, Signal::SIGHUP)
        .map_err(|e| format!("failed to send SIGHUP to pid {pid}: {e}"))?;

    println!("confb: reload signal sent");
    Ok(())
}
