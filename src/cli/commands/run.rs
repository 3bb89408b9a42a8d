//! The `run` subcommand: start the watch daemon.

use std::error::Error;
use std::path::Path;
use std::time::Duration;

use crate::config;
use crate::daemon::{self, pidfile, Options, DEFAULT_DEBOUNCE};

pub async fn execute(config_path: &Path, debounce_ms: u64) -> Result<(), Box<dyn Error>> {
    let cfg = config::load(config_path)?;

    let debounce = if debounce_ms == 0 {
        DEFAULT_DEBOUNCE
    } else {
        Duration::from_millis(debounce_ms)
    };

    // The daemon re-reads this path on SIGHUP, so keep it absolute in case
    // the process later runs with a different working directory.
    let abs_config = std::path::absolute(config_path)?;

    // Best effort; `confb reload` just has nothing to find without it.
    let pid_path = pidfile::write();
    if let Some(path) = &pid_path {
        tracing::debug!("[daemon] pidfile at {}", path.display());
    }

    let result = daemon::run(
        cfg,
        Options {
            debounce,
            config_path: abs_config,
        },
    )
    .await;

    if let Some(path) = pid_path {
        pidfile::remove(&path);
    }
    result?;
    Ok(())
}
