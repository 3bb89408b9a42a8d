//! Subcommand implementations.

pub mod build;
pub mod completions;
pub mod reload;
pub mod run;
pub mod validate;

use std::path::PathBuf;

/// Resolve the configuration path: `-c`/`CONFB_CONFIG` (handled by clap),
/// then `~/.config/confb/confb.yaml`, then `./confb.yaml` when the home
/// directory is unknown.
pub fn config_path(flag: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = flag {
        return crate::config::expand_tilde(&path.to_string_lossy());
    }
    match dirs::home_dir() {
        Some(home) => home.join(".config/confb/confb.yaml"),
        None => PathBuf::from("confb.yaml"),
    }
}
