//! The `validate` subcommand: load and check the configuration only.

use std::error::Error;
use std::path::Path;

use crate::config;

pub fn execute(config_path: &Path, list: bool, trace: bool) -> Result<(), Box<dyn Error>> {
    let cfg = config::load(config_path)?;

    if trace {
        eprintln!("confb: baseDir = {}", cfg.base_dir.display());
        eprintln!("confb: config = {}", std::path::absolute(config_path)?.display());
    }

    if list {
        for target in &cfg.targets {
            eprintln!(
                "target: {} (format={}, output={})",
                target.name,
                target.format,
                target.output.display()
            );
        }
    }

    eprintln!("confb: validation OK");
    Ok(())
}
