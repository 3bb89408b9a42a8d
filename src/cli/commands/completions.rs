//! The `completions` subcommand: write a completion script to stdout.

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::args::Cli;

pub fn execute(shell: Shell) {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
}
