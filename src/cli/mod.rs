//! Command-line interface: argument parsing and subcommand execution.

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
