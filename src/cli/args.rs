//! CLI argument parsing using clap.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use clap_complete::Shell;
use std::path::PathBuf;

fn help_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Cyan.on_default() | Effects::DIMMED)
}

/// Configuration blender
#[derive(Parser)]
#[command(
    name = "confb",
    version = env!("CARGO_PKG_VERSION"),
    about = "Stitch configuration fragments into deterministic outputs",
    long_about = "confb builds configuration outputs from one or more source files.\n\n\
        Supported formats:\n\
          - KDL: merge selected sections, key policy (first_wins|last_wins|append)\n\
          - YAML/JSON/TOML: maps (deep|replace), arrays (append|unique_append|replace)\n\
          - INI: repeated_keys (append|last_wins)\n\
          - RAW: newline-normalized concatenation",
    styles = help_styles()
)]
pub struct Cli {
    /// Path to the confb configuration file
    #[arg(short, long, global = true, env = "CONFB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Change working directory before reading the configuration
    #[arg(short = 'C', long, global = true, value_name = "DIR")]
    pub chdir: Option<PathBuf>,

    /// Reduce log output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Increase log output (debug)
    #[arg(long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Build all targets once (no watch)
    #[command(
        about = "Build all targets once (no watch)",
        long_about = "Build reads the configuration file, resolves sources (globs, tilde, \
            dedupe), merges or concatenates them per target, and writes outputs atomically.",
        after_help = "Examples:\n  confb build\n  confb build --dry-run --trace\n  confb build --output-override web=/tmp/web.yaml"
    )]
    Build {
        /// Validate and plan only; do not write outputs
        #[arg(long)]
        dry_run: bool,

        /// Print resolved base dir, config path, and per-target plan
        #[arg(long)]
        trace: bool,

        /// Prepend a comment header (sources, hashes, merge rules) where the
        /// format supports comments
        #[arg(long)]
        annotate: bool,

        /// Redirect a single target's output (repeatable)
        #[arg(long, value_name = "TARGET=PATH")]
        output_override: Vec<String>,
    },

    /// Run as a daemon: watch sources and rebuild on change
    #[command(about = "Watch source files and rebuild outputs on change")]
    Run {
        /// Debounce interval for rebuilds (milliseconds)
        #[arg(long, default_value = "200", value_name = "MS")]
        debounce_ms: u64,
    },

    /// Validate the configuration (no build, no writes)
    #[command(about = "Validate the configuration file")]
    Validate {
        /// List targets after validation
        #[arg(long)]
        list: bool,

        /// Print resolved base dir and config path
        #[arg(long)]
        trace: bool,
    },

    /// Signal a running daemon to reload its configuration
    #[command(
        about = "Send SIGHUP to a running confb daemon",
        long_about = "Reload locates a running daemon through its pidfile and sends SIGHUP.\n\n\
            Search order when --pid-file is not given:\n  \
            1) ~/.cache/confb/confb.pid\n  \
            2) /run/user/<uid>/confb/confb.pid\n  \
            3) /var/run/confb.pid"
    )]
    Reload {
        /// Explicit pidfile path
        #[arg(long, value_name = "PATH")]
        pid_file: Option<PathBuf>,
    },

    /// Generate shell completions
    #[command(about = "Write a completion script to stdout")]
    Completions {
        /// Shell to generate for
        #[arg(value_enum)]
        shell: Shell,
    },
}
