use clap::Parser;

use confb::cli::{commands, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    confb::logging::init(cli.quiet, cli.verbose);

    if let Some(dir) = &cli.chdir {
        if let Err(e) = std::env::set_current_dir(dir) {
            eprintln!("confb: unable to chdir to {}: {e}", dir.display());
            std::process::exit(1);
        }
    }

    let config_path = commands::config_path(cli.config.as_ref());

    let result = match cli.command {
        Commands::Build {
            dry_run,
            trace,
            annotate,
            output_override,
        } => commands::build::execute(&config_path, dry_run, trace, annotate, &output_override),

        Commands::Run { debounce_ms } => commands::run::execute(&config_path, debounce_ms).await,

        Commands::Validate { list, trace } => {
            commands::validate::execute(&config_path, list, trace)
        }

        Commands::Reload { pid_file } => commands::reload::execute(pid_file.as_deref()),

        Commands::Completions { shell } => {
            commands::completions::execute(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("confb: error: {e}");
        std::process::exit(1);
    }
}
