//! dexgraph - dex partitioning planner for Android apps
//!
//! Plans how an app's compiled code is dexed, grouped per feature module and
//! merged into the dex files of an APK or AAB.

use clap::Parser;
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

use dexgraph::cli::{Cli, Commands};
use dexgraph::commands;

/// Environment variable holding a `tracing` filter directive
const LOG_ENV: &str = "DEXGRAPH_LOG";

fn init_logging(verbose: bool) {
    let default = if verbose { "dexgraph=debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Groups(args) => commands::groups::run(args),
        Commands::Waves(args) => commands::waves::run(args),
        Commands::Manifest(args) => commands::manifest::run(args),
        Commands::Version => commands::version::run(),
        Commands::Completions(args) => commands::completions::run(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if let Some(help) = e.help() {
            eprintln!("  help: {help}");
        }
        std::process::exit(1);
    }
}
