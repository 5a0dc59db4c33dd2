//! CLI definitions using clap derive API
//!
//! Argument types live in one submodule per command family:
//! - plan: plan, groups and waves arguments
//! - manifest: manifest command arguments
//! - completions: completions command arguments

use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand};

pub mod completions;
pub mod manifest;
pub mod plan;

pub use completions::CompletionsArgs;
pub use manifest::ManifestArgs;
pub use plan::{GroupsArgs, OutputFormat, PlanArgs, WavesArgs};

/// dexgraph - dex partitioning planner for Android apps
#[derive(Parser, Debug)]
#[command(
    name = "dexgraph",
    author,
    version,
    styles = Styles::styled()
        .header(AnsiColor::Green.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Cyan.on_default()),
    about = "Module-aware dex partitioning and packaging graph planner",
    long_about = "dexgraph reads an app description and plans how compiled code is dexed, \
                  grouped per module and merged into the dex files of an APK or AAB. \
                  It emits the action graph a build engine executes; it runs no tools itself.",
    after_help = "\x1b[1m\x1b[32mExamples:\x1b[0m\n   \
                  dexgraph plan app.yaml                    \x1b[90m# Summarize the plan\x1b[0m\n   \
                  dexgraph plan app.yaml --format json      \x1b[90m# Full plan as JSON\x1b[0m\n   \
                  dexgraph groups app.yaml                  \x1b[90m# Show dex merge groups\x1b[0m\n   \
                  dexgraph waves app.yaml                   \x1b[90m# Show parallel execution waves\x1b[0m\n   \
                  dexgraph manifest app.yaml --out-dir out  \x1b[90m# Write the dex metadata manifest\x1b[0m\n\n\
                  \x1b[1m\x1b[32mLogging:\x1b[0m\n   \
                  Set DEXGRAPH_LOG (e.g. DEXGRAPH_LOG=dexgraph=trace) to override -v"
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan the dex action graph of an app
    Plan(PlanArgs),

    /// Show the dex merge groups of an app
    Groups(GroupsArgs),

    /// Show the action graph as waves of independent actions
    Waves(WavesArgs),

    /// Render or verify the dex metadata manifest
    Manifest(ManifestArgs),

    /// Show version information
    #[command(hide = true)]
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}
