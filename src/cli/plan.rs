use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    Json,
    Yaml,
}

/// Arguments for the plan command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Summarize the plan:\n    dexgraph plan app.yaml\n\n\
                  Emit the full plan for a build engine:\n    dexgraph plan app.yaml --format json > plan.json")]
pub struct PlanArgs {
    /// App description file
    pub app: PathBuf,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the groups command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show merge groups and planned dex files:\n    dexgraph groups app.yaml")]
pub struct GroupsArgs {
    /// App description file
    pub app: PathBuf,
}

/// Arguments for the waves command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Show which actions may run in parallel:\n    dexgraph waves app.yaml")]
pub struct WavesArgs {
    /// App description file
    pub app: PathBuf,
}
