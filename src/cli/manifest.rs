use std::path::PathBuf;

use clap::Parser;

/// Arguments for the manifest command
#[derive(Parser, Debug)]
#[command(after_help = "EXAMPLES:\n  \
                  Print the manifest of built dex files:\n    dexgraph manifest app.yaml --out-dir buck-out/app\n\n\
                  Check built dex files against a manifest:\n    dexgraph manifest app.yaml --out-dir buck-out/app --verify metadata.txt")]
pub struct ManifestArgs {
    /// App description file
    pub app: PathBuf,

    /// Directory holding the built dex files
    #[arg(long, short = 'o')]
    pub out_dir: PathBuf,

    /// Verify the files against this manifest instead of printing one
    #[arg(long, conflicts_with = "write")]
    pub verify: Option<PathBuf>,

    /// Write the manifest to this file instead of stdout
    #[arg(long, short = 'w')]
    pub write: Option<PathBuf>,
}
