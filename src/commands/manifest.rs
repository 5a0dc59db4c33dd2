//! Manifest command implementation

use crate::cli::ManifestArgs;
use crate::commands::enhance_app;
use crate::error::{Result, file_read_failed};
use crate::manifest::Manifest;

/// Run manifest command
pub fn run(args: ManifestArgs) -> Result<()> {
    let (_, result) = enhance_app(&args.app)?;

    if let Some(path) = &args.verify {
        let text = std::fs::read_to_string(path)
            .map_err(|e| file_read_failed(path.display().to_string(), e.to_string()))?;
        let manifest = Manifest::parse(&text)?;
        manifest.verify(&args.out_dir)?;
        println!("Manifest matches {} dex files.", manifest.entries.len());
        return Ok(());
    }

    let manifest = Manifest::collect(&result.merge_result, &args.out_dir)?;
    match &args.write {
        Some(path) => {
            manifest.write(path)?;
            println!("Wrote {} entries to {}", manifest.entries.len(), path.display());
        }
        None => print!("{}", manifest.render()),
    }
    Ok(())
}
