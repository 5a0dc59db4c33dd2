//! Waves command implementation
//!
//! Actions in one wave have no dependencies on each other and may run in
//! parallel once every earlier wave has finished.

use console::Style;

use crate::cli::WavesArgs;
use crate::commands::enhance_app;
use crate::error::Result;

/// Run waves command
pub fn run(args: WavesArgs) -> Result<()> {
    let (_, result) = enhance_app(&args.app)?;
    let graph = &result.graph;
    for (n, wave) in graph.execution_waves()?.iter().enumerate() {
        println!(
            "{} {}",
            Style::new().bold().apply_to(format!("Wave {}", n + 1)),
            Style::new().dim().apply_to(format!("({} actions)", wave.len()))
        );
        for id in wave {
            let node = graph.node(*id);
            println!(
                "  {} {}",
                Style::new().cyan().apply_to(node.action.label()),
                node.key
            );
        }
    }
    Ok(())
}
