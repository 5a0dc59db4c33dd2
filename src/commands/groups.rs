//! Groups command implementation

use console::Style;

use crate::cli::GroupsArgs;
use crate::commands::enhance_app;
use crate::commands::plan::group_reports;
use crate::error::Result;

/// Run groups command
pub fn run(args: GroupsArgs) -> Result<()> {
    let (inputs, result) = enhance_app(&args.app)?;
    let groups = group_reports(&inputs.modules, &result);

    if groups.is_empty() {
        println!("No merge groups: merge mode is {}.", result.mode());
        return Ok(());
    }

    println!("Merge groups ({}):", groups.len());
    println!();
    for group in &groups {
        let index = group
            .index
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        let tag = if group.resource_code { " [resource code]" } else { "" };
        println!(
            "  {} {} {}{}",
            Style::new().bold().yellow().apply_to(group.name),
            Style::new().cyan().apply_to(group.module),
            Style::new().dim().apply_to(format!("index {index}")),
            tag
        );
        for artifact in &group.artifacts {
            println!("    {artifact}");
        }
    }
    Ok(())
}
