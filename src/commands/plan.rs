//! Plan command implementation
//!
//! Runs one enhancement pass and prints either a summary or the full plan:
//! nodes in dependency order, merge groups, planned dex layout, packaging.

use std::collections::BTreeMap;

use console::Style;
use serde::Serialize;

use crate::cli::{OutputFormat, PlanArgs};
use crate::commands::enhance_app;
use crate::dex::{DexPolicy, MergeMode, MergeResult};
use crate::domain::ModuleGraph;
use crate::enhancer::EnhancementResult;
use crate::error::Result;
use crate::packaging::PackagePlan;

#[derive(Debug, Serialize)]
pub struct PlanReport<'a> {
    pub app: &'a str,
    pub mode: MergeMode,
    pub fingerprint: String,
    pub policy: &'a DexPolicy,
    pub nodes: Vec<NodeReport<'a>>,
    pub groups: Vec<GroupReport<'a>>,
    pub dex_outputs: &'a MergeResult,
    pub classpath_entries_to_dex: &'a [String],
    pub module_units: &'a BTreeMap<String, Vec<String>>,
    pub packaging: &'a PackagePlan,
}

#[derive(Debug, Serialize)]
pub struct NodeReport<'a> {
    pub key: &'a str,
    pub deps: Vec<&'a str>,
    pub action: &'a crate::graph::Action,
}

#[derive(Debug, Serialize)]
pub struct GroupReport<'a> {
    pub name: &'a str,
    pub module: &'a str,
    pub index: Option<u32>,
    pub resource_code: bool,
    pub artifacts: Vec<&'a str>,
}

impl<'a> PlanReport<'a> {
    /// Build the report; nodes are listed dependencies first
    ///
    /// # Errors
    ///
    /// Fails if the graph has a cycle or cannot be serialized.
    pub fn new(
        app: &'a str,
        modules: &'a ModuleGraph,
        policy: &'a DexPolicy,
        result: &'a EnhancementResult,
    ) -> Result<Self> {
        let graph = &result.graph;
        let nodes = graph
            .topological_order()?
            .into_iter()
            .map(|id| {
                let node = graph.node(id);
                NodeReport {
                    key: &node.key,
                    deps: graph.dep_keys(id),
                    action: &node.action,
                }
            })
            .collect();
        Ok(Self {
            app,
            mode: result.mode(),
            fingerprint: graph.fingerprint()?,
            policy,
            nodes,
            groups: group_reports(modules, result),
            dex_outputs: &result.merge_result,
            classpath_entries_to_dex: &result.classpath_entries_to_dex,
            module_units: &result.module_units,
            packaging: &result.packaging,
        })
    }
}

pub(crate) fn group_reports<'a>(
    modules: &'a ModuleGraph,
    result: &'a EnhancementResult,
) -> Vec<GroupReport<'a>> {
    result
        .plan
        .groups()
        .iter()
        .map(|g| GroupReport {
            name: &g.name,
            module: modules.name(g.module),
            index: g.index,
            resource_code: g.resource_code,
            artifacts: g
                .artifacts
                .iter()
                .map(|id| result.artifacts.artifact(*id).label())
                .collect(),
        })
        .collect()
}

/// Run plan command
pub fn run(args: PlanArgs) -> Result<()> {
    let (inputs, result) = enhance_app(&args.app)?;
    let report = PlanReport::new(
        &inputs.options.app_target,
        &inputs.modules,
        &inputs.policy,
        &result,
    )?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_summary(&report),
    }
    Ok(())
}

fn print_summary(report: &PlanReport<'_>) {
    let bold = Style::new().bold();
    println!("{} {}", bold.apply_to("App:"), Style::new().yellow().apply_to(report.app));
    println!("{} {}", bold.apply_to("Merge mode:"), Style::new().cyan().apply_to(report.mode));
    println!(
        "{} split={} store={} group_limit={}",
        bold.apply_to("Policy:"),
        report.policy.split_enabled,
        report.policy.store,
        report.policy.group_artifact_limit
    );
    println!("{} {}", bold.apply_to("Actions:"), report.nodes.len());
    println!("{} {}", bold.apply_to("Fingerprint:"), report.fingerprint);
    if !report.groups.is_empty() {
        println!("{} {}", bold.apply_to("Merge groups:"), report.groups.len());
    }
    println!();

    println!("{}", bold.apply_to("Dex outputs:"));
    for module in &report.dex_outputs.modules {
        println!("  {}", Style::new().bold().yellow().apply_to(&module.module));
        for output in &module.outputs {
            println!(
                "    {} {}",
                output.path,
                Style::new()
                    .dim()
                    .apply_to(format!("({} artifacts, weight {})", output.artifacts.len(), output.weight))
            );
        }
    }
}
