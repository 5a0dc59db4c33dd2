//! Command implementations for the dexgraph CLI

pub mod completions;
pub mod groups;
pub mod manifest;
pub mod plan;
pub mod version;
pub mod waves;

use std::path::Path;

use crate::config::{AppConfig, PlannerInputs};
use crate::enhancer::{EnhancementResult, GraphEnhancer};
use crate::error::Result;

/// Load an app description and run one enhancement pass over it
pub(crate) fn enhance_app(app: &Path) -> Result<(PlannerInputs, EnhancementResult)> {
    let inputs = AppConfig::load(app)?.into_inputs()?;
    let result = GraphEnhancer::new(
        &inputs.modules,
        &inputs.collection,
        &inputs.policy,
        &inputs.options,
    )
    .enhance()?;
    Ok((inputs, result))
}
