//! Per-unit dexing
//!
//! Every compiled unit with an output becomes one dex artifact backed by one
//! `Dex` action. Artifacts are memoized by their action key, so requesting
//! the same unit twice hands back the same [`ArtifactId`] and the same
//! registry entry.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::domain::{CompiledUnit, ModuleId};
use crate::error::{Result, excluded_unit};
use crate::graph::{Action, ActionGraph, NodeId};

/// Index of an artifact inside its [`DexArtifactRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ArtifactId(u32);

impl ArtifactId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a dex artifact was produced from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactSource {
    Unit { target: String },
    ResourceShard { rtype: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexArtifact {
    pub id: ArtifactId,
    /// Key of the producing action
    pub key: String,
    #[serde(skip)]
    pub node: NodeId,
    pub source: ArtifactSource,
    #[serde(skip)]
    pub module: ModuleId,
    /// Estimated cost after scaling, at least 1
    pub weight: u64,
    pub weight_factor: u64,
}

impl DexArtifact {
    pub fn is_resource_code(&self) -> bool {
        matches!(self.source, ArtifactSource::ResourceShard { .. })
    }

    /// Unit target or resource shard name
    pub fn label(&self) -> &str {
        match &self.source {
            ArtifactSource::Unit { target } => target,
            ArtifactSource::ResourceShard { rtype } => rtype,
        }
    }
}

/// Arena of dex artifacts, keyed by action key
#[derive(Debug, Clone, Default)]
pub struct DexArtifactRegistry {
    artifacts: Vec<DexArtifact>,
    by_key: HashMap<String, ArtifactId>,
}

impl DexArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn artifact(&self, id: ArtifactId) -> &DexArtifact {
        &self.artifacts[id.index()]
    }

    pub fn get(&self, key: &str) -> Option<ArtifactId> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DexArtifact> {
        self.artifacts.iter()
    }

    /// Return the artifact registered under `key`, creating it on first use
    ///
    /// # Errors
    ///
    /// Propagates errors from `create`.
    pub fn get_or_insert_with<F>(&mut self, key: &str, create: F) -> Result<ArtifactId>
    where
        F: FnOnce(ArtifactId) -> Result<DexArtifact>,
    {
        if let Some(id) = self.get(key) {
            return Ok(id);
        }
        let id = ArtifactId(self.artifacts.len() as u32);
        let artifact = create(id)?;
        self.by_key.insert(key.to_string(), id);
        self.artifacts.push(artifact);
        Ok(id)
    }

    /// Sum of the weights of `ids`
    pub fn total_weight(&self, ids: &[ArtifactId]) -> u64 {
        ids.iter().map(|id| self.artifact(*id).weight).sum()
    }
}

/// Append build flavors to a target, e.g. `//lib:a` + `d8` -> `//lib:a#d8`
pub fn append_flavors(target: &str, flavors: &[&str]) -> String {
    let joined = flavors.join(",");
    if target.contains('#') {
        format!("{target},{joined}")
    } else {
        format!("{target}#{joined}")
    }
}

/// Key of the dex action for `target`, qualified by the minimum API level
pub fn d8_key(target: &str, min_sdk: Option<u32>) -> String {
    match min_sdk {
        Some(level) => append_flavors(target, &["d8", &format!("min-api-{level}")]),
        None => append_flavors(target, &["d8"]),
    }
}

/// One unit handed to per-unit dexing, with the action producing its jar if
/// that action lives in this graph
#[derive(Debug, Clone, Copy)]
pub struct PreDexInput<'a> {
    pub unit: &'a CompiledUnit,
    pub producer: Option<NodeId>,
}

/// Context shared by every per-unit dexing request of one pass
pub struct PreDexer<'a, E> {
    pub graph: &'a mut ActionGraph,
    pub registry: &'a mut DexArtifactRegistry,
    pub min_sdk: Option<u32>,
    pub is_excluded: E,
}

impl<E> PreDexer<'_, E>
where
    E: Fn(&str) -> bool,
{
    /// Dex each unit, skipping units with nothing compiled
    ///
    /// Returns the artifacts in input order; a unit requested twice is
    /// listed once.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::DexGraphError::ExcludedUnitInDexInput`] if an
    /// excluded library shows up in `inputs`.
    pub fn dex_all<'u>(
        &mut self,
        inputs: impl IntoIterator<Item = PreDexInput<'u>>,
    ) -> Result<Vec<ArtifactId>> {
        let mut result = Vec::new();
        for input in inputs {
            if let Some(id) = self.dex_unit(input)? {
                if !result.contains(&id) {
                    result.push(id);
                }
            }
        }
        Ok(result)
    }

    /// Dex a single unit
    ///
    /// # Errors
    ///
    /// Fails if the unit is excluded from dex.
    pub fn dex_unit(&mut self, input: PreDexInput<'_>) -> Result<Option<ArtifactId>> {
        let unit = input.unit;
        if (self.is_excluded)(&unit.target) {
            return Err(excluded_unit(&unit.target));
        }
        let Some(output) = unit.output.as_deref() else {
            debug!(target = %unit.target, "Skipping unit without compiled output");
            return Ok(None);
        };

        let key = d8_key(&unit.target, self.min_sdk);
        let graph = &mut *self.graph;
        let min_sdk = self.min_sdk;
        let id = self.registry.get_or_insert_with(&key, |id| {
            let node = graph.compute_if_absent(&key, |_| {
                Ok((
                    Action::Dex {
                        input: output.to_string(),
                        weight_factor: 1,
                        desugar_deps: unit.effective_desugar_deps(),
                        min_sdk,
                    },
                    input.producer.into_iter().collect(),
                ))
            })?;
            Ok(DexArtifact {
                id,
                key: key.clone(),
                node,
                source: ArtifactSource::Unit {
                    target: unit.target.clone(),
                },
                module: unit.module,
                weight: unit.weight_estimate.max(1),
                weight_factor: 1,
            })
        })?;
        Ok(Some(id))
    }
}
