//! Action graph
//!
//! An append-only arena of action nodes keyed by a stable string identity.
//! Nodes may only depend on nodes that already exist, so the graph stays
//! acyclic by construction; [`ActionGraph::topological_order`] still checks
//! with a three-colour DFS so a corrupted graph never yields a bogus order.
//!
//! ## Memoization
//!
//! [`ActionGraph::compute_if_absent`] returns the existing node for a key
//! without invoking the builder, which is how per-unit dexing stays
//! idempotent across repeated requests.
//!
//! ## Scheduling
//!
//! [`ActionGraph::execution_waves`] groups nodes by dependency depth. All
//! nodes of one wave are mutually independent and every node's dependencies
//! live in earlier waves, so an executor may run a wave in parallel and must
//! join before starting the next.

pub mod action;

pub use action::Action;

use std::collections::HashMap;

use serde::Serialize;

use crate::error::{DexGraphError, Result, circular_dependency, graph::duplicate_action};
use crate::hash::hash_bytes;

/// Index of a node inside its [`ActionGraph`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Conventional location of a file produced by the action `key`
pub fn output_path(key: &str, file: &str) -> String {
    format!("gen/{}/{file}", key.trim_start_matches('/'))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionNode {
    pub key: String,
    pub action: Action,
    pub deps: Vec<NodeId>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ActionGraph {
    nodes: Vec<ActionNode>,
    #[serde(skip)]
    by_key: HashMap<String, NodeId>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

impl ActionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    /// Node for an id handed out by this graph
    pub fn node(&self, id: NodeId) -> &ActionNode {
        &self.nodes[id.index()]
    }

    /// Checked lookup for ids of unknown provenance
    ///
    /// # Errors
    ///
    /// Returns [`DexGraphError::UnknownNode`] if the id is out of range.
    pub fn require(&self, id: NodeId) -> Result<&ActionNode> {
        self.nodes
            .get(id.index())
            .ok_or(DexGraphError::UnknownNode { index: id.index() })
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &ActionNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    /// Register a new node
    ///
    /// # Errors
    ///
    /// Fails if the key is already registered or a dependency is unknown.
    pub fn add(&mut self, key: impl Into<String>, action: Action, deps: Vec<NodeId>) -> Result<NodeId> {
        let key = key.into();
        if self.by_key.contains_key(&key) {
            return Err(duplicate_action(key));
        }
        for dep in &deps {
            self.require(*dep)?;
        }
        let id = NodeId(u32::try_from(self.nodes.len()).map_err(|_| DexGraphError::UnknownNode {
            index: self.nodes.len(),
        })?);
        self.by_key.insert(key.clone(), id);
        self.nodes.push(ActionNode { key, action, deps });
        Ok(id)
    }

    /// Return the node registered under `key`, building it on first request
    ///
    /// The builder may itself register nodes (its dependencies).
    ///
    /// # Errors
    ///
    /// Propagates builder errors and the errors of [`ActionGraph::add`].
    pub fn compute_if_absent<F>(&mut self, key: &str, build: F) -> Result<NodeId>
    where
        F: FnOnce(&mut Self) -> Result<(Action, Vec<NodeId>)>,
    {
        if let Some(id) = self.get(key) {
            return Ok(id);
        }
        let (action, deps) = build(self)?;
        self.add(key, action, deps)
    }

    /// Nodes with dependencies before dependents
    ///
    /// # Errors
    ///
    /// Returns [`DexGraphError::CircularDependency`] if the graph has a cycle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>> {
        let mut marks = vec![Mark::White; self.nodes.len()];
        let mut path = Vec::new();
        let mut order = Vec::with_capacity(self.nodes.len());
        for i in 0..self.nodes.len() {
            self.visit(NodeId(i as u32), &mut marks, &mut path, &mut order)?;
        }
        Ok(order)
    }

    fn visit(
        &self,
        id: NodeId,
        marks: &mut [Mark],
        path: &mut Vec<NodeId>,
        order: &mut Vec<NodeId>,
    ) -> Result<()> {
        match marks[id.index()] {
            Mark::Black => return Ok(()),
            Mark::Gray => {
                let start = path.iter().position(|n| *n == id).unwrap_or(0);
                let mut chain: Vec<&str> =
                    path[start..].iter().map(|n| self.node(*n).key.as_str()).collect();
                chain.push(self.node(id).key.as_str());
                return Err(circular_dependency(chain.join(" -> ")));
            }
            Mark::White => {}
        }

        marks[id.index()] = Mark::Gray;
        path.push(id);
        for dep in &self.node(id).deps {
            self.visit(*dep, marks, path, order)?;
        }
        path.pop();
        marks[id.index()] = Mark::Black;
        order.push(id);
        Ok(())
    }

    /// Nodes grouped by dependency depth, insertion order within a wave
    ///
    /// # Errors
    ///
    /// Fails if the graph has a cycle.
    pub fn execution_waves(&self) -> Result<Vec<Vec<NodeId>>> {
        let order = self.topological_order()?;
        let mut depth = vec![0usize; self.nodes.len()];
        for id in &order {
            depth[id.index()] = self
                .node(*id)
                .deps
                .iter()
                .map(|d| depth[d.index()] + 1)
                .max()
                .unwrap_or(0);
        }

        let wave_count = depth.iter().max().map_or(0, |d| d + 1);
        let mut waves = vec![Vec::new(); wave_count];
        for (i, d) in depth.iter().enumerate() {
            waves[*d].push(NodeId(i as u32));
        }
        Ok(waves)
    }

    /// Dependency keys of a node, in declaration order
    pub fn dep_keys(&self, id: NodeId) -> Vec<&str> {
        self.node(id)
            .deps
            .iter()
            .map(|d| self.node(*d).key.as_str())
            .collect()
    }

    /// BLAKE3 digest of the canonical JSON form of the graph
    ///
    /// Two passes over identical inputs must produce the same fingerprint.
    ///
    /// # Errors
    ///
    /// Fails only if serialization fails.
    pub fn fingerprint(&self) -> Result<String> {
        let bytes = serde_json::to_vec(&self.nodes)?;
        Ok(hash_bytes(&bytes))
    }
}
