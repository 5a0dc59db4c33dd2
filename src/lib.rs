//! dexgraph - module-aware dex partitioning for Android app builds
//!
//! Reads an app description and plans how compiled code is dexed, grouped
//! per module and merged, as an action graph for an external build engine.

pub mod cli;
pub mod commands;
pub mod config;
pub mod dex;
pub mod domain;
pub mod enhancer;
pub mod error;
pub mod graph;
pub mod hash;
pub mod manifest;
pub mod packaging;

pub use enhancer::{EnhancementResult, GraphEnhancer};
pub use error::{DexGraphError, Result};
