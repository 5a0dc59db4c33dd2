//! Domain models for dexgraph
//!
//! This module contains the inputs of an enhancement pass: the module graph
//! and the packageable collection reachable from the app. Both are built
//! once and only read afterwards.

pub mod module;
pub mod packageable;
pub mod unit;

pub use module::{Module, ModuleGraph, ModuleId, ModuleSpec, DEFAULT_ROOT_MODULE};
pub use packageable::{
    BuildConfigField, BuildConfigFields, ExcludedLibrary, PackageableCollection, ResourceInputs,
};
pub use unit::{CompiledUnit, UnitId};
