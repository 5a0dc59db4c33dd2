//! Packageable collection
//!
//! The flattened, deduplicated set of everything reachable from the app's
//! dependency closure: compiled units to dex, libraries excluded from dex,
//! classpath entries, resource inputs, build-config fragments and native
//! libraries. Insertion order is preserved everywhere it can reach output.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::{CompiledUnit, ModuleId, UnitId};

/// A library that must not be dexed but whose classpath is still needed
/// to resolve symbols during obfuscation and desugaring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedLibrary {
    pub target: String,
    pub immediate_classpath: Vec<String>,
}

/// Inputs for the generated resource-accessor code
#[derive(Debug, Clone, Default)]
pub struct ResourceInputs {
    /// Directory holding the generated R sources, if resources were processed
    pub r_dot_java_dir: Option<String>,
    /// Resource types present in the app, owned by the root module
    pub types: Vec<String>,
    /// Resource types whose accessors belong to a feature module
    pub module_types: BTreeMap<ModuleId, Vec<String>>,
    /// Java packages whose R classes are stripped from the compiled jar
    pub packages_to_exclude: Vec<String>,
    /// Keep rules generated by the resource compiler
    pub aapt_proguard_configs: Vec<String>,
}

/// One generated `BuildConfig` constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfigField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub name: String,
    pub value: String,
}

impl BuildConfigField {
    pub fn new(field_type: &str, name: &str, value: impl Into<String>) -> Self {
        Self {
            field_type: field_type.to_string(),
            name: name.to_string(),
            value: value.into(),
        }
    }
}

/// Ordered set of build-config fields keyed by name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildConfigFields(Vec<BuildConfigField>);

impl BuildConfigFields {
    pub fn from_fields(fields: impl IntoIterator<Item = BuildConfigField>) -> Self {
        let mut result = Self::default();
        for field in fields {
            result.put(field);
        }
        result
    }

    /// Insert or replace a field; a replaced field keeps its position
    pub fn put(&mut self, field: BuildConfigField) {
        match self.0.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.0.push(field),
        }
    }

    #[must_use]
    pub fn put_all(mut self, other: &BuildConfigFields) -> Self {
        for field in &other.0 {
            self.put(field.clone());
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&BuildConfigField> {
        self.0.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildConfigField> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Everything the enhancer consumes from the upstream collector
#[derive(Debug, Clone, Default)]
pub struct PackageableCollection {
    units: Vec<CompiledUnit>,
    excluded: Vec<ExcludedLibrary>,
    excluded_targets: BTreeSet<String>,
    classpath_entries_to_dex: Vec<String>,
    module_classpath_entries: BTreeMap<ModuleId, Vec<String>>,
    pub proguard_configs: Vec<String>,
    pub resources: ResourceInputs,
    /// Build-config fragments keyed by Java package
    pub build_configs: BTreeMap<String, BuildConfigFields>,
    pub native_libraries: BTreeMap<ModuleId, Vec<String>>,
}

impl PackageableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a library to dex
    ///
    /// Its output, if any, is appended to the classpath entries to dex and to
    /// its module's entries, keeping first-seen order.
    pub fn add_unit(&mut self, unit: CompiledUnit) -> UnitId {
        if let Some(output) = &unit.output {
            push_unique(&mut self.classpath_entries_to_dex, output);
            push_unique(
                self.module_classpath_entries.entry(unit.module).or_default(),
                output,
            );
        }
        let id = UnitId(self.units.len() as u32);
        self.units.push(unit);
        id
    }

    /// Register a library that the collector excluded from dexing
    pub fn add_excluded(&mut self, library: ExcludedLibrary) {
        if self.excluded_targets.insert(library.target.clone()) {
            self.excluded.push(library);
        }
    }

    /// Add a classpath entry that is not backed by a compiled unit
    pub fn add_classpath_entry(&mut self, module: ModuleId, entry: impl Into<String>) {
        let entry = entry.into();
        push_unique(&mut self.classpath_entries_to_dex, &entry);
        push_unique(self.module_classpath_entries.entry(module).or_default(), &entry);
    }

    pub fn unit(&self, id: UnitId) -> &CompiledUnit {
        &self.units[id.index()]
    }

    /// Units to dex, in collection order
    pub fn units_to_dex(&self) -> impl Iterator<Item = (UnitId, &CompiledUnit)> {
        self.units
            .iter()
            .enumerate()
            .map(|(i, u)| (UnitId(i as u32), u))
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_excluded(&self, target: &str) -> bool {
        self.excluded_targets.contains(target)
    }

    pub fn excluded_libraries(&self) -> &[ExcludedLibrary] {
        &self.excluded
    }

    pub fn classpath_entries_to_dex(&self) -> &[String] {
        &self.classpath_entries_to_dex
    }

    pub fn module_classpath_entries(&self) -> &BTreeMap<ModuleId, Vec<String>> {
        &self.module_classpath_entries
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
