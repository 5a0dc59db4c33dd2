//! Property tests for count-bounded dex grouping

use proptest::prelude::*;

use dexgraph::dex::{DexPolicy, DexStore, group_artifacts};
use dexgraph::domain::{CompiledUnit, ModuleGraph, PackageableCollection};
use dexgraph::enhancer::{EnhancerOptions, GraphEnhancer};

fn store() -> impl Strategy<Value = DexStore> {
    prop_oneof![Just(DexStore::Raw), Just(DexStore::Jar), Just(DexStore::Xzs)]
}

proptest! {
    #[test]
    fn grouping_is_deterministic(items in prop::collection::vec(0u32..1000, 0..64), limit in 0usize..10) {
        prop_assert_eq!(group_artifacts(&items, limit), group_artifacts(&items, limit));
    }

    #[test]
    fn groups_respect_count_bound(items in prop::collection::vec(0u32..1000, 0..64), limit in 1usize..10) {
        for group in group_artifacts(&items, limit) {
            prop_assert!(!group.is_empty());
            prop_assert!(group.len() <= limit);
        }
    }

    #[test]
    fn groups_cover_input_in_order(items in prop::collection::vec(0u32..1000, 0..64), limit in 0usize..10) {
        let flattened: Vec<u32> = group_artifacts(&items, limit).into_iter().flatten().collect();
        prop_assert_eq!(flattened, items);
    }

    #[test]
    fn only_full_groups_precede_the_last(items in prop::collection::vec(0u32..1000, 1..64), limit in 1usize..10) {
        let groups = group_artifacts(&items, limit);
        for group in &groups[..groups.len() - 1] {
            prop_assert_eq!(group.len(), limit);
        }
    }

    #[test]
    fn unlimited_yields_one_group(items in prop::collection::vec(0u32..1000, 1..64)) {
        prop_assert_eq!(group_artifacts(&items, 0).len(), 1);
    }

    #[test]
    fn single_group_fallback(count in 1usize..20, limit in 0usize..5, store in store()) {
        prop_assume!(store != DexStore::Jar || limit == 0);
        let modules = ModuleGraph::single_root();
        let mut collection = PackageableCollection::new();
        for i in 0..count {
            collection.add_unit(CompiledUnit::new(
                format!("//lib:u{i}"),
                modules.root(),
                Some(format!("out/u{i}.jar")),
            ));
        }
        let mut policy = DexPolicy::default();
        policy.split_enabled = true;
        policy.store = store;
        policy.group_artifact_limit = limit;
        let options = EnhancerOptions::new("//app:app");
        let result = GraphEnhancer::new(&modules, &collection, &policy, &options)
            .enhance()
            .unwrap();

        let groups = result.plan.groups();
        prop_assert_eq!(groups.len(), 1);
        let units = groups[0]
            .artifacts
            .iter()
            .filter(|id| !result.artifacts.artifact(**id).is_resource_code())
            .count();
        prop_assert_eq!(units, count);
    }

    #[test]
    fn resource_code_index_follows_root_groups(count in 0usize..20, limit in 1usize..5) {
        let modules = ModuleGraph::single_root();
        let mut collection = PackageableCollection::new();
        collection.resources.types = vec!["string".to_string()];
        for i in 0..count {
            collection.add_unit(CompiledUnit::new(
                format!("//lib:u{i}"),
                modules.root(),
                Some(format!("out/u{i}.jar")),
            ));
        }
        let mut policy = DexPolicy::default();
        policy.split_enabled = true;
        policy.store = DexStore::Jar;
        policy.group_artifact_limit = limit;
        let options = EnhancerOptions::new("//app:app");
        let result = GraphEnhancer::new(&modules, &collection, &policy, &options)
            .enhance()
            .unwrap();

        let groups = result.plan.groups();
        let r_index = groups.iter().find(|g| g.resource_code).and_then(|g| g.index).unwrap();
        for group in groups.iter().filter(|g| !g.resource_code) {
            prop_assert!(group.index.unwrap() < r_index);
        }
    }
}
