//! Dex grouping
//!
//! Partitions a module's dex artifacts into merge groups by count. Packing
//! is first-fit in input order: a new group opens only when the current one
//! is full. With a limit of 0 every module gets exactly one group.
//!
//! Grouping bounds how many artifacts one merge invocation sees; it does not
//! balance weight.

use serde::Serialize;

use crate::dex::ArtifactId;
use crate::domain::ModuleId;

/// Split `artifacts` into consecutive groups of at most `limit` items
///
/// ```text
/// limit = 3, [a b c d e f g]  ->  [a b c] [d e f] [g]
/// limit = 0, [a b c d e f g]  ->  [a b c d e f g]
/// ```
pub fn group_artifacts<T: Clone>(artifacts: &[T], limit: usize) -> Vec<Vec<T>> {
    let mut groups: Vec<Vec<T>> = Vec::new();
    for artifact in artifacts {
        let needs_new = match groups.last() {
            None => true,
            Some(current) => limit != 0 && current.len() + 1 > limit,
        };
        if needs_new {
            groups.push(Vec::new());
        }
        if let Some(current) = groups.last_mut() {
            current.push(artifact.clone());
        }
    }
    groups
}

/// Bucket items by module, keeping first-seen module order and item order
pub fn partition_by_module<T>(
    items: impl IntoIterator<Item = T>,
    module_of: impl Fn(&T) -> ModuleId,
) -> Vec<(ModuleId, Vec<T>)> {
    let mut buckets: Vec<(ModuleId, Vec<T>)> = Vec::new();
    for item in items {
        let module = module_of(&item);
        match buckets.iter_mut().find(|(m, _)| *m == module) {
            Some((_, bucket)) => bucket.push(item),
            None => buckets.push((module, vec![item])),
        }
    }
    buckets
}

/// One merge unit: an ordered, non-empty run of artifacts of one module
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexGroup {
    pub module: ModuleId,
    /// Position among the module's groups; `None` for a module's only group
    pub index: Option<u32>,
    /// Node name suffix, e.g. `pre_dex_group_2` or `video_pre_dex_group`
    pub name: String,
    pub artifacts: Vec<ArtifactId>,
    /// Whether this group carries the generated resource code
    pub resource_code: bool,
}

impl DexGroup {
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

/// Prefix used in group names; empty for the root module
pub fn group_prefix(module_name: &str, is_root: bool) -> String {
    if is_root {
        String::new()
    } else {
        format!("{module_name}_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_groups_of_three() {
        let items = ["a", "b", "c", "d", "e", "f", "g"];
        let groups = group_artifacts(&items, 3);
        assert_eq!(
            groups,
            vec![vec!["a", "b", "c"], vec!["d", "e", "f"], vec!["g"]]
        );
    }

    #[test]
    fn test_zero_limit_single_group() {
        let items = ["a", "b", "c", "d", "e", "f", "g"];
        let groups = group_artifacts(&items, 0);
        assert_eq!(groups, vec![items.to_vec()]);
    }

    #[test]
    fn test_empty_input_no_groups() {
        let items: [&str; 0] = [];
        assert!(group_artifacts(&items, 3).is_empty());
        assert!(group_artifacts(&items, 0).is_empty());
    }

    #[test]
    fn test_exact_multiple() {
        let items = [1, 2, 3, 4];
        assert_eq!(group_artifacts(&items, 2), vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_partition_by_module_first_seen_order() {
        let video = ModuleId(1);
        let root = ModuleId(0);
        let items = vec![(video, "v1"), (root, "r1"), (video, "v2")];
        let buckets = partition_by_module(items, |(m, _)| *m);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].0, video);
        assert_eq!(buckets[0].1, vec![(video, "v1"), (video, "v2")]);
        assert_eq!(buckets[1].1, vec![(root, "r1")]);
    }

    #[test]
    fn test_group_prefix() {
        assert_eq!(group_prefix("dex", true), "");
        assert_eq!(group_prefix("video", false), "video_");
    }
}
