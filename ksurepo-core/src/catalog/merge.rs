//! Merging, filtering, and presentation ordering of descriptor lists

use std::collections::HashSet;

use super::descriptor::ModuleDescriptor;

/// Merge per-source lists into one visible, deduplicated list
///
/// Lists are flattened in the order given. Entries with a visibility
/// other than 1 are dropped, then the first entry seen for each identity
/// key wins. The output keeps flattened order.
pub fn merge(lists: Vec<Vec<ModuleDescriptor>>) -> Vec<ModuleDescriptor> {
    let mut seen = HashSet::new();

    lists
        .into_iter()
        .flatten()
        .filter(ModuleDescriptor::is_visible)
        .filter(|module| seen.insert(module.identity_key()))
        .collect()
}

/// Case-insensitive, stable sort by name for display
pub fn sorted_for_display(modules: &[ModuleDescriptor]) -> Vec<ModuleDescriptor> {
    let mut sorted = modules.to_vec();
    sorted.sort_by_cached_key(|m| m.name.to_lowercase());
    sorted
}

/// Filter by a free-text query over name, description, and author
///
/// A blank query matches everything.
pub fn search<'a>(modules: &'a [ModuleDescriptor], query: &str) -> Vec<&'a ModuleDescriptor> {
    let query = query.trim();
    if query.is_empty() {
        return modules.iter().collect();
    }

    let query_lower = query.to_lowercase();
    modules
        .iter()
        .filter(|m| {
            m.name.to_lowercase().contains(&query_lower)
                || m.description.to_lowercase().contains(&query_lower)
                || m.author.to_lowercase().contains(&query_lower)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor::CatalogKind;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn module(name: &str, repo: &str, visibility: i64) -> ModuleDescriptor {
        ModuleDescriptor::from_json(
            CatalogKind::Modules,
            &json!({"name": name, "repoUrl": repo, "visibility": visibility}),
        )
        .unwrap()
    }

    fn meta(id: &str, name: &str, visibility: i64) -> ModuleDescriptor {
        ModuleDescriptor::from_json(
            CatalogKind::MetaModules,
            &json!({"id": id, "name": name, "visibility": visibility}),
        )
        .unwrap()
    }

    #[test]
    fn test_first_occurrence_wins() {
        let mut first = module("Alpha", "https://github.com/o/a", 1);
        first.author = "first-source".into();
        let mut dup = module("Alpha", "https://github.com/o/a", 1);
        dup.author = "copy".into();

        let merged = merge(vec![vec![first], vec![dup]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].author, "first-source");
    }

    #[test]
    fn test_same_name_different_repo_kept() {
        let merged = merge(vec![vec![
            module("Alpha", "https://github.com/o/a", 1),
            module("Alpha", "https://github.com/fork/a", 1),
        ]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_invisible_never_survives() {
        let merged = merge(vec![
            vec![module("Hidden", "r1", 0)],
            vec![module("Shown", "r2", 1), module("Odd", "r3", 2)],
        ]);
        let names: Vec<_> = merged.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Shown"]);
    }

    #[test]
    fn test_invisible_entry_does_not_shadow_later_visible_duplicate() {
        let merged = merge(vec![vec![meta("a", "First", 0)], vec![meta("a", "Second", 1)]]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].name, "Second");
    }

    #[test]
    fn test_merge_is_idempotent() {
        let lists = vec![
            vec![meta("b", "Beta", 1), meta("a", "Alpha", 1)],
            vec![meta("a", "Alpha-Dup", 1), meta("c", "Gamma", 1)],
        ];

        let first = merge(lists.clone());
        let second = merge(lists);
        assert_eq!(first, second);

        let keys: Vec<_> = first.iter().map(|m| m.id.clone()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_sorted_for_display_ignores_case() {
        let sorted = sorted_for_display(&[
            module("beta", "r1", 1),
            module("Alpha", "r2", 1),
            module("gamma", "r3", 1),
        ]);
        let names: Vec<_> = sorted.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_search_matches_name_description_author() {
        let mut a = module("Zygisk", "r1", 1);
        a.description = "Injects into zygote".into();
        let mut b = module("Busybox", "r2", 1);
        b.author = "Zed".into();
        let c = module("Other", "r3", 1);
        let modules = vec![a, b, c];

        let hits: Vec<_> = search(&modules, "ZYG").iter().map(|m| m.name.clone()).collect();
        assert_eq!(hits, vec!["Zygisk"]);

        let hits: Vec<_> = search(&modules, "zed").iter().map(|m| m.name.clone()).collect();
        assert_eq!(hits, vec!["Busybox"]);

        assert_eq!(search(&modules, "  ").len(), 3);
    }
}
