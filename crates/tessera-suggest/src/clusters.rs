//! Board suggestions for unassigned items.
//!
//! Items without a board are grouped by every tag they carry and by their
//! top extracted keywords. Groups are then taken greedily: the key covering
//! the most still-unclaimed items wins, its members are claimed, and the
//! remaining groups are re-measured. Groups that fall below the minimum
//! size are dropped, so each item lands in at most one suggestion.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, instrument};
use uuid::Uuid;

use tessera_core::{extract_keywords, ClusterKeyKind, ClusterSuggestion, Item};

use crate::config::ClusterConfig;

/// Groups unassigned items into candidate boards.
#[derive(Debug, Clone, Default)]
pub struct ClusterSuggester {
    config: ClusterConfig,
}

impl ClusterSuggester {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    /// Suggest boards for `items`, ignoring any that already have a board.
    ///
    /// Suggestions come out largest first; equal sizes list tag clusters
    /// before keyword clusters, then by key.
    #[instrument(skip_all, fields(subsystem = "suggest", component = "clusters", op = "suggest", input_count = items.len()))]
    pub fn suggest(&self, items: &[Item]) -> Vec<ClusterSuggestion> {
        let mut groups: BTreeMap<(ClusterKeyKind, String), Vec<Uuid>> = BTreeMap::new();
        let mut seen: HashSet<Uuid> = HashSet::new();

        // An id listed twice in `items` is grouped once.
        for item in items
            .iter()
            .filter(|i| i.is_unassigned() && seen.insert(i.id))
        {
            for tag in &item.tags {
                groups
                    .entry((ClusterKeyKind::Tag, tag.clone()))
                    .or_default()
                    .push(item.id);
            }
            for keyword in extract_keywords(&item.text(), self.config.keyword_top_k) {
                if item.tags.contains(&keyword) {
                    continue;
                }
                groups
                    .entry((ClusterKeyKind::Keyword, keyword))
                    .or_default()
                    .push(item.id);
            }
        }

        let mut claimed: HashSet<Uuid> = HashSet::new();
        let mut suggestions = Vec::new();

        loop {
            // BTreeMap order is (kind, key), so strict `>` keeps the first
            // of equally sized groups: tags before keywords, then by key.
            let mut best: Option<(&(ClusterKeyKind, String), Vec<Uuid>)> = None;
            for (key, members) in &groups {
                let open: Vec<Uuid> = members
                    .iter()
                    .copied()
                    .filter(|id| !claimed.contains(id))
                    .collect();
                if best.as_ref().map_or(true, |(_, b)| open.len() > b.len()) {
                    best = Some((key, open));
                }
            }

            let Some(((kind, key), members)) = best else {
                break;
            };
            if members.len() < self.config.min_cluster_size {
                break;
            }

            claimed.extend(members.iter().copied());
            suggestions.push(ClusterSuggestion {
                key: key.clone(),
                kind: *kind,
                board_name: board_name(key),
                member_ids: members,
            });
        }

        debug!(
            result_count = suggestions.len(),
            group_count = groups.len(),
            "Cluster suggestions built"
        );
        suggestions
    }
}

/// Suggest boards with default settings.
pub fn suggest_clusters(items: &[Item]) -> Vec<ClusterSuggestion> {
    ClusterSuggester::default().suggest(items)
}

/// Title-case a tag or keyword into a board name.
pub fn board_name(key: &str) -> String {
    key.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_name_title_cases() {
        assert_eq!(board_name("machine learning"), "Machine Learning");
        assert_eq!(board_name("stoicism"), "Stoicism");
    }

    #[test]
    fn test_small_groups_are_dropped() {
        let items = vec![
            Item::new("Seneca letters", "").with_tags(["philosophy"]),
            Item::new("Marcus meditations", "").with_tags(["philosophy"]),
        ];
        assert!(suggest_clusters(&items).is_empty());
    }

    #[test]
    fn test_repeated_item_counts_once() {
        let seneca = Item::new("Seneca letters", "").with_tags(["philosophy"]);
        let items = vec![
            seneca.clone(),
            seneca,
            Item::new("Marcus meditations", "").with_tags(["philosophy"]),
        ];
        assert!(suggest_clusters(&items).is_empty());

        let mut with_third = items.clone();
        with_third.push(Item::new("Epictetus handbook", "").with_tags(["philosophy"]));
        let out = suggest_clusters(&with_third);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].member_ids.len(), 3);
        let distinct: HashSet<Uuid> = out[0].member_ids.iter().copied().collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_items_on_boards_are_ignored() {
        let board = Uuid::new_v4();
        let items = vec![
            Item::new("one", "").with_tags(["rust"]),
            Item::new("two", "").with_tags(["rust"]),
            Item::new("three", "").with_tags(["rust"]).with_boards([board]),
        ];
        assert!(suggest_clusters(&items).is_empty());
    }

    #[test]
    fn test_each_item_joins_one_cluster() {
        let items: Vec<Item> = (0..4)
            .map(|i| Item::new(format!("entry{}", i), "").with_tags(["rust", "async"]))
            .collect();
        let out = suggest_clusters(&items);
        assert_eq!(out.len(), 1);
        // Equal sizes: tag key order decides.
        assert_eq!(out[0].key, "async");
        assert_eq!(out[0].kind, ClusterKeyKind::Tag);
        assert_eq!(out[0].member_ids.len(), 4);
    }

    #[test]
    fn test_keyword_clusters_when_untagged() {
        let items = vec![
            Item::new("Sourdough starter", "feeding schedule"),
            Item::new("Sourdough hydration", "crumb structure"),
            Item::new("Sourdough scoring", "oven spring"),
        ];
        let out = suggest_clusters(&items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "sourdough");
        assert_eq!(out[0].kind, ClusterKeyKind::Keyword);
        assert_eq!(out[0].board_name, "Sourdough");
    }

    #[test]
    fn test_larger_group_claims_first() {
        let mut items: Vec<Item> = (0..4)
            .map(|i| Item::new(format!("gardening{}", i), "").with_tags(["garden"]))
            .collect();
        // Shares "garden" with the first group but also a smaller "herbs" group.
        items.extend((0..2).map(|i| Item::new(format!("basil{}", i), "").with_tags(["herbs"])));
        items[0].tags.insert("herbs".to_string());

        let out = suggest_clusters(&items);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].key, "garden");
        assert!(out[0].member_ids.contains(&items[0].id));
    }
}
