//! Connection suggestions ranked by lexical overlap.

use std::cmp::Ordering;

use tracing::{debug, instrument};

use tessera_core::{jaccard, ConnectionCandidate, Item, TokenSet};

use crate::config::SuggestConfig;
use crate::dismissals::DismissalWindow;
use crate::token_cache::TokenCache;

/// Shared keywords named in a suggestion reason.
const REASON_KEYWORDS: usize = 3;

/// Ranks candidate items for a query item.
pub struct ConnectionSuggester {
    config: SuggestConfig,
    cache: TokenCache,
}

impl ConnectionSuggester {
    pub fn new(config: SuggestConfig) -> Self {
        let cache = TokenCache::new(config.token_cache_capacity);
        Self { config, cache }
    }

    pub fn config(&self) -> &SuggestConfig {
        &self.config
    }

    pub fn cache(&self) -> &TokenCache {
        &self.cache
    }

    /// Rank `pool` against `item`, best first, at most `limit` results.
    ///
    /// Skips the item itself, anything already connected to it from either
    /// side, and pairs in `dismissals`. Only candidates scoring strictly
    /// above the configured floor are returned; the list is never padded.
    #[instrument(skip_all, fields(subsystem = "suggest", component = "connections", op = "suggest", item_id = %item.id, pool_size = pool.len()))]
    pub fn suggest(
        &self,
        item: &Item,
        pool: &[Item],
        limit: usize,
        dismissals: Option<&DismissalWindow>,
    ) -> Vec<ConnectionCandidate> {
        if limit == 0 {
            return Vec::new();
        }
        let query = self.cache.tokens_for(item);

        let mut candidates: Vec<ConnectionCandidate> = pool
            .iter()
            .filter(|c| c.id != item.id)
            .filter(|c| !item.is_connected_to(c.id) && !c.is_connected_to(item.id))
            .filter(|c| !dismissals.is_some_and(|d| d.is_dismissed(item.id, c.id)))
            .filter_map(|c| {
                let tokens = self.cache.tokens_for(c);
                let score = jaccard(&query, &tokens);
                if score <= self.config.min_score {
                    return None;
                }
                let shared_tags = item.shared_tag_count(c);
                Some(ConnectionCandidate {
                    reason: describe_overlap(item, c, &query, &tokens),
                    item: c.clone(),
                    score,
                    shared_tags,
                })
            })
            .collect();

        candidates.sort_by(rank);
        candidates.truncate(limit);

        debug!(result_count = candidates.len(), "Connection suggestions ranked");
        candidates
    }
}

impl Default for ConnectionSuggester {
    fn default() -> Self {
        Self::new(SuggestConfig::default())
    }
}

/// Score desc, shared tags desc, most recently updated, then id.
fn rank(a: &ConnectionCandidate, b: &ConnectionCandidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then(b.shared_tags.cmp(&a.shared_tags))
        .then(b.item.updated_at_utc.cmp(&a.item.updated_at_utc))
        .then(a.item.id.cmp(&b.item.id))
}

fn describe_overlap(item: &Item, candidate: &Item, a: &TokenSet, b: &TokenSet) -> String {
    let shared = a.shared(b);
    let mut reason = format!(
        "Shares {} keyword{}: {}",
        shared.len(),
        if shared.len() == 1 { "" } else { "s" },
        shared
            .iter()
            .take(REASON_KEYWORDS)
            .copied()
            .collect::<Vec<_>>()
            .join(", ")
    );
    let tags: Vec<&str> = item
        .tags
        .intersection(&candidate.tags)
        .map(String::as_str)
        .collect();
    if !tags.is_empty() {
        reason.push_str(&format!("; tagged {}", tags.join(", ")));
    }
    reason
}

/// Rank `pool` against `item` with default settings and no dismissals.
pub fn suggest_connections(item: &Item, pool: &[Item], limit: usize) -> Vec<ConnectionCandidate> {
    ConnectionSuggester::default().suggest(item, pool, limit, None)
}
