//! Per-item token set cache.
//!
//! Entries are keyed by item id and stamped with a blake3 fingerprint of the
//! item's title and body. A lookup whose fingerprint no longer matches (the
//! text was edited) recomputes the tokens and replaces the entry.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use lru::LruCache;
use uuid::Uuid;

use tessera_core::{tokenize, Item, TokenSet};

struct CachedTokens {
    fingerprint: blake3::Hash,
    tokens: Arc<TokenSet>,
}

/// Bounded LRU cache of item token sets.
pub struct TokenCache {
    entries: Mutex<LruCache<Uuid, CachedTokens>>,
}

fn fingerprint(item: &Item) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(item.title.as_bytes());
    hasher.update(&[0]);
    hasher.update(item.body.as_bytes());
    hasher.finalize()
}

impl TokenCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Token set for `item`, computed on miss or when its text changed.
    pub fn tokens_for(&self, item: &Item) -> Arc<TokenSet> {
        let print = fingerprint(item);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = entries.get(&item.id) {
            if cached.fingerprint == print {
                return Arc::clone(&cached.tokens);
            }
        }

        let tokens = Arc::new(tokenize(&item.text()));
        entries.put(
            item.id,
            CachedTokens {
                fingerprint: print,
                tokens: Arc::clone(&tokens),
            },
        );
        tokens
    }

    /// Drop the cached entry for `id`, if any.
    pub fn invalidate(&self, id: Uuid) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop(&id);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(tessera_core::defaults::TOKEN_CACHE_CAPACITY)
    }
}
