//! Reflection prompt ("starter bubble") generation.
//!
//! `refresh` builds a context payload from the item snapshot (recent items,
//! contradicting connections, unconnected recent items, stale items) and asks
//! the completion provider for a JSON array of `{prompt, label, context_id?}`.
//! At most [`StarterConfig::max_bubbles`] bubbles are kept. When there is no
//! provider, or its reply is unusable, exactly one templated bubble replaces
//! the set.
//!
//! Overlapping refreshes follow cancel-and-replace: each call takes a number
//! from a monotonically increasing counter, and its result is committed only
//! if no newer call has committed already. A slow older call can therefore
//! never overwrite a fresher result.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use tessera_core::{CompletionProvider, ConnectionDirection, Item, PromptBubble};
use tessera_inference::complete_within;

use crate::config::{days_before, StarterConfig};
use crate::prompts::{excerpt, json_array_span, STARTER_SYSTEM_PROMPT};

/// Label used for the templated fallback bubble.
pub const FALLBACK_LABEL: &str = "Reflect";

/// Where the committed bubbles came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BubbleSource {
    Provider,
    Fallback,
}

/// Result of one `refresh` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshOutcome {
    pub generation: u64,
    /// `false` when a newer refresh had already committed.
    pub committed: bool,
    pub source: BubbleSource,
    pub bubble_count: usize,
}

#[derive(Default)]
struct StarterState {
    committed_generation: u64,
    bubbles: Vec<PromptBubble>,
}

/// One entry of a provider reply.
#[derive(Debug, Deserialize)]
struct RawBubble {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    context_id: Option<String>,
}

/// Signals extracted from an item snapshot.
struct StarterContext<'a> {
    recent: Vec<&'a Item>,
    contradictions: Vec<(&'a Item, &'a Item)>,
    gaps: Vec<&'a Item>,
    stale: Vec<&'a Item>,
}

impl<'a> StarterContext<'a> {
    fn build(items: &'a [Item], config: &StarterConfig, now: DateTime<Utc>) -> Self {
        let mut by_recency: Vec<&Item> = items.iter().collect();
        by_recency.sort_by(|a, b| {
            b.updated_at_utc
                .cmp(&a.updated_at_utc)
                .then(a.id.cmp(&b.id))
        });
        let by_id: HashMap<Uuid, &Item> = items.iter().map(|i| (i.id, i)).collect();

        let recent: Vec<&Item> = by_recency.iter().copied().take(config.recent_items).collect();

        let by_id = &by_id;
        let contradictions: Vec<(&Item, &Item)> = by_recency
            .iter()
            .flat_map(|&item| {
                item.connections
                    .iter()
                    .filter(|c| c.direction == ConnectionDirection::Outgoing)
                    .filter(|c| {
                        c.reason
                            .as_deref()
                            .is_some_and(|r| r.to_lowercase().contains("contradict"))
                    })
                    .filter_map(move |c| by_id.get(&c.item_id).map(|&other| (item, other)))
            })
            .take(config.signal_items)
            .collect();

        let gaps: Vec<&Item> = recent
            .iter()
            .copied()
            .filter(|i| i.connections.is_empty())
            .take(config.signal_items)
            .collect();

        let stale_cutoff = days_before(now, config.stale_after_days);
        let stale: Vec<&Item> = by_recency
            .iter()
            .rev()
            .copied()
            .filter(|i| i.updated_at_utc <= stale_cutoff)
            .take(config.signal_items)
            .collect();

        Self {
            recent,
            contradictions,
            gaps,
            stale,
        }
    }

    fn is_empty(&self) -> bool {
        self.recent.is_empty()
    }

    /// Partner of a contradiction involving `id`, if any.
    fn contradiction_partner(&self, id: Uuid) -> Option<&'a Item> {
        self.contradictions.iter().find_map(|(a, b)| {
            if a.id == id {
                Some(*b)
            } else if b.id == id {
                Some(*a)
            } else {
                None
            }
        })
    }

    fn payload(&self, excerpt_chars: usize) -> serde_json::Value {
        let entry = |item: &Item| {
            let mut value = json!({
                "context_id": item.id.to_string(),
                "title": item.title,
                "tags": item.tags,
                "excerpt": excerpt(&item.body, excerpt_chars),
            });
            if let Some(reflection) = item.reflection() {
                value["reflection"] = json!(excerpt(reflection, excerpt_chars));
            }
            value
        };

        json!({
            "recent": self.recent.iter().map(|i| entry(*i)).collect::<Vec<_>>(),
            "contradictions": self.contradictions.iter().map(|(a, b)| json!({
                "context_id": a.id.to_string(),
                "title": a.title,
                "contradicts_context_id": b.id.to_string(),
                "contradicts_title": b.title,
            })).collect::<Vec<_>>(),
            "knowledge_gaps": self.gaps.iter().map(|i| entry(*i)).collect::<Vec<_>>(),
            "stale": self.stale.iter().map(|i| json!({
                "context_id": i.id.to_string(),
                "title": i.title,
                "last_updated": i.updated_at_utc.to_rfc3339(),
            })).collect::<Vec<_>>(),
        })
    }
}

/// Generates and caches reflection prompts.
pub struct StarterGenerator {
    provider: Option<Arc<dyn CompletionProvider>>,
    config: StarterConfig,
    issued: AtomicU64,
    state: RwLock<StarterState>,
}

impl StarterGenerator {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, config: StarterConfig) -> Self {
        Self {
            provider,
            config,
            issued: AtomicU64::new(0),
            state: RwLock::new(StarterState::default()),
        }
    }

    pub fn has_provider(&self) -> bool {
        self.provider.is_some()
    }

    /// Regenerate bubbles from `items`.
    pub async fn refresh(&self, items: &[Item]) -> RefreshOutcome {
        self.refresh_at(items, Utc::now()).await
    }

    /// Regenerate bubbles as of `now`.
    #[instrument(skip_all, fields(subsystem = "suggest", component = "starters", op = "refresh", input_count = items.len(), generation = tracing::field::Empty))]
    pub async fn refresh_at(&self, items: &[Item], now: DateTime<Utc>) -> RefreshOutcome {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::Span::current().record("generation", generation);
        let start = Instant::now();

        let context = StarterContext::build(items, &self.config, now);
        let from_provider = if context.is_empty() {
            None
        } else {
            let prompt = context.payload(self.config.excerpt_chars).to_string();
            complete_within(
                self.provider.as_deref(),
                self.config.deadline,
                STARTER_SYSTEM_PROMPT,
                &prompt,
            )
            .await
            .map(|completion| self.parse_reply(&completion.text, &context))
            .filter(|bubbles| !bubbles.is_empty())
        };

        let (bubbles, source) = match from_provider {
            Some(bubbles) => (bubbles, BubbleSource::Provider),
            None => {
                if self.provider.is_some() {
                    warn!(generation, "No usable starter reply, using templated bubble");
                }
                (vec![fallback_bubble(&context)], BubbleSource::Fallback)
            }
        };
        let bubble_count = bubbles.len();

        let mut state = self.state.write().await;
        let committed = generation > state.committed_generation;
        if committed {
            state.committed_generation = generation;
            state.bubbles = bubbles;
            info!(
                generation,
                bubble_count,
                source = ?source,
                duration_ms = start.elapsed().as_millis() as u64,
                "Starter bubbles refreshed"
            );
        } else {
            debug!(
                generation,
                committed_generation = state.committed_generation,
                "Discarding stale starter refresh"
            );
        }

        RefreshOutcome {
            generation,
            committed,
            source,
            bubble_count,
        }
    }

    /// Cached bubbles, optionally only those tied to `for_board`.
    pub async fn bubbles(&self, for_board: Option<Uuid>, max_results: usize) -> Vec<PromptBubble> {
        let state = self.state.read().await;
        state
            .bubbles
            .iter()
            .filter(|b| for_board.map_or(true, |board| b.board_ids.contains(&board)))
            .take(max_results)
            .cloned()
            .collect()
    }

    /// Map a provider reply to bubbles: drop blanks and duplicates, cap.
    fn parse_reply(&self, reply: &str, context: &StarterContext<'_>) -> Vec<PromptBubble> {
        let Some(span) = json_array_span(reply) else {
            debug!("Starter reply has no JSON array");
            return Vec::new();
        };
        let raw: Vec<RawBubble> = match serde_json::from_str(span) {
            Ok(raw) => raw,
            Err(e) => {
                debug!(error = %e, "Starter reply is not a bubble array");
                return Vec::new();
            }
        };

        let known: HashMap<Uuid, &Item> = context
            .recent
            .iter()
            .chain(context.gaps.iter())
            .chain(context.stale.iter())
            .chain(context.contradictions.iter().flat_map(|(a, b)| [a, b]))
            .map(|i| (i.id, *i))
            .collect();

        let mut seen: HashSet<String> = HashSet::new();
        raw.into_iter()
            .filter_map(|r| {
                let prompt = r.prompt.trim().to_string();
                if prompt.is_empty() || !seen.insert(normalize_prompt(&prompt)) {
                    return None;
                }
                let mut seeds: Vec<&Item> = Vec::new();
                if let Some(item) = r
                    .context_id
                    .as_deref()
                    .and_then(|id| Uuid::parse_str(id.trim()).ok())
                    .and_then(|id| known.get(&id).copied())
                {
                    seeds.push(item);
                    seeds.extend(context.contradiction_partner(item.id));
                }
                let label = match r.label.trim() {
                    "" => FALLBACK_LABEL.to_string(),
                    label => label.to_string(),
                };
                Some(bubble_from_seeds(prompt, label, &seeds))
            })
            .take(self.config.max_bubbles)
            .collect()
    }
}

fn normalize_prompt(prompt: &str) -> String {
    prompt
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Most common tag among `seeds`, ties broken alphabetically.
fn dominant_tag(seeds: &[&Item]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in seeds.iter().flat_map(|i| i.tags.iter()) {
        *counts.entry(tag.as_str()).or_default() += 1;
    }
    let best = counts.values().copied().max()?;
    counts
        .into_iter()
        .find(|(_, n)| *n == best)
        .map(|(tag, _)| tag.to_string())
}

fn bubble_from_seeds(prompt: String, label: String, seeds: &[&Item]) -> PromptBubble {
    PromptBubble {
        prompt,
        label,
        cluster_tag: dominant_tag(seeds),
        seed_item_ids: seeds.iter().map(|i| i.id).collect(),
        board_ids: seeds
            .iter()
            .flat_map(|i| i.board_ids.iter().copied())
            .collect::<BTreeSet<_>>(),
    }
}

/// The single templated bubble used when the provider gives nothing.
fn fallback_bubble(context: &StarterContext<'_>) -> PromptBubble {
    match context.recent.first() {
        Some(latest) => {
            let title = latest.title.trim();
            let prompt = if title.is_empty() {
                "What stood out to you in your latest note?".to_string()
            } else {
                format!("What stood out to you in \"{}\"?", title)
            };
            bubble_from_seeds(prompt, FALLBACK_LABEL.to_string(), &[*latest])
        }
        None => bubble_from_seeds(
            "What's on your mind today?".to_string(),
            FALLBACK_LABEL.to_string(),
            &[],
        ),
    }
}
