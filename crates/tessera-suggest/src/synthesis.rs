//! Multi-item synthesis.
//!
//! The provider is asked once for a markdown synthesis. Without a provider,
//! or when it fails or times out, a deterministic local summary is built from
//! the item titles, the tags shared across the set, and the connections that
//! already exist between the items.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use tessera_core::{CompletionProvider, ConnectionDirection, Error, Item, Result, SynthesisResult};
use tessera_inference::complete_within;

use crate::config::StarterConfig;
use crate::prompts::{excerpt, SYNTHESIS_SYSTEM_PROMPT};

/// Minimum number of distinct items a synthesis covers.
pub const MIN_SYNTHESIS_ITEMS: usize = 2;

const DEFAULT_SCOPE_TITLE: &str = "Synthesis";

/// Produces [`SynthesisResult`]s for a set of items.
pub struct SynthesisGenerator {
    provider: Option<Arc<dyn CompletionProvider>>,
    config: StarterConfig,
}

impl SynthesisGenerator {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, config: StarterConfig) -> Self {
        Self { provider, config }
    }

    /// Synthesize `items` under `scope_title`.
    ///
    /// Duplicate items are ignored. Fewer than two distinct items is a caller
    /// error and fails with `Error::InvalidInput` before the provider is
    /// contacted.
    #[instrument(skip_all, fields(subsystem = "suggest", component = "synthesis", op = "generate", input_count = items.len()))]
    pub async fn generate(&self, items: &[Item], scope_title: &str) -> Result<SynthesisResult> {
        let items = distinct(items);
        if items.len() < MIN_SYNTHESIS_ITEMS {
            return Err(Error::InvalidInput(format!(
                "synthesis needs at least {} items, got {}",
                MIN_SYNTHESIS_ITEMS,
                items.len()
            )));
        }
        let start = Instant::now();
        let source_item_ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

        let prompt = build_prompt(&items, scope_title, self.config.excerpt_chars);
        let completion = complete_within(
            self.provider.as_deref(),
            self.config.deadline,
            SYNTHESIS_SYSTEM_PROMPT,
            &prompt,
        )
        .await;

        let result = match completion {
            Some(completion) => SynthesisResult {
                markdown: completion.text.trim().to_string(),
                source_item_ids,
                is_llm_generated: true,
            },
            None => {
                if self.provider.is_some() {
                    warn!("Synthesis provider gave no result, using local summary");
                }
                SynthesisResult {
                    markdown: local_summary(&items, scope_title),
                    source_item_ids,
                    is_llm_generated: false,
                }
            }
        };

        info!(
            is_llm_generated = result.is_llm_generated,
            result_count = result.source_item_ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Synthesis generated"
        );
        Ok(result)
    }
}

/// Items in input order with repeated ids dropped.
fn distinct(items: &[Item]) -> Vec<&Item> {
    let mut seen = HashSet::new();
    items.iter().filter(|i| seen.insert(i.id)).collect()
}

fn build_prompt(items: &[&Item], scope_title: &str, excerpt_chars: usize) -> String {
    let mut prompt = String::new();
    let scope = scope_title.trim();
    if !scope.is_empty() {
        let _ = writeln!(prompt, "Scope: {}\n", scope);
    }
    for (n, item) in items.iter().enumerate() {
        let _ = writeln!(prompt, "Note {}: {}", n + 1, display_title(item));
        if !item.tags.is_empty() {
            let tags: Vec<&str> = item.tags.iter().map(String::as_str).collect();
            let _ = writeln!(prompt, "Tags: {}", tags.join(", "));
        }
        if let Some(reflection) = item.reflection() {
            let _ = writeln!(prompt, "Reflection: {}", excerpt(reflection, excerpt_chars));
        }
        let body = excerpt(&item.body, excerpt_chars);
        if !body.is_empty() {
            let _ = writeln!(prompt, "Excerpt: {}", body);
        }
        prompt.push('\n');
    }
    prompt
}

fn display_title(item: &Item) -> &str {
    match item.title.trim() {
        "" => "Untitled",
        title => title,
    }
}

/// Deterministic markdown summary used when no provider result is available.
pub fn local_summary(items: &[&Item], scope_title: &str) -> String {
    let heading = match scope_title.trim() {
        "" => DEFAULT_SCOPE_TITLE,
        scope => scope,
    };
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", heading);

    out.push_str("## Items\n\n");
    for item in items {
        let _ = write!(out, "- {}", display_title(item));
        if !item.tags.is_empty() {
            let tags: Vec<String> = item.tags.iter().map(|t| format!("#{}", t)).collect();
            let _ = write!(out, " ({})", tags.join(" "));
        }
        out.push('\n');
        if let Some(reflection) = item.reflection() {
            let _ = writeln!(out, "  > {}", excerpt(reflection, 200));
        }
    }

    out.push_str("\n## Shared tags\n\n");
    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for tag in items.iter().flat_map(|i| i.tags.iter()) {
        *tag_counts.entry(tag.as_str()).or_default() += 1;
    }
    let shared: Vec<String> = tag_counts
        .into_iter()
        .filter(|(_, n)| *n >= 2)
        .map(|(tag, n)| format!("- {} ({} items)", tag, n))
        .collect();
    if shared.is_empty() {
        out.push_str("_None_\n");
    } else {
        let _ = writeln!(out, "{}", shared.join("\n"));
    }

    out.push_str("\n## Connections\n\n");
    let by_id: HashMap<Uuid, &Item> = items.iter().map(|i| (i.id, *i)).collect();
    let mut seen = HashSet::new();
    let mut edges = Vec::new();
    for item in items {
        for conn in &item.connections {
            let Some(other) = by_id.get(&conn.item_id) else {
                continue;
            };
            if !seen.insert(conn.connection_id) {
                continue;
            }
            let (from, to) = match conn.direction {
                ConnectionDirection::Outgoing => (*item, *other),
                ConnectionDirection::Incoming => (*other, *item),
            };
            let mut line = format!("- {} -> {}", display_title(from), display_title(to));
            if let Some(reason) = conn.reason.as_deref().filter(|r| !r.trim().is_empty()) {
                let _ = write!(line, ": {}", reason.trim());
            }
            edges.push(line);
        }
    }
    if edges.is_empty() {
        out.push_str("_None_\n");
    } else {
        let _ = writeln!(out, "{}", edges.join("\n"));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::{ConnectionRef, META_REFLECTION};
    use tessera_inference::mock::{MockProvider, MockReply};

    fn pair() -> (Item, Item) {
        let mut a = Item::new("Raft", "leader election")
            .with_tags(["consensus", "distributed"])
            .with_metadata(META_REFLECTION, "simpler than paxos");
        let mut b = Item::new("Paxos", "").with_tags(["consensus"]);
        let connection_id = Uuid::new_v4();
        a.connections.push(ConnectionRef {
            connection_id,
            item_id: b.id,
            direction: ConnectionDirection::Outgoing,
            reason: Some("same problem".to_string()),
        });
        b.connections.push(ConnectionRef {
            connection_id,
            item_id: a.id,
            direction: ConnectionDirection::Incoming,
            reason: Some("same problem".to_string()),
        });
        (a, b)
    }

    #[tokio::test]
    async fn test_rejects_fewer_than_two_distinct_items() {
        let generator = SynthesisGenerator::new(None, StarterConfig::default());
        let item = Item::new("alone", "");
        let err = generator
            .generate(&[item.clone(), item], "scope")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_no_provider_uses_local_summary() {
        let (a, b) = pair();
        let generator = SynthesisGenerator::new(None, StarterConfig::default());
        let result = generator.generate(&[a.clone(), b.clone()], "Consensus").await.unwrap();

        assert!(!result.is_llm_generated);
        assert_eq!(result.source_item_ids, vec![a.id, b.id]);
        assert!(result.markdown.starts_with("# Consensus"));
        assert!(result.markdown.contains("- Raft (#consensus #distributed)"));
        assert!(result.markdown.contains("> simpler than paxos"));
        assert!(result.markdown.contains("- consensus (2 items)"));
        assert!(!result.markdown.contains("- distributed ("));
        assert_eq!(result.markdown.matches("- Raft -> Paxos: same problem").count(), 1);
    }

    #[tokio::test]
    async fn test_provider_result_is_flagged() {
        let (a, b) = pair();
        let provider = MockProvider::new().with_fixed_response("  # Consensus\n\nBoth solve agreement.\n");
        let generator = SynthesisGenerator::new(
            Some(Arc::new(provider.clone())),
            StarterConfig::default(),
        );
        let result = generator.generate(&[a, b], "Consensus").await.unwrap();

        assert!(result.is_llm_generated);
        assert_eq!(result.markdown, "# Consensus\n\nBoth solve agreement.");
        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Reflection: simpler than paxos"));
        assert!(calls[0].prompt.contains("Tags: consensus, distributed"));
    }

    #[tokio::test]
    async fn test_provider_failure_falls_back() {
        let (a, b) = pair();
        let provider = MockProvider::new().with_reply(MockReply::failure());
        let generator = SynthesisGenerator::new(Some(Arc::new(provider)), StarterConfig::default());
        let result = generator.generate(&[a, b], "").await.unwrap();

        assert!(!result.is_llm_generated);
        assert!(result.markdown.starts_with("# Synthesis"));
    }

    #[test]
    fn test_local_summary_without_shared_data() {
        let a = Item::new("", "one");
        let b = Item::new("Two", "two");
        let md = local_summary(&[&a, &b], "");
        assert!(md.contains("- Untitled\n"));
        assert_eq!(md.matches("_None_").count(), 2);
    }
}
