//! Home-screen suggestion feed.
//!
//! One `build` call looks at an item snapshot and proposes, in priority
//! order: continuing the latest item, connecting it to a related one,
//! revisiting a stale item, synthesizing a large board, and capturing
//! something new. Keys of surfaced suggestions are remembered in a rolling
//! window so consecutive calls rotate through candidates instead of
//! repeating themselves.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, instrument};
use uuid::Uuid;

use tessera_core::{Board, Item, Suggestion, SuggestionKind};

use crate::config::{days_before, FeedConfig};
use crate::connections::ConnectionSuggester;
use crate::dismissals::DismissalWindow;

/// `nudge_id` of the capture nudge.
pub const NUDGE_CAPTURE: &str = "capture";

/// Connection candidates considered per `build` call.
const CONNECT_CANDIDATES: usize = 5;

/// Builds deduplicated [`Suggestion`] lists.
pub struct SuggestionFeed {
    config: FeedConfig,
    suggester: Arc<ConnectionSuggester>,
    /// Recently surfaced dedup keys, oldest first.
    surfaced: VecDeque<String>,
}

impl SuggestionFeed {
    pub fn new(config: FeedConfig, suggester: Arc<ConnectionSuggester>) -> Self {
        Self {
            config,
            suggester,
            surfaced: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Forget every surfaced key.
    pub fn reset(&mut self) {
        self.surfaced.clear();
    }

    /// Build up to `max_results` suggestions as of `now`.
    ///
    /// Each kind contributes at most one suggestion: the first of its
    /// candidates whose key was not surfaced recently.
    #[instrument(skip_all, fields(subsystem = "suggest", component = "feed", op = "build", input_count = items.len(), result_count = tracing::field::Empty))]
    pub fn build(
        &mut self,
        items: &[Item],
        boards: &[Board],
        dismissals: Option<&DismissalWindow>,
        now: DateTime<Utc>,
        max_results: usize,
    ) -> Vec<Suggestion> {
        let mut by_recency: Vec<&Item> = items.iter().collect();
        by_recency.sort_by(|a, b| {
            b.updated_at_utc
                .cmp(&a.updated_at_utc)
                .then(a.id.cmp(&b.id))
        });
        let recent_cutoff = days_before(now, self.config.recent_window_days);
        let latest = by_recency
            .first()
            .copied()
            .filter(|i| i.updated_at_utc > recent_cutoff);

        let candidates: [Vec<Suggestion>; 5] = [
            latest.map(|i| vec![continue_suggestion(i, now)]).unwrap_or_default(),
            latest
                .map(|i| self.connect_suggestions(i, items, dismissals))
                .unwrap_or_default(),
            self.revisit_suggestions(&by_recency, now),
            self.synthesize_suggestions(items, boards),
            self.nudge_suggestions(items, recent_cutoff),
        ];

        let mut out = Vec::new();
        for group in candidates {
            if out.len() >= max_results {
                break;
            }
            if let Some(pick) = group
                .into_iter()
                .find(|s| !self.surfaced.contains(&s.dedup_key()))
            {
                self.remember(pick.dedup_key());
                out.push(pick);
            }
        }

        tracing::Span::current().record("result_count", out.len());
        debug!(surfaced = self.surfaced.len(), "Suggestion feed built");
        out
    }

    fn remember(&mut self, key: String) {
        self.surfaced.push_back(key);
        while self.surfaced.len() > self.config.dedup_window {
            self.surfaced.pop_front();
        }
    }

    fn connect_suggestions(
        &self,
        latest: &Item,
        items: &[Item],
        dismissals: Option<&DismissalWindow>,
    ) -> Vec<Suggestion> {
        self.suggester
            .suggest(latest, items, CONNECT_CANDIDATES, dismissals)
            .into_iter()
            .map(|c| Suggestion {
                kind: SuggestionKind::Connect,
                title: format!(
                    "Connect \"{}\" and \"{}\"",
                    title_of(latest),
                    title_of(&c.item)
                ),
                reason: c.reason,
                item_id: Some(latest.id),
                related_item_id: Some(c.item.id),
                board_id: None,
                nudge_id: None,
            })
            .collect()
    }

    /// Stale items, oldest first.
    fn revisit_suggestions(&self, by_recency: &[&Item], now: DateTime<Utc>) -> Vec<Suggestion> {
        let cutoff = days_before(now, self.config.stale_after_days);
        by_recency
            .iter()
            .rev()
            .filter(|i| i.updated_at_utc <= cutoff)
            .map(|i| Suggestion {
                kind: SuggestionKind::Revisit,
                title: format!("Revisit \"{}\"", title_of(i)),
                reason: format!(
                    "Untouched for {} days",
                    (now - i.updated_at_utc).num_days()
                ),
                item_id: Some(i.id),
                related_item_id: None,
                board_id: None,
                nudge_id: None,
            })
            .collect()
    }

    /// Boards large enough to synthesize, biggest first.
    fn synthesize_suggestions(&self, items: &[Item], boards: &[Board]) -> Vec<Suggestion> {
        let mut counts: HashMap<Uuid, usize> = HashMap::new();
        for board_id in items.iter().flat_map(|i| i.board_ids.iter()) {
            *counts.entry(*board_id).or_default() += 1;
        }
        let mut eligible: Vec<(&Board, usize)> = boards
            .iter()
            .filter_map(|b| counts.get(&b.id).map(|n| (b, *n)))
            .filter(|(_, n)| *n >= self.config.synthesize_min_board_items)
            .collect();
        eligible.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then(a.0.sort_order.cmp(&b.0.sort_order))
                .then(a.0.id.cmp(&b.0.id))
        });
        eligible
            .into_iter()
            .map(|(board, n)| Suggestion {
                kind: SuggestionKind::Synthesize,
                title: format!("Synthesize {}", board.name),
                reason: format!("{} items on this board", n),
                item_id: None,
                related_item_id: None,
                board_id: Some(board.id),
                nudge_id: None,
            })
            .collect()
    }

    fn nudge_suggestions(&self, items: &[Item], recent_cutoff: DateTime<Utc>) -> Vec<Suggestion> {
        if items.iter().any(|i| i.created_at_utc > recent_cutoff) {
            return Vec::new();
        }
        let reason = if items.is_empty() {
            "Your library is empty".to_string()
        } else {
            format!(
                "Nothing new in the last {} days",
                self.config.recent_window_days
            )
        };
        vec![Suggestion {
            kind: SuggestionKind::Nudge,
            title: "Capture something new".to_string(),
            reason,
            item_id: None,
            related_item_id: None,
            board_id: None,
            nudge_id: Some(NUDGE_CAPTURE.to_string()),
        }]
    }
}

fn continue_suggestion(item: &Item, now: DateTime<Utc>) -> Suggestion {
    let days = (now - item.updated_at_utc).num_days();
    let reason = match days {
        d if d <= 0 => "Updated today".to_string(),
        1 => "Updated yesterday".to_string(),
        d => format!("Updated {} days ago", d),
    };
    Suggestion {
        kind: SuggestionKind::Continue,
        title: format!("Continue \"{}\"", title_of(item)),
        reason,
        item_id: Some(item.id),
        related_item_id: None,
        board_id: None,
        nudge_id: None,
    }
}

fn title_of(item: &Item) -> &str {
    match item.title.trim() {
        "" => "Untitled",
        title => title,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn feed() -> SuggestionFeed {
        SuggestionFeed::new(FeedConfig::default(), Arc::new(ConnectionSuggester::default()))
    }

    fn board(name: &str) -> Board {
        Board {
            id: Uuid::new_v4(),
            name: name.to_string(),
            icon: None,
            color: None,
            sort_order: 0,
            created_at_utc: Utc::now(),
        }
    }

    fn aged(title: &str, body: &str, days: i64, now: DateTime<Utc>) -> Item {
        let at = now - Duration::days(days);
        Item::new(title, body).with_timestamps(at, at)
    }

    #[test]
    fn test_empty_library_gets_capture_nudge() {
        let out = feed().build(&[], &[], None, Utc::now(), 5);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SuggestionKind::Nudge);
        assert_eq!(out[0].nudge_id.as_deref(), Some(NUDGE_CAPTURE));
    }

    #[test]
    fn test_kinds_in_priority_order() {
        let now = Utc::now();
        let shelf = board("Reading");
        let mut items = vec![
            aged("Raft consensus", "leader election replicated log", 0, now),
            aged("Raft notes", "leader election replicated log", 2, now),
            aged("Old recipe", "sourdough starter", 60, now),
        ];
        for n in 0..5 {
            items.push(aged(&format!("Book {}", n), "chapter", 10, now).with_boards([shelf.id]));
        }

        let out = feed().build(&items, &[shelf.clone()], None, now, 10);
        let kinds: Vec<_> = out.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionKind::Continue,
                SuggestionKind::Connect,
                SuggestionKind::Revisit,
                SuggestionKind::Synthesize,
            ]
        );
        assert_eq!(out[1].related_item_id, Some(items[1].id));
        assert_eq!(out[2].item_id, Some(items[2].id));
        assert_eq!(out[3].board_id, Some(shelf.id));
    }

    #[test]
    fn test_repeat_calls_rotate_instead_of_repeating() {
        let now = Utc::now();
        let items = vec![
            aged("First stale", "", 90, now),
            aged("Second stale", "", 45, now),
        ];
        let mut feed = feed();

        let first = feed.build(&items, &[], None, now, 5);
        let second = feed.build(&items, &[], None, now, 5);
        let third = feed.build(&items, &[], None, now, 5);

        let revisit = |out: &[Suggestion]| {
            out.iter()
                .find(|s| s.kind == SuggestionKind::Revisit)
                .and_then(|s| s.item_id)
        };
        assert_eq!(revisit(&first), Some(items[0].id));
        assert_eq!(revisit(&second), Some(items[1].id));
        assert_eq!(revisit(&third), None);
        assert!(first.iter().any(|s| s.kind == SuggestionKind::Nudge));
        assert!(!second.iter().any(|s| s.kind == SuggestionKind::Nudge));
    }

    #[test]
    fn test_huge_day_windows_do_not_overflow() {
        let now = Utc::now();
        let config = FeedConfig {
            recent_window_days: i64::MAX,
            stale_after_days: 100_000_000,
            ..FeedConfig::default()
        };
        let mut feed = SuggestionFeed::new(config, Arc::new(ConnectionSuggester::default()));
        let items = vec![aged("Old note", "", 400, now)];

        let out = feed.build(&items, &[], None, now, 5);
        assert_eq!(out[0].kind, SuggestionKind::Continue);
        assert!(out.iter().all(|s| s.kind != SuggestionKind::Revisit));
    }

    #[test]
    fn test_max_results_caps_output() {
        let now = Utc::now();
        let items = vec![aged("Fresh", "", 0, now), aged("Stale", "", 40, now)];
        let out = feed().build(&items, &[], None, now, 1);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SuggestionKind::Continue);
    }

    #[test]
    fn test_small_boards_are_not_synthesized() {
        let now = Utc::now();
        let shelf = board("Tiny");
        let items: Vec<Item> = (0..4)
            .map(|n| aged(&format!("n{}", n), "", 10, now).with_boards([shelf.id]))
            .collect();
        let out = feed().build(&items, &[shelf], None, now, 10);
        assert!(out.iter().all(|s| s.kind != SuggestionKind::Synthesize));
    }
}
