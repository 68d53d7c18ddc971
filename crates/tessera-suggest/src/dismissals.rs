//! Recently dismissed connection suggestions.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use tessera_core::Connection;

/// Bounded, time-limited record of dismissed item pairs.
///
/// Pairs are unordered: dismissing `(a, b)` also hides `(b, a)`. Entries
/// expire after the window and the oldest are evicted beyond capacity.
#[derive(Debug, Clone)]
pub struct DismissalWindow {
    window: Duration,
    capacity: usize,
    /// Oldest first.
    entries: VecDeque<((Uuid, Uuid), DateTime<Utc>)>,
}

impl DismissalWindow {
    pub fn new(window: Duration, capacity: usize) -> Self {
        Self {
            window,
            capacity: capacity.max(1),
            entries: VecDeque::new(),
        }
    }

    /// Record a dismissal at the current time.
    pub fn dismiss(&mut self, a: Uuid, b: Uuid) {
        self.dismiss_at(a, b, Utc::now());
    }

    pub fn dismiss_at(&mut self, a: Uuid, b: Uuid, at: DateTime<Utc>) {
        let key = Connection::pair_key(a, b);
        self.entries.retain(|(k, _)| *k != key);
        self.entries.push_back((key, at));
        self.prune(at);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn is_dismissed(&self, a: Uuid, b: Uuid) -> bool {
        self.is_dismissed_at(a, b, Utc::now())
    }

    /// Whether the pair was dismissed within the window ending at `now`.
    pub fn is_dismissed_at(&self, a: Uuid, b: Uuid, now: DateTime<Utc>) -> bool {
        let key = Connection::pair_key(a, b);
        self.entries
            .iter()
            .any(|(k, at)| *k == key && now - *at < self.window)
    }

    /// Drop entries that fell out of the window.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        while let Some((_, at)) = self.entries.front() {
            if now - *at >= self.window {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DismissalWindow {
    fn default() -> Self {
        Self::new(
            Duration::days(tessera_core::defaults::DISMISSAL_WINDOW_DAYS),
            tessera_core::defaults::DISMISSAL_CAPACITY,
        )
    }
}
