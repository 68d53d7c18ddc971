//! Tunables for the suggestion pipeline.
//!
//! Every struct defaults to the constants in `tessera_core::defaults` and
//! can be overridden from `TESSERA_*` environment variables. Invalid values
//! are logged and ignored. Day-count windows are clamped to
//! `defaults::MAX_WINDOW_DAYS`.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tessera_core::defaults;

/// `days` as a signed duration, clamped to `0..=MAX_WINDOW_DAYS`.
pub fn window_duration(days: i64) -> chrono::Duration {
    chrono::Duration::days(days.clamp(0, defaults::MAX_WINDOW_DAYS))
}

/// The instant `days` before `now`, saturating at the earliest representable time.
pub fn days_before(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    now.checked_sub_signed(window_duration(days))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Parse `key` from the environment, warning (and returning `None`) when the
/// value is present but malformed.
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "Invalid value, using default");
            None
        }
    }
}

/// Connection suggester settings.
#[derive(Debug, Clone)]
pub struct SuggestConfig {
    /// Candidates must score strictly above this floor.
    pub min_score: f32,
    /// Default result limit when the caller passes none.
    pub limit: usize,
    pub dismissal_window_days: i64,
    pub dismissal_capacity: usize,
    pub token_cache_capacity: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            min_score: defaults::CONNECTION_MIN_SCORE,
            limit: defaults::CONNECTION_LIMIT,
            dismissal_window_days: defaults::DISMISSAL_WINDOW_DAYS,
            dismissal_capacity: defaults::DISMISSAL_CAPACITY,
            token_cache_capacity: defaults::TOKEN_CACHE_CAPACITY,
        }
    }
}

impl SuggestConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(score) = env_parse::<f32>("TESSERA_CONNECTION_MIN_SCORE") {
            config.min_score = score.clamp(0.0, 1.0);
        }
        if let Some(limit) = env_parse::<usize>("TESSERA_CONNECTION_LIMIT") {
            config.limit = limit.max(1);
        }
        if let Some(days) = env_parse::<i64>("TESSERA_DISMISSAL_WINDOW_DAYS") {
            config.dismissal_window_days = days.clamp(0, defaults::MAX_WINDOW_DAYS);
        }
        config
    }

    pub fn dismissal_window(&self) -> chrono::Duration {
        window_duration(self.dismissal_window_days)
    }
}

/// Cluster suggester settings.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub min_cluster_size: usize,
    /// Keywords extracted per item as grouping keys.
    pub keyword_top_k: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: defaults::MIN_CLUSTER_SIZE,
            keyword_top_k: defaults::CLUSTER_KEYWORD_TOP_K,
        }
    }
}

impl ClusterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(size) = env_parse::<usize>("TESSERA_MIN_CLUSTER_SIZE") {
            config.min_cluster_size = size.max(2);
        }
        if let Some(k) = env_parse::<usize>("TESSERA_CLUSTER_KEYWORDS") {
            config.keyword_top_k = k;
        }
        config
    }
}

/// Starter and synthesis generator settings.
#[derive(Debug, Clone)]
pub struct StarterConfig {
    /// Hard cap on bubbles kept from one provider reply.
    pub max_bubbles: usize,
    pub recent_items: usize,
    /// Entries per signal list in the context payload.
    pub signal_items: usize,
    pub excerpt_chars: usize,
    pub stale_after_days: i64,
    /// Caller-side bound on each provider call.
    pub deadline: Duration,
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            max_bubbles: defaults::MAX_BUBBLES,
            recent_items: defaults::STARTER_RECENT_ITEMS,
            signal_items: defaults::STARTER_SIGNAL_ITEMS,
            excerpt_chars: defaults::PROMPT_EXCERPT_CHARS,
            stale_after_days: defaults::STALE_AFTER_DAYS,
            deadline: Duration::from_secs(defaults::PROVIDER_DEADLINE_SECS),
        }
    }
}

impl StarterConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env_parse::<u64>("TESSERA_PROVIDER_DEADLINE_SECS") {
            config.deadline = Duration::from_secs(secs);
        }
        if let Some(days) = env_parse::<i64>("TESSERA_STALE_AFTER_DAYS") {
            config.stale_after_days = days.clamp(1, defaults::MAX_WINDOW_DAYS);
        }
        config
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Suggestion feed settings.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// How many surfaced suggestion keys are remembered for dedup.
    pub dedup_window: usize,
    pub max_results: usize,
    pub recent_window_days: i64,
    pub stale_after_days: i64,
    pub synthesize_min_board_items: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            dedup_window: defaults::SUGGESTION_DEDUP_WINDOW,
            max_results: defaults::SUGGESTION_LIMIT,
            recent_window_days: defaults::RECENT_WINDOW_DAYS,
            stale_after_days: defaults::STALE_AFTER_DAYS,
            synthesize_min_board_items: defaults::SYNTHESIZE_MIN_BOARD_ITEMS,
        }
    }
}

impl FeedConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(days) = env_parse::<i64>("TESSERA_STALE_AFTER_DAYS") {
            config.stale_after_days = days.clamp(1, defaults::MAX_WINDOW_DAYS);
        }
        if let Some(days) = env_parse::<i64>("TESSERA_RECENT_WINDOW_DAYS") {
            config.recent_window_days = days.clamp(1, defaults::MAX_WINDOW_DAYS);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_come_from_core() {
        let suggest = SuggestConfig::default();
        assert_eq!(suggest.min_score, 0.1);
        assert_eq!(suggest.limit, 5);

        let cluster = ClusterConfig::default();
        assert_eq!(cluster.min_cluster_size, 3);

        let starter = StarterConfig::default();
        assert_eq!(starter.max_bubbles, 3);
        assert_eq!(starter.deadline, Duration::from_secs(20));
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        std::env::set_var("TESSERA_TEST_ENV_PARSE_GARBAGE", "not-a-number");
        assert_eq!(env_parse::<u64>("TESSERA_TEST_ENV_PARSE_GARBAGE"), None);
        std::env::set_var("TESSERA_TEST_ENV_PARSE_OK", " 42 ");
        assert_eq!(env_parse::<u64>("TESSERA_TEST_ENV_PARSE_OK"), Some(42));
    }

    #[test]
    fn test_day_windows_are_clamped_from_env() {
        std::env::set_var("TESSERA_RECENT_WINDOW_DAYS", "9223372036854775807");
        std::env::set_var("TESSERA_DISMISSAL_WINDOW_DAYS", "-40");
        let feed = FeedConfig::from_env();
        let suggest = SuggestConfig::from_env();
        std::env::remove_var("TESSERA_RECENT_WINDOW_DAYS");
        std::env::remove_var("TESSERA_DISMISSAL_WINDOW_DAYS");

        assert_eq!(feed.recent_window_days, defaults::MAX_WINDOW_DAYS);
        assert_eq!(suggest.dismissal_window_days, 0);
        assert_eq!(suggest.dismissal_window(), chrono::Duration::zero());
    }

    #[test]
    fn test_days_before_saturates() {
        let now = Utc::now();
        assert_eq!(days_before(now, 7), now - chrono::Duration::days(7));
        assert_eq!(
            days_before(now, i64::MAX),
            now - chrono::Duration::days(defaults::MAX_WINDOW_DAYS)
        );
        assert_eq!(
            days_before(DateTime::<Utc>::MIN_UTC, 1),
            DateTime::<Utc>::MIN_UTC
        );
        assert_eq!(window_duration(i64::MIN), chrono::Duration::zero());
    }
}
