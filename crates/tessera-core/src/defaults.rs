//! Centralized default constants for tessera.
//!
//! **This module is the single source of truth** for shared default values.
//! Config structs in the other crates build their `Default` impls from these
//! constants and only override them from `TESSERA_*` environment variables.

// =============================================================================
// TOKENIZER
// =============================================================================

/// Minimum token length (in characters) kept by the tokenizer.
pub const TOKEN_MIN_LENGTH: usize = 3;

/// Number of keywords returned by `extract_keywords` when no limit is given.
pub const KEYWORD_TOP_K: usize = 20;

// =============================================================================
// CONNECTION SUGGESTIONS
// =============================================================================

/// Candidates must score strictly above this Jaccard floor to be suggested.
pub const CONNECTION_MIN_SCORE: f32 = 0.1;

/// Default number of connection suggestions returned per item.
pub const CONNECTION_LIMIT: usize = 5;

/// How long a dismissed (item, candidate) pair stays suppressed, in days.
pub const DISMISSAL_WINDOW_DAYS: i64 = 7;

/// Maximum number of dismissals remembered at once.
pub const DISMISSAL_CAPACITY: usize = 200;

/// Number of per-item token sets kept in the token cache.
pub const TOKEN_CACHE_CAPACITY: usize = 1024;

// =============================================================================
// CLUSTER SUGGESTIONS
// =============================================================================

/// Smallest group of unassigned items surfaced as a board suggestion.
pub const MIN_CLUSTER_SIZE: usize = 3;

/// Keywords extracted per item when grouping unassigned items.
pub const CLUSTER_KEYWORD_TOP_K: usize = 5;

// =============================================================================
// STARTERS
// =============================================================================

/// Hard cap on bubbles kept from a provider response.
pub const MAX_BUBBLES: usize = 3;

/// Recent items included in the starter context payload.
pub const STARTER_RECENT_ITEMS: usize = 8;

/// Items listed per signal (contradictions, gaps, stale) in the starter payload.
pub const STARTER_SIGNAL_ITEMS: usize = 3;

/// Characters of body text included per item in provider prompts.
pub const PROMPT_EXCERPT_CHARS: usize = 280;

// =============================================================================
// ACTIVITY WINDOWS
// =============================================================================

/// Items untouched for this many days count as stale.
pub const STALE_AFTER_DAYS: i64 = 30;

/// Items touched within this many days count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 7;

/// Upper bound on any day-count window (about ten years).
pub const MAX_WINDOW_DAYS: i64 = 3650;

// =============================================================================
// SUGGESTION FEED
// =============================================================================

/// Rolling number of surfaced suggestion keys suppressed from repeats.
pub const SUGGESTION_DEDUP_WINDOW: usize = 50;

/// Default number of feed suggestions returned.
pub const SUGGESTION_LIMIT: usize = 5;

/// A board needs at least this many items before synthesis is suggested.
pub const SYNTHESIZE_MIN_BOARD_ITEMS: usize = 5;

// =============================================================================
// INFERENCE
// =============================================================================

/// Default Ollama base URL.
pub const OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Default generation model name (Ollama).
pub const GEN_MODEL: &str = "llama3.1:8b";

/// Timeout for generation requests at the HTTP layer, in seconds.
pub const GEN_TIMEOUT_SECS: u64 = 120;

/// Default caller deadline for one provider call, in seconds.
pub const PROVIDER_DEADLINE_SECS: u64 = 20;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default page size for item listings.
pub const PAGE_LIMIT: i64 = 50;

/// Upper bound on any `limit`/`max` query parameter.
pub const PAGE_LIMIT_MAX: i64 = 500;

// =============================================================================
// DATABASE POOL
// =============================================================================

/// Connections held open by the PostgreSQL store. One user rarely needs more.
pub const DB_MAX_CONNECTIONS: u32 = 5;

/// Upper bound accepted from `TESSERA_DB_MAX_CONNECTIONS`.
pub const DB_MAX_CONNECTIONS_LIMIT: u32 = 100;

/// How long a store call waits for a free connection, in seconds.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Idle connections are closed after this many seconds.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 300;
