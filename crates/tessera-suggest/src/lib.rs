//! # tessera-suggest
//!
//! The suggestion pipeline: lexical connection suggestions, board
//! suggestions for unassigned items, reflection prompts ("starter bubbles"),
//! multi-item synthesis, and the home-screen suggestion feed.
//!
//! Everything here computes ephemeral records from item snapshots. Nothing
//! is written to the store except through the explicit helpers in
//! [`commit`], which let the store re-validate invariants at write time.
//!
//! Generators that talk to a [`CompletionProvider`](tessera_core::CompletionProvider)
//! bound each call by a deadline and fall back to deterministic output on
//! any failure, so callers never see a provider error.

pub mod clusters;
pub mod commit;
pub mod config;
pub mod connections;
pub mod dismissals;
pub mod feed;
pub mod prompts;
pub mod starters;
pub mod synthesis;
pub mod token_cache;

pub use clusters::{board_name, suggest_clusters, ClusterSuggester};
pub use commit::{
    accept_cluster, accept_connection, create_synthesis_item, synthesis_sources, ClusterCommit,
    ConnectionCommit,
};
pub use config::{ClusterConfig, FeedConfig, StarterConfig, SuggestConfig};
pub use connections::{suggest_connections, ConnectionSuggester};
pub use dismissals::DismissalWindow;
pub use feed::{SuggestionFeed, NUDGE_CAPTURE};
pub use starters::{BubbleSource, RefreshOutcome, StarterGenerator, FALLBACK_LABEL};
pub use synthesis::{local_summary, SynthesisGenerator, MIN_SYNTHESIS_ITEMS};
pub use token_cache::TokenCache;
