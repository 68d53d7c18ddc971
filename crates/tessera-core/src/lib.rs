//! # tessera-core
//!
//! Core types, traits, and text utilities for the tessera suggestion pipeline.
//!
//! This crate provides the data model shared by every other tessera crate
//! (items, tags, boards, connections and the ephemeral suggestion records),
//! the store and completion-provider traits, and the pure lexical helpers
//! (tokenizer and Jaccard scorer) the suggesters are built on.
//!
//! ## Log Level Contract
//!
//! Every tessera crate logs through `tracing` with `subsystem`, `component`
//! and `op` fields on its instrumented entry points.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (startup, shutdown), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |
//! | TRACE | Per-item iteration, high-volume data (candidates, tokens) |

pub mod defaults;
pub mod error;
pub mod models;
pub mod similarity;
pub mod tokenizer;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use similarity::jaccard;
pub use tokenizer::{extract_keywords, is_stop_word, tokenize, tokenize_with_min, TokenSet};
pub use traits::*;
