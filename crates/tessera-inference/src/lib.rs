//! # tessera-inference
//!
//! Completion provider backends for tessera.
//!
//! This crate provides:
//! - Ollama implementation of [`CompletionProvider`] (default)
//! - OpenAI-compatible implementation (optional, feature `openai`)
//! - A scriptable mock provider (feature `mock`)
//! - Provider selection from the environment and deadline-bounded calls
//!
//! # Feature Flags
//!
//! - `ollama` (default): Enable Ollama backend
//! - `openai`: Enable OpenAI-compatible backend
//! - `mock`: Enable [`mock::MockProvider`]
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tessera_inference::{complete_within, OllamaProvider};
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = OllamaProvider::from_env();
//!     let reply = complete_within(
//!         Some(&provider),
//!         Duration::from_secs(20),
//!         "You write short reflection prompts.",
//!         "Three recent notes are about Raft.",
//!     )
//!     .await;
//!     println!("{:?}", reply.map(|c| c.text));
//! }
//! ```

pub mod provider;

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "openai")]
pub mod openai;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export core types
pub use tessera_core::{Completion, CompletionProvider, Error, Result};

#[cfg(feature = "ollama")]
pub use ollama::OllamaProvider;

#[cfg(feature = "openai")]
pub use openai::{OpenAIConfig, OpenAIProvider};

pub use provider::{build_provider, complete_within, ProviderConfig, ProviderKind};
