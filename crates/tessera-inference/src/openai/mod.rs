//! OpenAI-compatible completion provider.
//!
//! Works with any endpoint exposing `/chat/completions`: the OpenAI cloud
//! API, OpenRouter, vLLM, LocalAI, LM Studio, or Ollama in compatibility
//! mode.

mod backend;
mod types;

pub use backend::{OpenAIConfig, OpenAIProvider, DEFAULT_GEN_MODEL, DEFAULT_OPENAI_URL};
pub use types::*;
