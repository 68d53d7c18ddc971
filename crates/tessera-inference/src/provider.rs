//! Provider selection and deadline-bounded completion calls.
//!
//! The suggestion pipeline treats a completion provider as optional: when
//! none is configured, or a call errors, times out, or returns blank text,
//! callers receive `None` and produce their deterministic fallback instead.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use tessera_core::defaults::PROVIDER_DEADLINE_SECS;
use tessera_core::{Completion, CompletionProvider, Error, Result};

/// Which completion backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Ollama,
    OpenAI,
    /// No provider; every generator uses its local fallback.
    None,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ollama => write!(f, "ollama"),
            Self::OpenAI => write!(f, "openai"),
            Self::None => write!(f, "none"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAI),
            "none" | "off" | "" => Ok(Self::None),
            other => Err(Error::Config(format!("Unknown provider: {}", other))),
        }
    }
}

/// Provider selection plus the caller-side deadline for each call.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub deadline: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            deadline: Duration::from_secs(PROVIDER_DEADLINE_SECS),
        }
    }
}

impl ProviderConfig {
    /// Read `TESSERA_PROVIDER` and `TESSERA_PROVIDER_DEADLINE_SECS`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(kind) = std::env::var("TESSERA_PROVIDER") {
            config.kind = kind.parse()?;
        }
        if let Ok(secs) = std::env::var("TESSERA_PROVIDER_DEADLINE_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::Config(format!("TESSERA_PROVIDER_DEADLINE_SECS is not a number: {}", secs))
            })?;
            config.deadline = Duration::from_secs(secs);
        }
        Ok(config)
    }
}

/// Construct the configured provider, or `None` when disabled.
pub fn build_provider(kind: ProviderKind) -> Result<Option<Arc<dyn CompletionProvider>>> {
    match kind {
        ProviderKind::None => Ok(None),
        #[cfg(feature = "ollama")]
        ProviderKind::Ollama => Ok(Some(Arc::new(crate::ollama::OllamaProvider::from_env()))),
        #[cfg(feature = "openai")]
        ProviderKind::OpenAI => Ok(Some(Arc::new(crate::openai::OpenAIProvider::from_env()?))),
        #[allow(unreachable_patterns)]
        other => Err(Error::Config(format!(
            "Provider '{}' is not compiled into this build",
            other
        ))),
    }
}

/// Call `provider` under `deadline`.
///
/// Returns `None` when there is no provider, the call fails or exceeds the
/// deadline, or the reply is blank. Failures are logged at warn level and
/// never propagated.
pub async fn complete_within(
    provider: Option<&dyn CompletionProvider>,
    deadline: Duration,
    system: &str,
    prompt: &str,
) -> Option<Completion> {
    let provider = provider?;
    match tokio::time::timeout(deadline, provider.complete(system, prompt)).await {
        Ok(Ok(completion)) if !completion.text.trim().is_empty() => {
            debug!(
                subsystem = "inference",
                model = %completion.model,
                response_len = completion.text.len(),
                "Provider completion received"
            );
            Some(completion)
        }
        Ok(Ok(_)) => {
            warn!(
                subsystem = "inference",
                model = provider.model_name(),
                "Provider returned empty completion, using fallback"
            );
            None
        }
        Ok(Err(e)) => {
            warn!(
                subsystem = "inference",
                model = provider.model_name(),
                error = %e,
                "Provider call failed, using fallback"
            );
            None
        }
        Err(_) => {
            warn!(
                subsystem = "inference",
                model = provider.model_name(),
                deadline_ms = deadline.as_millis() as u64,
                "Provider call exceeded deadline, using fallback"
            );
            None
        }
    }
}
