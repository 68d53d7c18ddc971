//! Scriptable mock completion provider for deterministic testing.
//!
//! Replies are taken from a queue first, then fall back to a fixed default.
//! Latency uses `tokio::time::sleep`, so tests running with paused time can
//! order overlapping calls exactly.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tessera_inference::mock::{MockProvider, MockReply};
//!
//! let provider = MockProvider::new()
//!     .with_reply(MockReply::text("[]").after_ms(500))
//!     .with_reply(MockReply::failure());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use tessera_core::{Completion, CompletionProvider, Error, Result};

const MOCK_MODEL: &str = "mock-model";

/// One scripted provider reply.
#[derive(Debug, Clone)]
pub struct MockReply {
    outcome: std::result::Result<String, String>,
    latency: Duration,
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            latency: Duration::ZERO,
        }
    }

    pub fn failure() -> Self {
        Self {
            outcome: Err("simulated provider failure".to_string()),
            latency: Duration::ZERO,
        }
    }

    /// Delay the reply by `ms` milliseconds.
    pub fn after_ms(mut self, ms: u64) -> Self {
        self.latency = Duration::from_millis(ms);
        self
    }
}

/// A recorded call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub system: String,
    pub prompt: String,
}

#[derive(Debug, Clone)]
struct MockConfig {
    default_response: String,
    latency_ms: u64,
    failure_rate: f64,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            default_response: "Mock response".to_string(),
            latency_ms: 0,
            failure_rate: 0.0,
        }
    }
}

/// Mock provider implementing [`CompletionProvider`].
#[derive(Clone, Default)]
pub struct MockProvider {
    config: Arc<MockConfig>,
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Response used once the reply queue is empty.
    pub fn with_fixed_response(mut self, response: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.config).default_response = response.into();
        self
    }

    /// Queue a scripted reply; queued replies are consumed in call order.
    pub fn with_reply(self, reply: MockReply) -> Self {
        self.push_reply(reply);
        self
    }

    /// Queue a scripted reply on a shared provider.
    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Latency applied to unscripted replies.
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        Arc::make_mut(&mut self.config).latency_ms = latency_ms;
        self
    }

    /// Probability (0.0 - 1.0) that an unscripted reply fails.
    pub fn with_failure_rate(mut self, rate: f64) -> Self {
        Arc::make_mut(&mut self.config).failure_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.call_log.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_log.lock().unwrap().len()
    }

    fn should_fail(&self) -> bool {
        use rand::Rng;
        self.config.failure_rate > 0.0 && rand::thread_rng().gen::<f64>() < self.config.failure_rate
    }

    fn next_reply(&self) -> MockReply {
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        let base = if self.should_fail() {
            MockReply::failure()
        } else {
            MockReply::text(self.config.default_response.clone())
        };
        base.after_ms(self.config.latency_ms)
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion> {
        self.call_log.lock().unwrap().push(MockCall {
            system: system.to_string(),
            prompt: prompt.to_string(),
        });
        let reply = self.next_reply();

        if !reply.latency.is_zero() {
            tokio::time::sleep(reply.latency).await;
        }

        match reply.outcome {
            Ok(text) => Ok(Completion {
                text,
                model: MOCK_MODEL.to_string(),
            }),
            Err(message) => Err(Error::Inference(message)),
        }
    }

    fn model_name(&self) -> &str {
        MOCK_MODEL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_replies_then_default() {
        let provider = MockProvider::new()
            .with_fixed_response("fallback")
            .with_reply(MockReply::text("first"))
            .with_reply(MockReply::failure());

        assert_eq!(provider.complete("", "a").await.unwrap().text, "first");
        assert!(provider.complete("", "b").await.is_err());
        assert_eq!(provider.complete("", "c").await.unwrap().text, "fallback");
        assert_eq!(provider.call_count(), 3);
        assert_eq!(provider.calls()[1].prompt, "b");
    }

    #[tokio::test]
    async fn test_always_failing() {
        let provider = MockProvider::new().with_failure_rate(1.0);
        assert!(provider.complete("sys", "p").await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_latency_respects_paused_clock() {
        let provider = MockProvider::new().with_reply(MockReply::text("slow").after_ms(5_000));
        let start = tokio::time::Instant::now();
        provider.complete("", "p").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(5_000));
    }
}
