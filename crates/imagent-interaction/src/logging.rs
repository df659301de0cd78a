//! LLM call auditing.

use async_trait::async_trait;
use imagent_core::audit::{AuditRecord, AuditSink, record_best_effort};
use imagent_core::{CommandGenerator, ConversationTurn, LlmProvider, ProviderError};
use std::sync::Arc;
use std::time::Instant;

/// Wraps a generator and records one `LlmCall` audit entry per request.
pub struct LoggedGenerator<G> {
    inner: G,
    audit: Arc<dyn AuditSink>,
}

impl<G: CommandGenerator> LoggedGenerator<G> {
    pub fn new(inner: G, audit: Arc<dyn AuditSink>) -> Self {
        Self { inner, audit }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }
}

#[async_trait]
impl<G: CommandGenerator> CommandGenerator for LoggedGenerator<G> {
    async fn generate_command(
        &self,
        user_message: &str,
        history: &[ConversationTurn],
    ) -> Result<String, ProviderError> {
        let started = Instant::now();
        let result = self.inner.generate_command(user_message, history).await;
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let (response, error) = match &result {
            Ok(text) => (Some(text.clone()), None),
            Err(err) => (None, Some(err.to_string())),
        };

        match &error {
            None => tracing::info!(
                provider = %self.inner.provider(),
                model = %self.inner.model(),
                latency_ms,
                "LLM call succeeded"
            ),
            Some(err) => tracing::error!(
                provider = %self.inner.provider(),
                model = %self.inner.model(),
                latency_ms,
                error = %err,
                "LLM call failed"
            ),
        }

        record_best_effort(
            self.audit.as_ref(),
            &AuditRecord::LlmCall {
                timestamp: AuditRecord::now(),
                provider: self.inner.provider(),
                model: self.inner.model().to_string(),
                latency_ms,
                success: result.is_ok(),
                request_chars: user_message.chars().count(),
                history_turns: history.len(),
                response,
                error,
            },
        );

        result
    }

    fn provider(&self) -> LlmProvider {
        self.inner.provider()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
