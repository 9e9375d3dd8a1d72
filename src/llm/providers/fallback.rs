use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{info, warn};

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};
use super::ollama::OllamaProvider;

/// Wraps a primary provider with a local Ollama fallback. A failed primary
/// call is retried once against the fallback; the metadata records which
/// provider actually answered and why.
pub struct LlmProviderWithFallback {
    primary: Arc<dyn LlmProvider>,
    fallback: OllamaProvider,
    using_fallback: AtomicBool,
    fallback_count: AtomicUsize,
    primary_failures: AtomicUsize,
}

impl LlmProviderWithFallback {
    pub fn new(
        primary: Arc<dyn LlmProvider>,
        fallback_url: impl Into<String>,
        fallback_model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        let fallback = OllamaProvider::new(fallback_url, fallback_model, temperature, max_tokens);
        info!(
            "Fallback chain initialized: primary={}, fallback={}",
            primary.provider_name(),
            fallback.model_name()
        );
        Self {
            primary,
            fallback,
            using_fallback: AtomicBool::new(false),
            fallback_count: AtomicUsize::new(0),
            primary_failures: AtomicUsize::new(0),
        }
    }

    async fn fallback_generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        original_error: &LlmProviderError,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        warn!(
            "Falling back to {} due to: {}",
            self.fallback.model_name(),
            original_error
        );

        let (content, mut metadata) = self.fallback.generate(system_prompt, user_prompt).await?;

        metadata.fallback_used = true;
        metadata.original_provider = Some(self.primary.provider_name().to_string());
        metadata.original_error = Some(original_error.to_string());

        self.using_fallback.store(true, Ordering::SeqCst);
        self.fallback_count.fetch_add(1, Ordering::SeqCst);

        Ok((content, metadata))
    }

    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::SeqCst)
    }

    pub fn fallback_count(&self) -> usize {
        self.fallback_count.load(Ordering::SeqCst)
    }

    pub fn primary_failures(&self) -> usize {
        self.primary_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for LlmProviderWithFallback {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        match self.primary.generate(system_prompt, user_prompt).await {
            Ok(result) => {
                self.using_fallback.store(false, Ordering::SeqCst);
                Ok(result)
            }
            Err(e) => {
                self.primary_failures.fetch_add(1, Ordering::SeqCst);
                warn!(
                    "Primary LLM provider failed ({}x): {}",
                    self.primary_failures.load(Ordering::SeqCst),
                    e
                );
                self.fallback_generate(system_prompt, user_prompt, &e).await
            }
        }
    }

    fn provider_name(&self) -> &str {
        if self.using_fallback.load(Ordering::SeqCst) {
            "ollama (fallback)"
        } else {
            self.primary.provider_name()
        }
    }

    fn model_name(&self) -> &str {
        if self.using_fallback.load(Ordering::SeqCst) {
            self.fallback.model_name()
        } else {
            self.primary.model_name()
        }
    }
}
