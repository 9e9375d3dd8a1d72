use std::str::FromStr;
use std::sync::Arc;

use strum::{Display, EnumString};

use super::providers::base::LlmProvider;
use super::providers::fallback::LlmProviderWithFallback;
use super::providers::ollama::OllamaProvider;
use super::providers::openai::OpenAiProvider;
use crate::DEFAULT_OLLAMA_URL;
use crate::core::config::PathquillConfig;
use crate::core::error::{PathquillError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    Ollama,
}

pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Builds the configured provider. The API key comes from the request,
    /// not the config, so it is passed separately.
    pub fn create(config: &PathquillConfig, api_key: &str) -> Result<Box<dyn LlmProvider>> {
        let kind = ProviderKind::from_str(&config.llm_provider).map_err(|_| {
            PathquillError::Config(format!(
                "unknown LLM provider '{}' (supported: openai, ollama)",
                config.llm_provider
            ))
        })?;

        Ok(match kind {
            ProviderKind::OpenAi => Box::new(OpenAiProvider::new(
                api_key,
                config.llm_model.clone(),
                config.llm_base_url.clone(),
                config.llm_temperature,
                config.llm_max_tokens,
            )),
            ProviderKind::Ollama => Box::new(OllamaProvider::new(
                config
                    .llm_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                config.llm_model.clone(),
                config.llm_temperature,
                config.llm_max_tokens,
            )),
        })
    }

    pub fn create_with_fallback(
        primary: Arc<dyn LlmProvider>,
        config: &PathquillConfig,
    ) -> LlmProviderWithFallback {
        LlmProviderWithFallback::new(
            primary,
            config.llm_fallback_url.clone(),
            config.llm_fallback_model.clone(),
            config.llm_temperature,
            config.llm_max_tokens,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parses_lowercase() {
        assert_eq!(ProviderKind::from_str("openai").unwrap(), ProviderKind::OpenAi);
        assert_eq!(ProviderKind::from_str("ollama").unwrap(), ProviderKind::Ollama);
        assert!(ProviderKind::from_str("claude").is_err());
    }

    #[test]
    fn test_create_openai_provider() {
        let config = PathquillConfig::default();
        let provider = LlmProviderFactory::create(&config, "sk-test").unwrap();
        assert_eq!(provider.provider_name(), "openai");
        assert_eq!(provider.model_name(), "gpt-3.5-turbo");
    }

    #[test]
    fn test_create_ollama_provider() {
        let config = PathquillConfig {
            llm_provider: "ollama".to_string(),
            llm_model: "llama3.1:8b".to_string(),
            ..Default::default()
        };
        let provider = LlmProviderFactory::create(&config, "").unwrap();
        assert_eq!(provider.provider_name(), "ollama");
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = PathquillConfig {
            llm_provider: "watson".to_string(),
            ..Default::default()
        };
        let err = LlmProviderFactory::create(&config, "key").unwrap_err();
        assert!(matches!(err, PathquillError::Config(_)));
    }
}
