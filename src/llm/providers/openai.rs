use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::base::{LlmMetadata, LlmProvider, LlmProviderError};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// OpenAI chat-completions provider. The completion length is bounded so a
/// generated query cannot run away.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    temperature: f64,
    max_tokens: u32,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        temperature: f64,
        max_tokens: u32,
    ) -> Self {
        let model = model.into();
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        info!("OpenAI provider initialized (model={}, url={})", model, base_url);
        Self {
            api_key: api_key.into(),
            model,
            base_url,
            temperature,
            max_tokens,
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<(String, LlmMetadata), LlmProviderError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(LlmProviderError::Http)?
            .json::<ChatResponse>()
            .await?;

        let content = response
            .choices
            .first()
            .ok_or_else(|| LlmProviderError::Provider("No choices in response".to_string()))?
            .message
            .content
            .clone();

        let mut metadata = LlmMetadata {
            provider: "openai".to_string(),
            model: self.model.clone(),
            base_url: Some(self.base_url.clone()),
            ..Default::default()
        };
        if let Some(usage) = response.usage {
            metadata.tokens_prompt = Some(usage.prompt_tokens);
            metadata.tokens_completion = Some(usage.completion_tokens);
            metadata.tokens_total = Some(usage.total_tokens);
        }

        Ok((content, metadata))
    }

    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = ChatRequest {
            model: "gpt-3.5-turbo".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: "hi".to_string(),
            }],
            temperature: 0.2,
            max_tokens: 400,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-3.5-turbo");
        assert_eq!(json["max_tokens"], 400);
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{
            "choices": [{"message": {"role": "assistant", "content": "```sparql\nSELECT 1\n```"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 8, "total_tokens": 20}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.usage.unwrap().total_tokens, 20);
    }
}
