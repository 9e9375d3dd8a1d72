use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::bricks::BricksClient;
use crate::core::cache::TranslationCache;
use crate::core::config::PathquillConfig;
use crate::core::error::{PathquillError, Result};
use crate::llm::extractor::extract_sparql;
use crate::llm::factory::LlmProviderFactory;
use crate::llm::prompt::QueryPrompt;
use crate::llm::providers::base::{LlmMetadata, LlmProvider};
use crate::store::{PathwayStore, QueryTable};
use crate::utils::preview;

/// One submission of the three-field form: LLM credential, data-access token
/// and the free-text question. Empty fields fall back to configured values
/// before validation.
#[derive(Debug, Clone, Default)]
pub struct QueryRequest {
    pub api_key: String,
    pub token: String,
    pub question: String,
}

/// Everything a surface needs to show for one answered question.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutcome {
    pub question: String,
    pub sparql: String,
    pub table: QueryTable,
    pub metadata: LlmMetadata,
    pub cached: bool,
    pub elapsed_ms: u64,
    pub executed_at: DateTime<Utc>,
}

/// The request pipeline: validate fields, configure the data credential,
/// mirror the asset locally, materialize the graph, translate the question
/// through the LLM (with caching), extract the fenced query and execute it.
pub struct QueryTool {
    config: PathquillConfig,
    cache: Arc<TranslationCache>,
    store: OnceCell<Arc<PathwayStore>>,
}

impl QueryTool {
    pub fn new(config: PathquillConfig) -> Self {
        let cache = Arc::new(TranslationCache::new(config.cache_size, config.cache_ttl));
        Self::with_cache(config, cache)
    }

    pub fn with_cache(config: PathquillConfig, cache: Arc<TranslationCache>) -> Self {
        Self {
            config,
            cache,
            store: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &PathquillConfig {
        &self.config
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    pub async fn run(&self, request: &QueryRequest) -> Result<QueryOutcome> {
        let started = Instant::now();
        let (api_key, token, question) = self.resolve(request)?;
        info!("execution started (question: {})", preview(&question, 80));

        // Credential configuration happens every run, as the original tool
        // re-runs it on every button press.
        let bricks = BricksClient::configure(&self.config, &token)?;
        let asset = bricks.ensure_asset(&self.config.asset_name).await?;

        let store = self
            .store
            .get_or_try_init(|| async {
                PathwayStore::open(&self.config.store_dir()).map(Arc::new)
            })
            .await?
            .clone();

        // Bulk loads can take a while on first run; keep them off the
        // executor threads.
        {
            let store = store.clone();
            let files = asset.files.clone();
            let digest = asset.digest.clone();
            tokio::task::spawn_blocking(move || store.materialize(&files, &digest))
                .await
                .map_err(|e| PathquillError::Internal(format!("materialize task failed: {e}")))??;
        }

        let (sparql, metadata, cached) = self.translate(&api_key, &question).await?;
        info!("SPARQL query ready{}:\n{}", if cached { " (cached)" } else { "" }, sparql);

        let table = store.query(&sparql)?;
        if table.is_empty() {
            info!("query returned no data");
        } else {
            info!("query returned {} row(s)", table.row_count());
        }

        Ok(QueryOutcome {
            question,
            sparql,
            table,
            metadata,
            cached,
            elapsed_ms: started.elapsed().as_millis() as u64,
            executed_at: Utc::now(),
        })
    }

    /// Merges request fields with configured defaults and checks that all
    /// three are present, naming the ones that are not.
    fn resolve(&self, request: &QueryRequest) -> Result<(String, String, String)> {
        let api_key = non_empty(&request.api_key)
            .or_else(|| self.config.llm_api_key.as_deref().and_then(non_empty))
            .map(str::to_string);
        let token = non_empty(&request.token)
            .or_else(|| self.config.registry_token.as_deref().and_then(non_empty))
            .map(str::to_string)
            // like the original client, a token saved by an earlier configure
            // keeps working until replaced
            .or_else(|| BricksClient::saved_token(&self.config).ok().flatten());
        let question = non_empty(&request.question).map(str::to_string);

        let mut missing = Vec::new();
        if api_key.is_none() {
            missing.push("API key");
        }
        if token.is_none() {
            missing.push("data access token");
        }
        if question.is_none() {
            missing.push("question");
        }

        let (Some(api_key), Some(token), Some(question)) = (api_key, token, question) else {
            return Err(PathquillError::Validation(format!(
                "{} must be provided",
                missing.join(", ")
            )));
        };
        Ok((api_key, token, question))
    }

    /// Question -> SPARQL, through the translation cache or the provider.
    async fn translate(
        &self,
        api_key: &str,
        question: &str,
    ) -> Result<(String, LlmMetadata, bool)> {
        let key = TranslationCache::key(
            &self.config.llm_provider,
            &self.config.llm_model,
            question,
        );
        if let Some(sparql) = self.cache.get(&key) {
            debug!("translation cache hit");
            let metadata = LlmMetadata {
                provider: self.config.llm_provider.clone(),
                model: self.config.llm_model.clone(),
                ..Default::default()
            };
            return Ok((sparql, metadata, true));
        }

        let primary = LlmProviderFactory::create(&self.config, api_key)?;
        let provider: Box<dyn LlmProvider> = if self.config.llm_fallback_enabled {
            Box::new(LlmProviderFactory::create_with_fallback(
                Arc::from(primary),
                &self.config,
            ))
        } else {
            primary
        };

        let prompt = QueryPrompt::new(question);
        let (reply, metadata) = provider
            .generate(prompt.system_prompt(), &prompt.user_prompt())
            .await?;
        info!(
            "model reply received ({} chars, provider={})",
            reply.len(),
            metadata.provider
        );

        let sparql = extract_sparql(&reply)?;
        self.cache.put(&key, &sparql);
        Ok((sparql, metadata, false))
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    // isolates the data dir so a token saved on the host never leaks in
    fn tool_at(dir: &Path) -> QueryTool {
        QueryTool::new(PathquillConfig {
            data_dir: Some(dir.to_path_buf()),
            ..Default::default()
        })
    }

    #[test]
    fn test_resolve_reports_all_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_at(dir.path())
            .resolve(&QueryRequest::default())
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("API key"));
        assert!(message.contains("data access token"));
        assert!(message.contains("question"));
    }

    #[test]
    fn test_resolve_rejects_whitespace_only_fields() {
        let dir = tempfile::tempdir().unwrap();
        let request = QueryRequest {
            api_key: "sk-x".to_string(),
            token: "   ".to_string(),
            question: "q".to_string(),
        };
        let err = tool_at(dir.path()).resolve(&request).unwrap_err();
        assert!(matches!(err, PathquillError::Validation(_)));
        assert!(err.to_string().contains("data access token"));
    }

    #[test]
    fn test_resolve_trims_fields() {
        let dir = tempfile::tempdir().unwrap();
        let request = QueryRequest {
            api_key: " sk-x ".to_string(),
            token: " tok ".to_string(),
            question: " list pathways ".to_string(),
        };
        let (api_key, token, question) = tool_at(dir.path()).resolve(&request).unwrap();
        assert_eq!(api_key, "sk-x");
        assert_eq!(token, "tok");
        assert_eq!(question, "list pathways");
    }

    #[test]
    fn test_resolve_falls_back_to_config_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = PathquillConfig {
            llm_api_key: Some("sk-config".to_string()),
            registry_token: Some("tok-config".to_string()),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let tool = QueryTool::new(config);
        let request = QueryRequest {
            question: "list pathways".to_string(),
            ..Default::default()
        };
        let (api_key, token, _) = tool.resolve(&request).unwrap();
        assert_eq!(api_key, "sk-config");
        assert_eq!(token, "tok-config");
    }

    #[test]
    fn test_resolve_reuses_saved_token() {
        let dir = tempfile::tempdir().unwrap();
        crate::bricks::credential::save_token(dir.path(), "tok-saved").unwrap();

        let config = PathquillConfig {
            llm_api_key: Some("sk-config".to_string()),
            data_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let tool = QueryTool::new(config);
        let request = QueryRequest {
            question: "list pathways".to_string(),
            ..Default::default()
        };
        let (_, token, _) = tool.resolve(&request).unwrap();
        assert_eq!(token, "tok-saved");
    }

    #[tokio::test]
    async fn test_run_fails_validation_before_any_network_use() {
        let dir = tempfile::tempdir().unwrap();
        let err = tool_at(dir.path())
            .run(&QueryRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, PathquillError::Validation(_)));
    }
}
