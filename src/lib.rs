pub mod app;
pub mod bricks;
pub mod core;
pub mod llm;
pub mod store;
pub mod utils;
pub mod web;

pub use app::{QueryOutcome, QueryRequest, QueryTool};
pub use core::config::PathquillConfig;
pub use core::error::{PathquillError, Result};
pub use llm::providers::base::{LlmMetadata, LlmProvider};
pub use store::{PathwayStore, QueryTable};

/// Chat-completion model used when none is configured.
pub const DEFAULT_LLM_MODEL: &str = "gpt-3.5-turbo";

/// Completion length bound for generated queries.
pub const DEFAULT_LLM_MAX_TOKENS: u32 = 400;

/// Asset holding the WikiPathways RDF distribution.
pub const DEFAULT_ASSET: &str = "wikipathways";

/// Registry the data-distribution client talks to.
pub const DEFAULT_REGISTRY_URL: &str = "https://biobricks.ai";

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

pub const DEFAULT_CACHE_SIZE: usize = 256;

pub const DEFAULT_CACHE_TTL: u64 = 3600;
