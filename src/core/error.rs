use thiserror::Error;

use crate::bricks::BricksError;
use crate::llm::providers::base::LlmProviderError;

#[derive(Error, Debug)]
pub enum PathquillError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Asset retrieval error: {0}")]
    Asset(String),

    #[error("LLM provider error: {0}")]
    LlmProvider(#[from] LlmProviderError),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Query execution error: {0}")]
    Query(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BricksError> for PathquillError {
    fn from(err: BricksError) -> Self {
        match err {
            BricksError::Credential(msg) => PathquillError::Credential(msg),
            other => PathquillError::Asset(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PathquillError>;
