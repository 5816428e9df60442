//! # Generative Fallback Module
//!
//! ## Purpose
//! External generative-AI answer source used when the local corpus has no
//! match at the requested threshold. Strictly an external collaborator:
//! nothing here feeds back into the similarity ranking.
//!
//! ## Input/Output Specification
//! - **Input**: The user's question text
//! - **Output**: A generated answer string
//! - **Failure Mode**: Errors surface to the API layer, which degrades to a
//!   canned no-answer reply; a fallback failure never aborts a request
//!
//! ## Key Features
//! - OpenAI-compatible chat completions client
//! - Own request timeout, independent of the ranking path
//! - Trait seam so tests can substitute a scripted implementation

use crate::config::FallbackConfig;
use crate::errors::{QaError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// System prompt sent ahead of every fallback question
const SYSTEM_PROMPT: &str = "You are a legal information assistant. Answer the user's legal \
     question concisely and note that your reply is general information, not legal advice.";

/// An external source of generated answers
#[async_trait]
pub trait GenerativeFallback: Send + Sync {
    /// Source name for logs
    fn name(&self) -> &str;

    /// Generate an answer for the question
    async fn answer(&self, question: &str) -> Result<String>;
}

/// Build the configured fallback, or `None` when disabled
pub fn from_config(config: &FallbackConfig) -> Result<Option<Arc<dyn GenerativeFallback>>> {
    if !config.enabled {
        return Ok(None);
    }
    Ok(Some(Arc::new(HttpFallback::new(config.clone())?)))
}

/// Chat completions client for an OpenAI-compatible endpoint
pub struct HttpFallback {
    config: FallbackConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

impl HttpFallback {
    /// Create a new fallback client
    pub fn new(config: FallbackConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(api_key) = &config.api_key {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {}", api_key)
                    .parse()
                    .map_err(|e| QaError::Config {
                        message: format!("Invalid API key format: {}", e),
                    })?,
            );
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .user_agent("legal-qa-engine/0.1")
            .build()
            .map_err(|e| QaError::NetworkError {
                details: e.to_string(),
            })?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl GenerativeFallback for HttpFallback {
    fn name(&self) -> &str {
        "http"
    }

    async fn answer(&self, question: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
        };

        tracing::debug!(endpoint = %self.config.api_url, "Requesting fallback answer");

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| QaError::NetworkError {
                details: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(QaError::NetworkError {
                details: format!(
                    "HTTP {}: {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| QaError::DataParsing {
            origin: "fallback endpoint".to_string(),
            details: e.to_string(),
        })?;

        let answer = parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(QaError::DataParsing {
                origin: "fallback endpoint".to_string(),
                details: "Response contained no answer text".to_string(),
            });
        }

        Ok(answer)
    }
}
