//! Concrete `LlmClient`/`EmbeddingClient` implementations (§4.10, §9).
//! `llmProvider`/`embeddingProvider` select which of these get built in
//! [`crate::bootstrap::bootstrap`]; `llmProvider = none` (or a missing
//! API key) leaves the slot `None`, and every caller downstream already
//! falls back to templates/heuristics rather than erroring.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use techpulse_core::{Error, Result};
use techpulse_sources::{HttpClientConfig, create_client};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";

pub struct OpenAiLlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiLlmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OPENAI_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: create_client(&HttpClientConfig::default()).unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
            model: "gpt-4o-mini".to_string(),
        }
    }

    async fn chat(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: String,
        }

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": prompt},
                ],
            }))
            .send()
            .await
            .map_err(|e| Error::Source(format!("openai request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Source(format!("openai returned status {}", response.status())));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("openai response decode failed: {e}")))?;

        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Source("openai returned no choices".to_string()))
    }
}

#[async_trait]
impl techpulse_core::LlmClient for OpenAiLlmClient {
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(system, prompt).await
    }

    async fn complete_text(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(system, prompt).await
    }
}

pub struct AnthropicLlmClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicLlmClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, ANTHROPIC_BASE_URL.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: create_client(&HttpClientConfig::default()).unwrap_or_else(|_| Client::new()),
            api_key,
            base_url,
            model: "claude-3-5-haiku-20241022".to_string(),
        }
    }

    async fn messages(&self, system: &str, prompt: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct MessagesResponse {
            content: Vec<ContentBlock>,
        }
        #[derive(Deserialize)]
        struct ContentBlock {
            text: String,
        }

        let response = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": 4096,
                "system": system,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await
            .map_err(|e| Error::Source(format!("anthropic request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Source(format!("anthropic returned status {}", response.status())));
        }

        let body: MessagesResponse = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("anthropic response decode failed: {e}")))?;

        body.content
            .into_iter()
            .next()
            .map(|block| block.text)
            .ok_or_else(|| Error::Source("anthropic returned no content blocks".to_string()))
    }
}

#[async_trait]
impl techpulse_core::LlmClient for AnthropicLlmClient {
    async fn complete_json(&self, system: &str, prompt: &str) -> Result<String> {
        self.messages(system, prompt).await
    }

    async fn complete_text(&self, system: &str, prompt: &str) -> Result<String> {
        self.messages(system, prompt).await
    }
}

/// `text-embedding-3-small`'s fixed output dimensionality.
const OPENAI_EMBEDDING_DIMENSIONS: usize = 1536;

pub struct OpenAiEmbeddingClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiEmbeddingClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: create_client(&HttpClientConfig::default()).unwrap_or_else(|_| Client::new()),
            api_key,
            base_url: OPENAI_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl techpulse_core::EmbeddingClient for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Deserialize)]
        struct EmbeddingsResponse {
            data: Vec<EmbeddingData>,
        }
        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": "text-embedding-3-small",
                "input": text,
            }))
            .send()
            .await
            .map_err(|e| Error::Source(format!("openai embeddings request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::Source(format!("openai embeddings returned status {}", response.status())));
        }

        let body: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| Error::Source(format!("openai embeddings decode failed: {e}")))?;

        body.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::Source("openai embeddings returned no data".to_string()))
    }

    fn dimensions(&self) -> usize {
        OPENAI_EMBEDDING_DIMENSIONS
    }
}
