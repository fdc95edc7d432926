//! Embedding providers: the trait the store embeds through, an
//! OpenAI-compatible HTTP implementation, and a deterministic mock for tests.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::types::RagError;

/// Turns text into vectors via an external embedding service.
///
/// Batched calls must preserve input order in the output. Failures are
/// surfaced as [`RagError::Provider`] and propagated without retry.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeds a batch of texts, one vector per input, in input order.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;

    /// Embeds a single text.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let texts = [text.to_string()];
        let mut vectors = self.embed_many(&texts).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Provider("provider returned no embedding".into()))
    }
}

/// Configuration for the OpenAI-compatible embeddings endpoint.
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingConfig {
    pub api_key: String,
    pub model: String,
    /// API root, e.g. `https://api.openai.com/v1`. Overridable so tests can
    /// point at a local mock server.
    pub base_url: Url,
}

impl OpenAiEmbeddingConfig {
    pub fn new(api_key: impl Into<String>) -> Result<Self, RagError> {
        Ok(Self {
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            base_url: Url::parse("https://api.openai.com/v1")
                .map_err(|err| RagError::Provider(err.to_string()))?,
        })
    }

    /// Loads the provider configuration from the environment
    /// (`OPENAI_API_KEY`, `DESIGNSMITH_EMBEDDING_MODEL`,
    /// `DESIGNSMITH_EMBEDDING_BASE_URL`).
    pub fn from_env() -> Result<Self, RagError> {
        let _ = dotenvy::dotenv();
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| RagError::Provider("OPENAI_API_KEY is not set".into()))?;
        let mut config = Self::new(api_key)?;
        if let Ok(model) = std::env::var("DESIGNSMITH_EMBEDDING_MODEL") {
            config.model = model;
        }
        if let Ok(base) = std::env::var("DESIGNSMITH_EMBEDDING_BASE_URL") {
            config.base_url =
                Url::parse(&base).map_err(|err| RagError::Provider(err.to_string()))?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Embedding provider backed by the OpenAI `/embeddings` API (or any
/// endpoint speaking the same wire shape).
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAiEmbeddingConfig,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiEmbeddingProvider {
    pub fn new(config: OpenAiEmbeddingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn with_client(client: reqwest::Client, config: OpenAiEmbeddingConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> Result<Url, RagError> {
        // Url::join drops the last path segment unless the base ends in '/'.
        let mut base = self.config.base_url.as_str().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .and_then(|root| root.join("embeddings"))
            .map_err(|err| RagError::Provider(err.to_string()))
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.endpoint()?)
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({
                "model": self.config.model,
                "input": texts,
            }))
            .send()
            .await
            .map_err(|err| RagError::Provider(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Provider(format!(
                "embeddings request failed with {status}: {body}"
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| RagError::Provider(err.to_string()))?;

        if parsed.data.len() != texts.len() {
            return Err(RagError::Provider(format!(
                "expected {} embeddings, provider returned {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        // The API reports an index per embedding; order by it rather than
        // trusting response order.
        let mut data = parsed.data;
        data.sort_by_key(|datum| datum.index);
        Ok(data.into_iter().map(|datum| datum.embedding).collect())
    }
}

/// Deterministic embedding provider for tests and offline runs.
///
/// Hashes each whitespace-separated word into a fixed-dimension bucket and
/// L2-normalizes, so identical texts embed identically and texts sharing
/// vocabulary land near each other.
#[derive(Clone, Debug)]
pub struct MockEmbeddingProvider {
    dimension: usize,
}

impl Default for MockEmbeddingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEmbeddingProvider {
    pub fn new() -> Self {
        Self { dimension: 32 }
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension.max(1)];
        for word in text.to_lowercase().split_whitespace() {
            let digest = blake3::hash(word.as_bytes());
            let bytes = digest.as_bytes();
            let bucket = usize::from(bytes[0]) % vector.len();
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }
}
