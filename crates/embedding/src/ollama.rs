use crate::provider::{Embedder, EmbeddingError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "nomic-embed-text";
const DEFAULT_DIMENSIONS: usize = 768;
/// Ollama's `/api/embeddings` has no native batch form; this bounds how many
/// per-text requests run concurrently for one `embed()` call.
const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Talks to a local Ollama instance's native single-prompt embeddings
/// endpoint. The generic `embed(texts, role)` contract is satisfied by
/// fanning out one request per text under a bounded semaphore, since Ollama
/// itself has no batch embeddings call.
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
  client: reqwest::Client,
  base_url: String,
  model: String,
  dimensions: usize,
}

impl Default for OllamaEmbedder {
  fn default() -> Self {
    Self::new()
  }
}

impl OllamaEmbedder {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: DEFAULT_OLLAMA_URL.to_string(),
      model: DEFAULT_MODEL.to_string(),
      dimensions: DEFAULT_DIMENSIONS,
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.base_url = url.into();
    self
  }

  pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
    self.model = model.into();
    self.dimensions = dimensions;
    self
  }

  fn embeddings_url(&self) -> String {
    format!("{}/api/embeddings", self.base_url)
  }

  fn tags_url(&self) -> String {
    format!("{}/api/tags", self.base_url)
  }

  /// Check reachability and whether the configured model is pulled.
  pub async fn check_health(&self) -> OllamaHealthStatus {
    let available = match self
      .client
      .get(&self.base_url)
      .timeout(std::time::Duration::from_secs(5))
      .send()
      .await
    {
      Ok(response) => response.status().is_success(),
      Err(_) => false,
    };

    if !available {
      return OllamaHealthStatus {
        available: false,
        models: vec![],
        configured_model: self.model.clone(),
        configured_model_available: false,
      };
    }

    let models: Vec<String> = match self.client.get(self.tags_url()).send().await {
      Ok(response) if response.status().is_success() => {
        #[derive(Deserialize)]
        struct TagsResponse {
          models: Vec<ModelInfo>,
        }
        #[derive(Deserialize)]
        struct ModelInfo {
          name: String,
        }
        response
          .json::<TagsResponse>()
          .await
          .map(|t| t.models.into_iter().map(|m| m.name).collect())
          .unwrap_or_default()
      }
      _ => vec![],
    };

    let configured_model_available = models
      .iter()
      .any(|m| m.starts_with(&self.model) || self.model.starts_with(m));

    OllamaHealthStatus {
      available,
      models,
      configured_model: self.model.clone(),
      configured_model_available,
    }
  }

  async fn embed_one(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
    let request = EmbeddingRequest { model: &self.model, prompt: text };
    debug!("embedding {} chars with ollama", text.len());

    let response = self.client.post(self.embeddings_url()).json(&request).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      warn!("ollama embedding failed: {} - {}", status, body);
      return Err(EmbeddingError::Http(status.as_u16()));
    }

    let result: EmbeddingResponse = response.json().await?;
    if result.embedding.len() != self.dimensions {
      warn!(
        "unexpected embedding dimensions: got {}, expected {}",
        result.embedding.len(),
        self.dimensions
      );
      return Err(EmbeddingError::DimensionMismatch { expected: self.dimensions, actual: result.embedding.len() });
    }
    Ok(result.embedding)
  }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OllamaHealthStatus {
  pub available: bool,
  pub models: Vec<String>,
  pub configured_model: String,
  pub configured_model_available: bool,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
  model: &'a str,
  prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
  embedding: Vec<f32>,
}

#[async_trait]
impl Embedder for OllamaEmbedder {
  fn id(&self) -> String {
    format!("remote-ollama:{}", self.model)
  }

  fn dim(&self) -> usize {
    self.dimensions
  }

  async fn available(&self) -> bool {
    match self.client.get(&self.base_url).send().await {
      Ok(response) => response.status().is_success(),
      Err(_) => false,
    }
  }

  async fn embed(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let prefix = role.query_prefix();
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS));

    let futures: Vec<_> = texts
      .iter()
      .map(|text| {
        let permit = semaphore.clone();
        let text = match prefix {
          Some(p) => format!("{p}{text}"),
          None => text.clone(),
        };
        let embedder = self.clone();
        async move {
          let _permit = permit
            .acquire()
            .await
            .map_err(|_| EmbeddingError::ProviderError("semaphore closed".to_string()))?;
          embedder.embed_one(&text).await
        }
      })
      .collect();

    futures::future::join_all(futures).await.into_iter().collect()
  }
}
