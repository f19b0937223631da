use crate::provider::{Embedder, EmbeddingError, Role};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const DEFAULT_MLX_URL: &str = "http://localhost:8765";
const DEFAULT_MODEL: &str = "mlx-community/bge-small-en-v1.5-bf16";
const DEFAULT_DIMENSIONS: usize = 384;

/// Talks to a local remote-mlx embedding server over its batch endpoint:
/// `POST /embed` with `{"texts": [...], "model": "<id>"}`, returning
/// `{"embeddings": [[...], ...]}`. Unlike Ollama there is no single
/// upstream reference server here, so the wire shape follows the batch
/// contract directly rather than being reverse-engineered from a native API.
#[derive(Debug, Clone)]
pub struct MlxEmbedder {
  client: reqwest::Client,
  base_url: String,
  model: String,
  dimensions: usize,
}

impl Default for MlxEmbedder {
  fn default() -> Self {
    Self::new()
  }
}

impl MlxEmbedder {
  pub fn new() -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: DEFAULT_MLX_URL.to_string(),
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

  fn embed_url(&self) -> String {
    format!("{}/embed", self.base_url)
  }

  fn health_url(&self) -> String {
    format!("{}/health", self.base_url)
  }
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
  texts: &'a [String],
  model: &'a str,
}

#[derive(Debug, Deserialize)]
struct BatchResponse {
  embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl Embedder for MlxEmbedder {
  fn id(&self) -> String {
    format!("remote-mlx:{}", self.model)
  }

  fn dim(&self) -> usize {
    self.dimensions
  }

  async fn available(&self) -> bool {
    match self.client.get(self.health_url()).send().await {
      Ok(response) => response.status().is_success(),
      Err(_) => false,
    }
  }

  async fn embed(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if texts.is_empty() {
      return Ok(Vec::new());
    }
    let prefixed: Vec<String> = match role.query_prefix() {
      Some(p) => texts.iter().map(|t| format!("{p}{t}")).collect(),
      None => texts.to_vec(),
    };

    debug!("embedding {} texts with remote-mlx", prefixed.len());
    let request = BatchRequest { texts: &prefixed, model: &self.model };
    let response = self.client.post(self.embed_url()).json(&request).send().await?;

    if !response.status().is_success() {
      let status = response.status();
      let body = response.text().await.unwrap_or_default();
      warn!("remote-mlx embedding failed: {} - {}", status, body);
      return Err(EmbeddingError::Http(status.as_u16()));
    }

    let result: BatchResponse = response.json().await?;
    if result.embeddings.len() != prefixed.len() {
      return Err(EmbeddingError::ProviderError(format!(
        "remote-mlx returned {} embeddings for {} inputs",
        result.embeddings.len(),
        prefixed.len()
      )));
    }
    for embedding in &result.embeddings {
      if embedding.len() != self.dimensions {
        return Err(EmbeddingError::DimensionMismatch { expected: self.dimensions, actual: embedding.len() });
      }
    }
    Ok(result.embeddings)
  }
}
