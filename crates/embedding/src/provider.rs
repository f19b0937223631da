use async_trait::async_trait;

/// Whether text is being embedded as a stored document or an incoming query.
///
/// Some backends encode asymmetric instructions into the query side only
/// (e.g. "represent this sentence for searching relevant passages:"); the
/// document side is embedded as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
  Document,
  Query,
}

impl Role {
  /// Instruction text prepended ahead of query strings by backends that
  /// support asymmetric instruct-style embedding. Document-role text is
  /// never prefixed.
  pub fn query_prefix(self) -> Option<&'static str> {
    match self {
      Role::Query => Some("Represent this query for searching relevant code: "),
      Role::Document => None,
    }
  }
}

#[async_trait]
pub trait Embedder: Send + Sync {
  /// Stable identity of this backend+model pair, e.g. `"remote-ollama:nomic-embed-text"`.
  /// Stored alongside each chunk's vector so a model swap is detectable.
  fn id(&self) -> String;

  fn dim(&self) -> usize;

  /// Cheap reachability probe; never blocks on a full embed call.
  async fn available(&self) -> bool;

  /// Embed a batch of texts. Callers are responsible for keeping batches at
  /// or under the backend's max batch size; backends do not split internally.
  async fn embed(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>, EmbeddingError>;

  /// Release any held resources (connection pools, background tasks). A
  /// no-op for stateless HTTP backends.
  async fn close(&self) {}
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
  #[error("embedder not available")]
  NotAvailable,
  #[error("request failed: {0}")]
  Request(#[from] reqwest::Error),
  /// An HTTP response status outside 2xx, with the code discarded nowhere:
  /// 4xx is a bad request (unknown model, malformed payload) that retrying
  /// cannot fix; 5xx/429 are the backend's own transient trouble.
  #[error("http {0}")]
  Http(u16),
  #[error("provider error: {0}")]
  ProviderError(String),
  #[error("network error: {0}")]
  Network(String),
  #[error("request timed out")]
  Timeout,
  #[error("invalid input: {0}")]
  InvalidInput(String),
  #[error("dimension mismatch: embedder returned {actual}, expected {expected}")]
  DimensionMismatch { expected: usize, actual: usize },
}

impl From<EmbeddingError> for amanmcp_core::Error {
  fn from(err: EmbeddingError) -> Self {
    match err {
      EmbeddingError::InvalidInput(msg) => amanmcp_core::Error::InputInvalid(msg),
      EmbeddingError::NotAvailable => amanmcp_core::Error::BackendUnavailable("embedder not available".into()),
      EmbeddingError::DimensionMismatch { expected, actual } => {
        amanmcp_core::Error::StateCorrupt(format!("embedder returned dimension {actual}, expected {expected}"))
      }
      EmbeddingError::Http(status) if (400..500).contains(&status) => {
        amanmcp_core::Error::Fatal(format!("embedder request rejected: http {status}"))
      }
      other => amanmcp_core::Error::Transient(other.to_string()),
    }
  }
}
