use crate::ollama::OllamaEmbedder;
use crate::mlx::MlxEmbedder;
use crate::provider::Embedder;
use crate::resilient::wrap_resilient_arc;
use crate::static_hash::StaticHashEmbedder;
use amanmcp_core::{EmbedderSelection, EmbeddingConfig};
use std::sync::Arc;
use tracing::info;

/// Resolves a configured backend preference into a concrete, retry-wrapped
/// embedder. `Auto` probes remote-ollama first, then remote-mlx, falling
/// back to the network-free hash embedder so indexing never blocks on a
/// backend that happens to be down.
pub async fn build_embedder(selection: EmbedderSelection, config: &EmbeddingConfig) -> Arc<dyn Embedder + Send + Sync> {
  match selection {
    EmbedderSelection::Ollama => wrap_resilient_arc(ollama_embedder(config)),
    EmbedderSelection::Mlx => wrap_resilient_arc(mlx_embedder(config)),
    EmbedderSelection::Static => wrap_resilient_arc(StaticHashEmbedder::new(config.static_hash_dim)),
    EmbedderSelection::Auto => {
      let ollama = ollama_embedder(config);
      if ollama.available().await {
        info!("auto-selected remote-ollama embedder");
        return wrap_resilient_arc(ollama);
      }
      let mlx = mlx_embedder(config);
      if mlx.available().await {
        info!("auto-selected remote-mlx embedder");
        return wrap_resilient_arc(mlx);
      }
      info!("no embedding backend reachable, falling back to static-hash embedder");
      wrap_resilient_arc(StaticHashEmbedder::new(config.static_hash_dim))
    }
  }
}

fn ollama_embedder(config: &EmbeddingConfig) -> OllamaEmbedder {
  OllamaEmbedder::new().with_url(config.ollama_url.clone()).with_model(config.model.clone(), 768)
}

fn mlx_embedder(config: &EmbeddingConfig) -> MlxEmbedder {
  MlxEmbedder::new().with_url(config.mlx_url.clone()).with_model(config.model.clone(), 384)
}
