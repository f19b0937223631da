//! Runtime configuration: embedder selection, chunking/search/index tuning.
//!
//! The MCP transport shell owns `.amanmcp.yaml` parsing and environment
//! resolution (out of scope for this crate); it hands the core an
//! already-parsed configuration object. `Config` is therefore plain
//! `Deserialize` data plus a small set of env-driven defaults for the one
//! variable the core itself consumes directly: `AMANMCP_EMBEDDER`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the project-local state directory (`<root>/.amanmcp/`).
pub const STATE_DIR_NAME: &str = ".amanmcp";

/// Resolve the state directory for a project root.
pub fn state_dir(project_root: &Path) -> PathBuf {
  project_root.join(STATE_DIR_NAME)
}

/// Backend selection for the embedder, read from `AMANMCP_EMBEDDER`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderSelection {
  /// Probe `remote-ollama`, then `remote-mlx`, falling back to `static-hash`.
  #[default]
  Auto,
  Ollama,
  Mlx,
  Static,
}

impl EmbedderSelection {
  /// Read `AMANMCP_EMBEDDER` from the environment, defaulting to `Auto` if
  /// unset or unrecognized.
  pub fn from_env() -> Self {
    match std::env::var("AMANMCP_EMBEDDER").ok().as_deref() {
      Some("ollama") => EmbedderSelection::Ollama,
      Some("mlx") => EmbedderSelection::Mlx,
      Some("static") => EmbedderSelection::Static,
      Some("auto") | None | Some(_) => EmbedderSelection::Auto,
    }
  }
}

/// Embedder endpoint, batching, and retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
  pub ollama_url: String,
  pub mlx_url: String,
  /// Model identifier used to form `embedder_id` (backend+model).
  pub model: String,
  /// Fixed output dimension for the `static-hash` fallback. Remote backends
  /// discover their own dimension from the first successful call.
  pub static_hash_dim: usize,
  /// Texts sent to the embedder per call; Indexer sends this many at a time.
  pub batch_size: usize,
  /// Hard ceiling the embedder contract accepts per call.
  pub max_batch: usize,
  /// `base` in the thermal-aware timeout formula.
  pub base_timeout_secs: f64,
  /// `progression` in the thermal-aware timeout formula.
  pub timeout_progression: f64,
  pub max_retries: u32,
  pub initial_backoff_secs: f64,
  pub max_backoff_secs: f64,
  /// Optional pause between batches to cap steady-state GPU utilization.
  pub inter_batch_delay_ms: u64,
}

impl Default for EmbeddingConfig {
  fn default() -> Self {
    Self {
      ollama_url: "http://localhost:11434".to_string(),
      mlx_url: "http://localhost:11435".to_string(),
      model: "static-hash-v1".to_string(),
      static_hash_dim: 768,
      batch_size: 32,
      max_batch: 256,
      base_timeout_secs: 60.0,
      timeout_progression: 1.5,
      max_retries: 10,
      initial_backoff_secs: 1.0,
      max_backoff_secs: 512.0,
      inter_batch_delay_ms: 0,
    }
  }
}

/// Search-time tuning: deadlines, fusion constant, classifier default
/// weights. Per-request overrides live in `search::SearchOpts`, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
  pub default_limit: usize,
  pub max_limit: usize,
  pub soft_deadline_ms: u64,
  pub hard_deadline_ms: u64,
  pub rrf_k: u32,
  pub default_bm25_weight: f64,
  pub default_semantic_weight: f64,
}

impl Default for SearchConfig {
  fn default() -> Self {
    Self {
      default_limit: 10,
      max_limit: 100,
      soft_deadline_ms: 200,
      hard_deadline_ms: 1_000,
      rrf_k: 60,
      default_bm25_weight: 0.35,
      default_semantic_weight: 0.65,
    }
  }
}

/// Chunker size policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
  pub target_min_chars: usize,
  pub target_max_chars: usize,
  pub split_threshold_chars: usize,
  pub coalesce_threshold_chars: usize,
  pub fallback_window_lines: usize,
  pub fallback_overlap_lines: usize,
  pub max_file_size_bytes: u64,
}

impl Default for ChunkConfig {
  fn default() -> Self {
    Self {
      target_min_chars: 800,
      target_max_chars: 1_500,
      split_threshold_chars: 4_000,
      coalesce_threshold_chars: 300,
      fallback_window_lines: 50,
      fallback_overlap_lines: 10,
      max_file_size_bytes: 10 * 1024 * 1024,
    }
  }
}

/// Indexer orchestration tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
  pub watcher_debounce_ms: u64,
  /// Number of embedding workers. `None` resolves to `default_embedding_workers()`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub embedding_workers: Option<usize>,
  /// Flush VectorIndex to disk after this many accumulated upserts.
  pub vector_flush_interval: usize,
}

impl Default for IndexConfig {
  fn default() -> Self {
    Self {
      watcher_debounce_ms: 500,
      embedding_workers: None,
      vector_flush_interval: 5_000,
    }
  }
}

/// Default worker pool size: CPU count, capped at 8.
pub fn default_embedding_workers() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4).min(8)
}

/// Full core configuration. Constructed by the shell from `.amanmcp.yaml`
/// plus environment overrides and handed in whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
  pub embedder: EmbedderSelection,
  pub embedding: EmbeddingConfig,
  pub search: SearchConfig,
  pub chunk: ChunkConfig,
  pub index: IndexConfig,
}

impl Config {
  /// Resolve `embedder` from the environment if the shell didn't set one
  /// explicitly (used when constructing the default `Config::default()`).
  pub fn with_embedder_from_env(mut self) -> Self {
    self.embedder = EmbedderSelection::from_env();
    self
  }

  pub fn embedding_workers(&self) -> usize {
    self.index.embedding_workers.unwrap_or_else(default_embedding_workers)
  }
}
