//! Hybrid search: fork-join BM25 + vector retrieval under a shared deadline,
//! fused by Reciprocal Rank Fusion, hydrated from MetadataStore.

use amanmcp_core::{Chunk, ChunkKind, Error, Language, LineRange, Result, SearchConfig};
use embedding::{Embedder, Role};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use store::{KeywordIndex, MetadataStore};
use tracing::warn;
use vector::VectorIndex;

use crate::classifier::{self, QueryWeights};
use crate::expand;
use crate::fusion::{self, FusedHit};

/// Each subsearch is over-fetched by this factor before fusion and
/// hydration trim it back down to `limit`.
const OVERFETCH_FACTOR: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KindFilter {
  Code,
  Doc,
  #[default]
  Both,
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
  pub kind_filter: KindFilter,
  pub lang_filter: Option<Language>,
  pub path_prefix: Option<String>,
  pub limit: usize,
  pub bm25_weight: Option<f64>,
  pub semantic_weight: Option<f64>,
}

impl Default for SearchOptions {
  fn default() -> Self {
    Self {
      kind_filter: KindFilter::Both,
      lang_filter: None,
      path_prefix: None,
      limit: SearchConfig::default().default_limit,
      bm25_weight: None,
      semantic_weight: None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentScores {
  pub bm25: f64,
  pub semantic: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
  pub id: String,
  pub path: String,
  pub lines: LineRange,
  pub content: String,
  pub symbols: Vec<String>,
  pub kind: ChunkKind,
  pub lang: Language,
  pub score: f64,
  pub matched_terms: Vec<String>,
  pub component_scores: ComponentScores,
}

#[derive(Debug, Clone, Default)]
pub struct SearchResponse {
  pub results: Vec<SearchResult>,
  /// Set when one subsearch degraded or was skipped (e.g. embedder down,
  /// dimension mismatch, soft deadline exceeded on one side).
  pub warning: Option<String>,
}

pub struct SearchEngine {
  metadata: MetadataStore,
  keyword: KeywordIndex,
  vector: Arc<VectorIndex>,
  embedder: Arc<dyn Embedder + Send + Sync>,
  config: SearchConfig,
  vector_available: AtomicBool,
  dimension_contract_checked: tokio::sync::OnceCell<()>,
}

impl SearchEngine {
  pub fn new(
    metadata: MetadataStore,
    keyword: KeywordIndex,
    vector: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder + Send + Sync>,
    config: SearchConfig,
  ) -> Self {
    Self {
      metadata,
      keyword,
      vector,
      embedder,
      config,
      vector_available: AtomicBool::new(true),
      dimension_contract_checked: tokio::sync::OnceCell::new(),
    }
  }

  fn default_weights(&self) -> QueryWeights {
    QueryWeights::new(self.config.default_bm25_weight, self.config.default_semantic_weight)
  }

  fn soft_deadline(&self) -> Duration {
    Duration::from_millis(self.config.soft_deadline_ms)
  }

  fn hard_deadline(&self) -> Duration {
    Duration::from_millis(self.config.hard_deadline_ms)
  }

  /// Checks that the embedder that wrote the currently-recorded vectors
  /// still matches this process's embedder, by `(id, dim)`. `search()` runs
  /// this once, lazily, before its first call; a mismatch degrades all
  /// subsequent searches to keyword-only rather than returning garbage
  /// nearest-neighbors.
  pub async fn check_dimension_contract(&self) -> Result<()> {
    let ids = self.metadata.list_all_chunk_ids().await?;
    let Some(sample_id) = ids.into_iter().next() else {
      return Ok(());
    };
    let Some(record) = self.metadata.get_record(sample_id).await? else {
      return Ok(());
    };
    let (Some(recorded_id), Some(recorded_dim)) = (record.embedder_id, record.embedder_dim) else {
      return Ok(());
    };
    if recorded_id != self.embedder.id() || recorded_dim != self.embedder.dim() {
      warn!(
        "embedder mismatch: index was built with {recorded_id} (dim {recorded_dim}), current embedder is {} (dim {}); \
         vector search disabled until reindex",
        self.embedder.id(),
        self.embedder.dim()
      );
      self.vector_available.store(false, Ordering::Relaxed);
    }
    Ok(())
  }

  pub async fn search(&self, query: &str, opts: SearchOptions) -> Result<SearchResponse> {
    if query.trim().is_empty() {
      return Err(Error::InputInvalid("query must not be empty".into()));
    }
    self.dimension_contract_checked.get_or_try_init(|| self.check_dimension_contract()).await?;
    let limit = opts.limit.clamp(1, self.config.max_limit);
    let weights = self.resolve_weights(query, &opts);
    let fetch_limit = limit * OVERFETCH_FACTOR;
    let soft_deadline = self.soft_deadline();

    let keyword = self.keyword.clone();
    let tokens = expand::expand(query);
    let bm25_fut = tokio::time::timeout(soft_deadline, async move { keyword.search(tokens, fetch_limit).await });

    let vector_enabled = self.vector_available.load(Ordering::Relaxed);
    let embedder = self.embedder.clone();
    let vector_index = self.vector.clone();
    let query_owned = query.to_string();
    let vector_fut = tokio::time::timeout(soft_deadline, async move {
      if !vector_enabled {
        return Err(Error::BackendUnavailable("vector search disabled by dimension contract check".into()));
      }
      let embeddings = embedder.embed(&[query_owned], Role::Query).await.map_err(Error::from)?;
      let vector_data = embeddings.into_iter().next().ok_or_else(|| Error::Transient("embedder returned no vector".into()))?;
      let query_vector = amanmcp_core::Vector { data: vector_data };
      let hits = vector_index.search(&query_vector, fetch_limit, None).map_err(|e| Error::Transient(e.to_string()))?;
      Ok::<_, Error>(hits)
    });

    let search_body = async {
      let (bm25_outcome, vector_outcome) = tokio::join!(bm25_fut, vector_fut);

      let bm25_result = flatten_timeout(bm25_outcome);
      let vector_result = flatten_timeout(vector_outcome);

      let mut warning = None;
      let bm25_hits = match bm25_result {
        Ok(hits) => hits,
        Err(e) => {
          warning = Some(format!("keyword search unavailable: {e}"));
          Vec::new()
        }
      };
      let vector_hits = match vector_result {
        Ok(hits) => hits,
        Err(e) => {
          if warning.is_none() {
            warning = Some(format!("vector search unavailable: {e}"));
          }
          Vec::new()
        }
      };

      if bm25_hits.is_empty() && vector_hits.is_empty() {
        return Err(Error::BackendUnavailable("both keyword and vector search failed".into()));
      }

      let bm25_ranked: Vec<(String, f64, Vec<String>)> =
        bm25_hits.into_iter().map(|h| (h.id, h.score, h.matched_terms)).collect();
      let semantic_ranked: Vec<(String, f32)> = vector_hits.into_iter().map(|h| (h.id, h.cosine_similarity)).collect();

      let fused = fusion::fuse(&bm25_ranked, &semantic_ranked, weights, self.config.rrf_k as f64);
      let results = self.hydrate_and_filter(fused, &opts, limit).await?;
      Ok(SearchResponse { results, warning })
    };

    tokio::time::timeout(self.hard_deadline(), search_body)
      .await
      .map_err(|_| Error::Transient("search exceeded hard deadline".into()))?
  }

  fn resolve_weights(&self, query: &str, opts: &SearchOptions) -> QueryWeights {
    if let (Some(bm25), Some(semantic)) = (opts.bm25_weight, opts.semantic_weight) {
      return QueryWeights::new(bm25, semantic);
    }
    classifier::classify(query, self.default_weights())
  }

  async fn hydrate_and_filter(&self, fused: Vec<FusedHit>, opts: &SearchOptions, limit: usize) -> Result<Vec<SearchResult>> {
    let ids: Vec<String> = fused.iter().map(|h| h.id.clone()).collect();
    let records = self.metadata.get_many(ids).await?;
    let by_id: std::collections::HashMap<String, amanmcp_core::IndexRecord> =
      records.into_iter().map(|r| (r.chunk.id.clone(), r)).collect();

    let mut results = Vec::new();
    for hit in fused {
      let Some(record) = by_id.get(&hit.id) else { continue };
      let chunk: &Chunk = &record.chunk;
      if !matches_kind(chunk.kind, opts.kind_filter) {
        continue;
      }
      if let Some(lang) = opts.lang_filter
        && chunk.lang != lang
      {
        continue;
      }
      if let Some(prefix) = &opts.path_prefix
        && !chunk.path.starts_with(prefix.as_str())
      {
        continue;
      }
      results.push(SearchResult {
        id: chunk.id.clone(),
        path: chunk.path.clone(),
        lines: chunk.lines,
        content: chunk.content.clone(),
        symbols: chunk.symbols.clone(),
        kind: chunk.kind,
        lang: chunk.lang,
        score: hit.score,
        matched_terms: hit.matched_terms,
        component_scores: ComponentScores { bm25: hit.bm25_score, semantic: hit.semantic_score },
      });
      if results.len() >= limit {
        break;
      }
    }
    Ok(results)
  }
}

fn matches_kind(kind: ChunkKind, filter: KindFilter) -> bool {
  match filter {
    KindFilter::Both => true,
    KindFilter::Code => matches!(kind, ChunkKind::Code | ChunkKind::Comment),
    KindFilter::Doc => matches!(kind, ChunkKind::Doc),
  }
}

fn flatten_timeout<T>(outcome: std::result::Result<Result<T>, tokio::time::error::Elapsed>) -> Result<T> {
  match outcome {
    Ok(inner) => inner,
    Err(_) => Err(Error::Transient("subsearch exceeded soft deadline".into())),
  }
}
