//! Reciprocal Rank Fusion over a BM25 ranking and a vector-similarity
//! ranking. Missing ranks (a chunk absent from one side's result list)
//! contribute zero to that side's term.

use crate::classifier::QueryWeights;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct FusedHit {
  pub id: String,
  pub score: f64,
  pub bm25_score: f64,
  pub semantic_score: f64,
  pub bm25_rank: Option<usize>,
  pub semantic_rank: Option<usize>,
  pub matched_terms: Vec<String>,
}

/// `bm25_ranked`/`semantic_ranked` are already best-first. Raw scores
/// (`KeywordHit.score`, `VectorHit.cosine_similarity`) are carried through
/// for `component_scores` but play no part in the fused ranking itself.
pub fn fuse(
  bm25_ranked: &[(String, f64, Vec<String>)],
  semantic_ranked: &[(String, f32)],
  weights: QueryWeights,
  k: f64,
) -> Vec<FusedHit> {
  let mut bm25_rank: HashMap<&str, usize> = HashMap::new();
  let mut bm25_score: HashMap<&str, f64> = HashMap::new();
  let mut bm25_terms: HashMap<&str, &[String]> = HashMap::new();
  for (rank, (id, score, terms)) in bm25_ranked.iter().enumerate() {
    bm25_rank.insert(id.as_str(), rank);
    bm25_score.insert(id.as_str(), *score);
    bm25_terms.insert(id.as_str(), terms.as_slice());
  }

  let mut semantic_rank: HashMap<&str, usize> = HashMap::new();
  let mut semantic_score: HashMap<&str, f64> = HashMap::new();
  for (rank, (id, score)) in semantic_ranked.iter().enumerate() {
    semantic_rank.insert(id.as_str(), rank);
    semantic_score.insert(id.as_str(), *score as f64);
  }

  let mut ids: Vec<&str> = bm25_rank.keys().chain(semantic_rank.keys()).copied().collect();
  ids.sort_unstable();
  ids.dedup();

  let mut hits: Vec<FusedHit> = ids
    .into_iter()
    .map(|id| {
      let b_rank = bm25_rank.get(id).copied();
      let s_rank = semantic_rank.get(id).copied();
      let bm25_term = b_rank.map(|r| weights.bm25 / (k + r as f64 + 1.0)).unwrap_or(0.0);
      let semantic_term = s_rank.map(|r| weights.semantic / (k + r as f64 + 1.0)).unwrap_or(0.0);
      FusedHit {
        id: id.to_string(),
        score: bm25_term + semantic_term,
        bm25_score: bm25_score.get(id).copied().unwrap_or(0.0),
        semantic_score: semantic_score.get(id).copied().unwrap_or(0.0),
        bm25_rank: b_rank,
        semantic_rank: s_rank,
        matched_terms: bm25_terms.get(id).map(|t| t.to_vec()).unwrap_or_default(),
      }
    })
    .collect();

  hits.sort_by(|a, b| {
    b.score
      .partial_cmp(&a.score)
      .unwrap_or(std::cmp::Ordering::Equal)
      .then_with(|| tie_break(a, b))
  });
  hits
}

/// `in_both_lists > bm25_rank_smaller > id_lex_smaller`, applied only when
/// scores are equal (the common case being two chunks absent from the
/// vector side entirely, both scored by BM25 alone).
fn tie_break(a: &FusedHit, b: &FusedHit) -> std::cmp::Ordering {
  let a_both = a.bm25_rank.is_some() && a.semantic_rank.is_some();
  let b_both = b.bm25_rank.is_some() && b.semantic_rank.is_some();
  match b_both.cmp(&a_both) {
    std::cmp::Ordering::Equal => {}
    other => return other,
  }
  match (a.bm25_rank, b.bm25_rank) {
    (Some(ra), Some(rb)) => ra.cmp(&rb).then_with(|| a.id.cmp(&b.id)),
    (Some(_), None) => std::cmp::Ordering::Less,
    (None, Some(_)) => std::cmp::Ordering::Greater,
    (None, None) => a.id.cmp(&b.id),
  }
}
