use crate::provider::{Embedder, EmbeddingError, Role};
use async_trait::async_trait;

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

const TOKEN_WEIGHT: f32 = 0.7;
const TRIGRAM_WEIGHT: f32 = 0.3;

fn fnv1a(bytes: &[u8]) -> u64 {
  let mut hash = FNV_OFFSET_BASIS;
  for b in bytes {
    hash ^= *b as u64;
    hash = hash.wrapping_mul(FNV_PRIME);
  }
  hash
}

fn tokens(text: &str) -> Vec<String> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|t| !t.is_empty())
    .map(|t| t.to_lowercase())
    .collect()
}

fn char_trigrams(text: &str) -> Vec<String> {
  let chars: Vec<char> = text.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
  if chars.len() < 3 {
    return Vec::new();
  }
  chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Deterministic, network-free embedding: whole tokens and character
/// trigrams are each hashed into a fixed-width vector and accumulated with
/// separate weights, then L2-normalized. Not semantically meaningful on its
/// own merits; exists so keyword search keeps working (and the hybrid
/// pipeline keeps producing a `component_scores.semantic` entry) when no
/// network embedder is reachable.
pub fn hash_embed(text: &str, dim: usize) -> Vec<f32> {
  let mut vec = vec![0f32; dim];
  for token in tokens(text) {
    let idx = (fnv1a(token.as_bytes()) % dim as u64) as usize;
    vec[idx] += TOKEN_WEIGHT;
  }
  for gram in char_trigrams(text) {
    let idx = (fnv1a(gram.as_bytes()) % dim as u64) as usize;
    vec[idx] += TRIGRAM_WEIGHT;
  }
  let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
  if norm > 0.0 {
    for v in vec.iter_mut() {
      *v /= norm;
    }
  }
  vec
}

#[derive(Debug, Clone, Copy)]
pub struct StaticHashEmbedder {
  dim: usize,
}

impl StaticHashEmbedder {
  pub fn new(dim: usize) -> Self {
    Self { dim }
  }
}

#[async_trait]
impl Embedder for StaticHashEmbedder {
  fn id(&self) -> String {
    format!("static-hash:{}", self.dim)
  }

  fn dim(&self) -> usize {
    self.dim
  }

  async fn available(&self) -> bool {
    true
  }

  async fn embed(&self, texts: &[String], role: Role) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let prefix = role.query_prefix().unwrap_or("");
    Ok(
      texts
        .iter()
        .map(|t| {
          let joined = format!("{prefix}{t}");
          hash_embed(&joined, self.dim)
        })
        .collect(),
    )
  }
}
