//! KeywordIndex: BM25 ranking over chunk content via SQLite FTS5.
//!
//! Holds only `chunk_id` + tokenized text, never the canonical chunk; an
//! unknown id returned by a search is filtered at the caller's join step
//! rather than treated as a crash.

use amanmcp_core::Error;
use rusqlite::params;

use crate::connection::{Result, StoreHandle};
use crate::tokenize::tokenize;

#[derive(Debug, Clone, PartialEq)]
pub struct KeywordHit {
  pub id: String,
  pub score: f64,
  pub matched_terms: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordStats {
  pub indexed_chunks: usize,
}

#[derive(Clone)]
pub struct KeywordIndex {
  handle: StoreHandle,
}

impl KeywordIndex {
  pub fn new(handle: StoreHandle) -> Self {
    Self { handle }
  }

  /// Tokenize `content` and (re)index it under `chunk_id`, replacing any
  /// previous entry for that id.
  pub async fn upsert(&self, chunk_id: String, content: String) -> Result<()> {
    let tokens = tokenize(&content).join(" ");
    self
      .handle
      .with_conn(move |conn| {
        conn
          .execute("DELETE FROM chunks_fts WHERE chunk_id = ?1", params![chunk_id])
          .map_err(|e| Error::Transient(e.to_string()))?;
        conn
          .execute(
            "INSERT INTO chunks_fts (chunk_id, tokens) VALUES (?1, ?2)",
            params![chunk_id, tokens],
          )
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(())
      })
      .await
  }

  pub async fn delete(&self, chunk_id: String) -> Result<()> {
    self
      .handle
      .with_conn(move |conn| {
        conn
          .execute("DELETE FROM chunks_fts WHERE chunk_id = ?1", params![chunk_id])
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(())
      })
      .await
  }

  /// Search for chunks matching any of `tokens`, ranked by BM25 (best first).
  /// Unknown/malformed token lists that produce an empty MATCH query return
  /// an empty result rather than erroring (all-stopword queries hit this).
  pub async fn search(&self, tokens: Vec<String>, limit: usize) -> Result<Vec<KeywordHit>> {
    let terms: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).filter(|t| !t.is_empty()).collect();
    if terms.is_empty() {
      return Ok(Vec::new());
    }
    let match_query = terms
      .iter()
      .map(|t| format!("\"{}\"", t.replace('"', "\"\"")))
      .collect::<Vec<_>>()
      .join(" OR ");

    self
      .handle
      .with_conn(move |conn| {
        let mut stmt = conn
          .prepare(
            "SELECT chunk_id, bm25(chunks_fts) AS rank, tokens FROM chunks_fts
             WHERE chunks_fts MATCH ?1 ORDER BY rank LIMIT ?2",
          )
          .map_err(|e| Error::Transient(e.to_string()))?;
        let rows = stmt
          .query_map(params![match_query, limit as i64], |row| {
            let id: String = row.get(0)?;
            let rank: f64 = row.get(1)?;
            let indexed_tokens: String = row.get(2)?;
            Ok((id, rank, indexed_tokens))
          })
          .map_err(|e| Error::Transient(e.to_string()))?;

        let mut hits = Vec::new();
        for row in rows {
          let (id, rank, indexed_tokens) = row.map_err(|e| Error::Transient(e.to_string()))?;
          let indexed_set: std::collections::HashSet<&str> = indexed_tokens.split(' ').collect();
          let matched_terms = terms.iter().filter(|t| indexed_set.contains(t.as_str())).cloned().collect();
          // bm25() returns smaller-is-better; negate so callers see higher-is-better.
          hits.push(KeywordHit { id, score: -rank, matched_terms });
        }
        Ok(hits)
      })
      .await
  }

  pub async fn stats(&self) -> Result<KeywordStats> {
    self
      .handle
      .with_conn(|conn| {
        let count: i64 = conn
          .query_row("SELECT COUNT(*) FROM chunks_fts", [], |r| r.get(0))
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(KeywordStats { indexed_chunks: count as usize })
      })
      .await
  }
}
