//! MetadataStore: the root of truth for `Chunk`/`IndexRecord`/`FileState`.
//!
//! KeywordIndex and VectorIndex hold only id-keyed projections derived from
//! what's committed here. Deletes remove the MetadataStore row last, so a
//! crash mid-delete leaves projections pointing at ids that still resolve
//! rather than dangling.

use amanmcp_core::{Chunk, ChunkKind, Error, FileState, IndexRecord, Language, LineRange};
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, Transaction, params};
use std::collections::HashSet;
use tracing::debug;

use crate::connection::{Result, StoreHandle};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataStats {
  pub file_count: usize,
  pub chunk_count: usize,
}

#[derive(Clone)]
pub struct MetadataStore {
  handle: StoreHandle,
}

impl MetadataStore {
  pub fn new(handle: StoreHandle) -> Self {
    Self { handle }
  }

  /// Atomically replace a file's chunk set and FileState: delete the file's
  /// previous chunks, insert the new ones, and write the new FileState, all
  /// in one transaction. Returns the ids of chunks that were removed (for
  /// the caller to evict from KeywordIndex/VectorIndex).
  pub async fn commit_file(&self, file_state: FileState, records: Vec<IndexRecord>) -> Result<Vec<String>> {
    let path = file_state.path.clone();
    let inserted = records.len();
    let removed = self
      .handle
      .with_transaction(move |tx| {
        let removed = delete_file_chunks_tx(tx, &file_state.path)?;
        upsert_file_state_tx(tx, &file_state)?;
        for record in &records {
          upsert_record_tx(tx, record)?;
        }
        Ok(removed)
      })
      .await?;
    debug!(%path, inserted, removed = removed.len(), "committed file");
    Ok(removed)
  }

  /// Incremental counterpart to `commit_file`: deletes only chunk ids from
  /// `previous_chunk_ids` that are absent from the new `file_state`, and
  /// upserts only records whose id wasn't already in `previous_chunk_ids` —
  /// since `Chunk::id` is derived from its content, a surviving id means
  /// identical content, so that chunk is left completely untouched.
  /// Always writes the new `FileState`. Returns the removed ids.
  pub async fn commit_file_diff(
    &self,
    file_state: FileState,
    records: Vec<IndexRecord>,
    previous_chunk_ids: Vec<String>,
  ) -> Result<Vec<String>> {
    let path = file_state.path.clone();
    let previous: HashSet<String> = previous_chunk_ids.into_iter().collect();
    let new_ids: HashSet<&str> = file_state.chunk_ids.iter().map(String::as_str).collect();
    let to_remove: Vec<String> = previous.iter().filter(|id| !new_ids.contains(id.as_str())).cloned().collect();
    let to_insert: Vec<IndexRecord> = records.into_iter().filter(|r| !previous.contains(&r.chunk.id)).collect();
    let inserted = to_insert.len();

    let removed = self
      .handle
      .with_transaction(move |tx| {
        for id in &to_remove {
          tx.execute("DELETE FROM chunks WHERE id = ?1", params![id]).map_err(|e| Error::Transient(e.to_string()))?;
        }
        upsert_file_state_tx(tx, &file_state)?;
        for record in &to_insert {
          upsert_record_tx(tx, record)?;
        }
        Ok(to_remove)
      })
      .await?;
    debug!(%path, inserted, removed = removed.len(), "committed file diff");
    Ok(removed)
  }

  /// Updates only `mtime`/`size`/`content_hash_of_file` for a file whose
  /// content is unchanged despite a stat change (touch, chmod, copy that
  /// preserves bytes). Chunks are left completely untouched.
  pub async fn touch_file_state(&self, file_state: FileState) -> Result<()> {
    self.handle.with_transaction(move |tx| upsert_file_state_tx(tx, &file_state)).await
  }

  /// Delete a file's FileState and all its chunks (file-removal event).
  /// Returns the removed chunk ids.
  pub async fn delete_file(&self, path: String) -> Result<Vec<String>> {
    self
      .handle
      .with_transaction(move |tx| {
        let removed = delete_file_chunks_tx(tx, &path)?;
        tx.execute("DELETE FROM files WHERE path = ?1", params![path])
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(removed)
      })
      .await
  }

  pub async fn get_file_state(&self, path: String) -> Result<Option<FileState>> {
    self
      .handle
      .with_conn(move |conn| {
        let state = conn
          .query_row(
            "SELECT path, mtime, size, content_hash_of_file FROM files WHERE path = ?1",
            params![path],
            row_to_file_state,
          )
          .optional()
          .map_err(|e| Error::Transient(e.to_string()))?;
        let Some(mut state) = state else { return Ok(None) };
        state.chunk_ids = conn
          .prepare("SELECT id FROM chunks WHERE path = ?1")
          .and_then(|mut stmt| {
            let ids = stmt
              .query_map(params![state.path], |r| r.get::<_, String>(0))?
              .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
          })
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(Some(state))
      })
      .await
  }

  pub async fn get_record(&self, id: String) -> Result<Option<IndexRecord>> {
    self
      .handle
      .with_conn(move |conn| {
        conn
          .query_row(SELECT_RECORD_SQL, params![id], row_to_record)
          .optional()
          .map_err(|e| Error::Transient(e.to_string()))
      })
      .await
  }

  /// Batch-hydrate records for a set of ids, preserving no particular order.
  /// Unknown ids are silently omitted rather than erroring.
  pub async fn get_many(&self, ids: Vec<String>) -> Result<Vec<IndexRecord>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    self
      .handle
      .with_conn(move |conn| {
        let placeholders = std::iter::repeat_n("?", ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!("SELECT id, path, content, lang, kind, start_line, end_line, symbols, content_hash, embedding_text, file_mtime, file_size, indexed_at, embedder_id, embedder_dim FROM chunks WHERE id IN ({placeholders})");
        let mut stmt = conn.prepare(&sql).map_err(|e| Error::Transient(e.to_string()))?;
        let params_refs: Vec<&dyn rusqlite::ToSql> = ids.iter().map(|i| i as &dyn rusqlite::ToSql).collect();
        let rows = stmt
          .query_map(params_refs.as_slice(), row_to_record)
          .map_err(|e| Error::Transient(e.to_string()))?;
        rows.collect::<std::result::Result<Vec<_>, _>>().map_err(|e| Error::Transient(e.to_string()))
      })
      .await
  }

  /// All chunk ids currently recorded. Used by crash-recovery to detect
  /// chunks with no corresponding vector.
  pub async fn list_all_chunk_ids(&self) -> Result<Vec<String>> {
    self
      .handle
      .with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT id FROM chunks").map_err(|e| Error::Transient(e.to_string()))?;
        let ids = stmt
          .query_map([], |r| r.get::<_, String>(0))
          .map_err(|e| Error::Transient(e.to_string()))?
          .collect::<std::result::Result<Vec<_>, _>>()
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(ids)
      })
      .await
  }

  /// Chunk ids for a given embedder id/dim that are still vector-less
  /// (`embedder_id IS NULL`), for re-embedding after a restart.
  pub async fn list_vectorless_chunk_ids(&self) -> Result<Vec<String>> {
    self
      .handle
      .with_conn(|conn| {
        let mut stmt = conn
          .prepare("SELECT id FROM chunks WHERE embedder_id IS NULL")
          .map_err(|e| Error::Transient(e.to_string()))?;
        let ids = stmt
          .query_map([], |r| r.get::<_, String>(0))
          .map_err(|e| Error::Transient(e.to_string()))?
          .collect::<std::result::Result<Vec<_>, _>>()
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(ids)
      })
      .await
  }

  /// Every known file path + mtime/size, for diffing against a fresh scan
  /// to find files that were deleted since the last run.
  pub async fn list_all_file_states(&self) -> Result<Vec<FileState>> {
    self
      .handle
      .with_conn(|conn| {
        let mut stmt = conn
          .prepare("SELECT path, mtime, size, content_hash_of_file FROM files")
          .map_err(|e| Error::Transient(e.to_string()))?;
        let states = stmt
          .query_map([], row_to_file_state)
          .map_err(|e| Error::Transient(e.to_string()))?
          .collect::<std::result::Result<Vec<_>, _>>()
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(states)
      })
      .await
  }

  pub async fn stats(&self) -> Result<MetadataStats> {
    self
      .handle
      .with_conn(|conn| {
        let file_count: i64 = conn
          .query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))
          .map_err(|e| Error::Transient(e.to_string()))?;
        let chunk_count: i64 = conn
          .query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))
          .map_err(|e| Error::Transient(e.to_string()))?;
        Ok(MetadataStats {
          file_count: file_count as usize,
          chunk_count: chunk_count as usize,
        })
      })
      .await
  }
}

const SELECT_RECORD_SQL: &str = "SELECT id, path, content, lang, kind, start_line, end_line, symbols, content_hash, embedding_text, file_mtime, file_size, indexed_at, embedder_id, embedder_dim FROM chunks WHERE id = ?1";

fn delete_file_chunks_tx(tx: &Transaction, path: &str) -> Result<Vec<String>> {
  let ids = {
    let mut stmt = tx
      .prepare("SELECT id FROM chunks WHERE path = ?1")
      .map_err(|e| Error::Transient(e.to_string()))?;
    stmt
      .query_map(params![path], |r| r.get::<_, String>(0))
      .map_err(|e| Error::Transient(e.to_string()))?
      .collect::<std::result::Result<Vec<_>, _>>()
      .map_err(|e| Error::Transient(e.to_string()))?
  };
  tx.execute("DELETE FROM chunks WHERE path = ?1", params![path])
    .map_err(|e| Error::Transient(e.to_string()))?;
  Ok(ids)
}

fn upsert_file_state_tx(tx: &Transaction, state: &FileState) -> Result<()> {
  tx.execute(
    "INSERT INTO files (path, mtime, size, content_hash_of_file) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(path) DO UPDATE SET mtime = excluded.mtime, size = excluded.size, content_hash_of_file = excluded.content_hash_of_file",
    params![state.path, state.mtime as i64, state.size as i64, state.content_hash_of_file],
  )
  .map_err(|e| Error::Transient(e.to_string()))?;
  Ok(())
}

fn upsert_record_tx(tx: &Transaction, record: &IndexRecord) -> Result<()> {
  let symbols = serde_json::to_string(&record.chunk.symbols).map_err(|e| Error::Fatal(e.to_string()))?;
  tx.execute(
    "INSERT INTO chunks (id, path, content, lang, kind, start_line, end_line, symbols, content_hash, embedding_text, file_mtime, file_size, indexed_at, embedder_id, embedder_dim)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
     ON CONFLICT(id) DO UPDATE SET
       content = excluded.content, lang = excluded.lang, kind = excluded.kind,
       start_line = excluded.start_line, end_line = excluded.end_line, symbols = excluded.symbols,
       content_hash = excluded.content_hash, embedding_text = excluded.embedding_text,
       file_mtime = excluded.file_mtime, file_size = excluded.file_size, indexed_at = excluded.indexed_at,
       embedder_id = excluded.embedder_id, embedder_dim = excluded.embedder_dim",
    params![
      record.chunk.id,
      record.chunk.path,
      record.chunk.content,
      record.chunk.lang.tag(),
      chunk_kind_to_str(record.chunk.kind),
      record.chunk.lines.start,
      record.chunk.lines.end,
      symbols,
      record.chunk.content_hash,
      record.chunk.embedding_text,
      record.file_mtime as i64,
      record.file_size as i64,
      record.indexed_at.to_rfc3339(),
      record.embedder_id,
      record.embedder_dim.map(|d| d as i64),
    ],
  )
  .map_err(|e| Error::Transient(e.to_string()))?;
  Ok(())
}

fn chunk_kind_to_str(kind: ChunkKind) -> &'static str {
  match kind {
    ChunkKind::Code => "code",
    ChunkKind::Doc => "doc",
    ChunkKind::Comment => "comment",
  }
}

fn chunk_kind_from_str(s: &str) -> ChunkKind {
  match s {
    "doc" => ChunkKind::Doc,
    "comment" => ChunkKind::Comment,
    _ => ChunkKind::Code,
  }
}

fn row_to_file_state(row: &rusqlite::Row) -> rusqlite::Result<FileState> {
  Ok(FileState {
    path: row.get(0)?,
    mtime: row.get::<_, i64>(1)? as u64,
    size: row.get::<_, i64>(2)? as u64,
    content_hash_of_file: row.get(3)?,
    chunk_ids: Vec::new(),
  })
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<IndexRecord> {
  let lang_tag: String = row.get(3)?;
  let kind_tag: String = row.get(4)?;
  let symbols_json: String = row.get(7)?;
  let symbols: Vec<String> = serde_json::from_str(&symbols_json).unwrap_or_default();
  let indexed_at_str: String = row.get(12)?;
  let indexed_at: DateTime<Utc> = indexed_at_str.parse().unwrap_or_else(|_| Utc::now());

  let chunk = Chunk {
    id: row.get(0)?,
    path: row.get(1)?,
    content: row.get(2)?,
    lang: Language::from_extension(&lang_tag),
    kind: chunk_kind_from_str(&kind_tag),
    lines: LineRange::new(row.get::<_, i64>(5)? as u32, row.get::<_, i64>(6)? as u32),
    symbols,
    content_hash: row.get(8)?,
    embedding_text: row.get(9)?,
  };

  Ok(IndexRecord {
    chunk,
    file_mtime: row.get::<_, i64>(10)? as u64,
    file_size: row.get::<_, i64>(11)? as u64,
    indexed_at,
    embedder_id: row.get(13)?,
    embedder_dim: row.get::<_, Option<i64>>(14)?.map(|d| d as usize),
  })
}
