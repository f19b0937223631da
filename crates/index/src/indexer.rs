//! Orchestrates scanning, chunking, embedding, and committing to the
//! metadata/keyword/vector stores. Resumable by construction: `FileState`
//! rows in `MetadataStore` are themselves the checkpoint, so a restart mid
//! run just re-diffs a fresh scan against what's already committed; no
//! separate checkpoint file exists.

use amanmcp_core::{ChunkConfig, EmbeddingConfig, Error, FileState, IndexConfig, IndexRecord, Vector};
use chrono::Utc;
use embedding::{Embedder, Role};
use parser::TreeSitterParser;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use store::{KeywordIndex, MetadataStore};
use tracing::{error, info, warn};
use vector::VectorIndex;

use crate::chunker::{self, Chunker};
use crate::scanner::{Scanner, ScannedFile};
use crate::watcher::{ChangeKind, FileChange};

#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
  pub files_scanned: usize,
  pub files_indexed: usize,
  pub files_unchanged: usize,
  /// Stat changed (mtime/size) but content was byte-identical: `FileState`
  /// was updated but no chunk was re-read, re-embedded, or rewritten.
  pub files_content_unchanged: usize,
  pub files_deleted: usize,
  pub chunks_indexed: usize,
  pub errors: usize,
}

/// Result of reconciling one file against its previous `FileState`.
enum ProcessOutcome {
  Indexed(usize),
  ContentUnchanged,
}

pub struct Indexer {
  root: PathBuf,
  metadata: MetadataStore,
  keyword: KeywordIndex,
  vector: Arc<VectorIndex>,
  embedder: Arc<dyn Embedder + Send + Sync>,
  chunker: Chunker,
  index_config: IndexConfig,
  embedding_config: EmbeddingConfig,
  scanner: Scanner,
}

impl Indexer {
  pub fn new(
    root: impl Into<PathBuf>,
    metadata: MetadataStore,
    keyword: KeywordIndex,
    vector: Arc<VectorIndex>,
    embedder: Arc<dyn Embedder + Send + Sync>,
    chunk_config: ChunkConfig,
    index_config: IndexConfig,
    embedding_config: EmbeddingConfig,
  ) -> Self {
    let scanner = Scanner::new().with_max_file_size(chunk_config.max_file_size_bytes);
    Self {
      root: root.into(),
      metadata,
      keyword,
      vector,
      embedder,
      chunker: Chunker::new(chunk_config),
      index_config,
      embedding_config,
      scanner,
    }
  }

  /// Scan the whole tree, indexing changed/new files and removing state for
  /// files that disappeared. Safe to call repeatedly; unchanged files are
  /// skipped via `FileState::unchanged_by_stat`. Changed files are processed
  /// by a worker pool sized by `IndexConfig::embedding_workers`.
  pub async fn full_scan(self: &Arc<Self>) -> Result<IndexStats, Error> {
    let root = self.root.clone();
    let scanner = self.scanner;
    let scan_result = tokio::task::spawn_blocking(move || scanner.scan(&root, |_| {}))
      .await
      .map_err(|e| Error::Fatal(e.to_string()))?;

    let mut stats = IndexStats { files_scanned: scan_result.files.len(), ..Default::default() };
    let mut seen_paths: HashSet<String> = HashSet::new();
    let workers = self.index_config.embedding_workers.unwrap_or_else(amanmcp_core::default_embedding_workers);

    let mut to_process = Vec::new();
    for scanned in scan_result.files {
      seen_paths.insert(scanned.relative_path.clone());
      let existing = self.metadata.get_file_state(scanned.relative_path.clone()).await?;
      if let Some(state) = &existing
        && state.unchanged_by_stat(scanned.mtime, scanned.size)
      {
        stats.files_unchanged += 1;
        continue;
      }
      to_process.push(scanned);
    }

    let semaphore = Arc::new(tokio::sync::Semaphore::new(workers.max(1)));
    let mut join_set = tokio::task::JoinSet::new();
    for scanned in to_process {
      let indexer = self.clone();
      let permit = semaphore.clone();
      join_set.spawn(async move {
        let _permit = permit.acquire_owned().await.expect("semaphore never closed");
        let mut parser = TreeSitterParser::new();
        let result = indexer.process_file_diff(&mut parser, &scanned).await;
        (scanned.relative_path, result)
      });
    }
    while let Some(outcome) = join_set.join_next().await {
      let (path, result) = outcome.map_err(|e| Error::Fatal(e.to_string()))?;
      match result {
        Ok(ProcessOutcome::Indexed(chunk_count)) => {
          stats.files_indexed += 1;
          stats.chunks_indexed += chunk_count;
        }
        Ok(ProcessOutcome::ContentUnchanged) => {
          stats.files_content_unchanged += 1;
        }
        Err(e) => {
          error!("failed to index {path}: {e}");
          stats.errors += 1;
        }
      }
    }

    let known_states = self.metadata.list_all_file_states().await?;
    for state in known_states {
      if !seen_paths.contains(&state.path) {
        match self.remove_file(&state.path).await {
          Ok(()) => stats.files_deleted += 1,
          Err(e) => {
            error!("failed to remove deleted file {}: {}", state.path, e);
            stats.errors += 1;
          }
        }
      }
    }

    info!(
      "full scan complete: {} scanned, {} indexed, {} unchanged, {} deleted, {} errors",
      stats.files_scanned, stats.files_indexed, stats.files_unchanged, stats.files_deleted, stats.errors
    );
    Ok(stats)
  }

  /// Re-index a single file, returning the number of chunks (re)written.
  /// A file whose content turned out byte-identical despite a stat change
  /// reports 0, not an error; see `process_file_diff` for the full
  /// three-tier reconciliation this wraps.
  pub async fn process_file(&self, parser: &mut TreeSitterParser, scanned: &ScannedFile) -> Result<usize, Error> {
    match self.process_file_diff(parser, scanned).await? {
      ProcessOutcome::Indexed(n) => Ok(n),
      ProcessOutcome::ContentUnchanged => Ok(0),
    }
  }

  /// Reconciles one file against its previous `FileState` in three tiers:
  /// (1) by this point the caller has already filtered out files unchanged
  /// by `(mtime, size)`; (2) stat changed but the whole-file content hash
  /// is identical to what's on record: update `FileState` only, touch no
  /// chunk; (3) content actually changed: chunk, diff the new chunk ids
  /// against the old ones by id (which embeds content), and only
  /// insert/delete what differs. Commit order is chunk -> embed -> metadata
  /// commit -> projection upsert, so a failure before the metadata commit
  /// leaves no partial state; a failure after it is rolled back by
  /// deleting the file again.
  async fn process_file_diff(&self, parser: &mut TreeSitterParser, scanned: &ScannedFile) -> Result<ProcessOutcome, Error> {
    let content = tokio::fs::read_to_string(&scanned.path).await.map_err(|e| Error::Transient(e.to_string()))?;
    let content_hash = crate::scanner::full_content_hash(&scanned.path).map_err(|e| Error::Transient(e.to_string()))?;

    let existing = self.metadata.get_file_state(scanned.relative_path.clone()).await?;
    if let Some(existing) = &existing
      && existing.content_hash_of_file == content_hash
    {
      let file_state = FileState {
        path: scanned.relative_path.clone(),
        mtime: scanned.mtime,
        size: scanned.size,
        content_hash_of_file: content_hash,
        chunk_ids: existing.chunk_ids.clone(),
      };
      self.metadata.touch_file_state(file_state).await?;
      return Ok(ProcessOutcome::ContentUnchanged);
    }

    let Some(mut chunks) = self.chunker.chunk_file(parser, &scanned.relative_path, &content, scanned.language) else {
      self.remove_file(&scanned.relative_path).await?;
      return Ok(ProcessOutcome::Indexed(0));
    };

    let lines: Vec<&str> = content.lines().collect();
    for chunk in &mut chunks {
      chunker::materialize(chunk, &lines, None);
    }

    let previous_chunk_ids = existing.map(|s| s.chunk_ids).unwrap_or_default();
    let previous_ids: HashSet<&str> = previous_chunk_ids.iter().map(String::as_str).collect();
    let all_chunk_ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();

    // Chunks whose id already existed carry identical content (the id is
    // derived from it), so they're skipped here entirely: no re-read, no
    // re-embed, no rewrite to metadata or the keyword/vector projections.
    let to_embed: Vec<_> = chunks.into_iter().filter(|c| !previous_ids.contains(c.id.as_str())).collect();

    let mut records = Vec::with_capacity(to_embed.len());
    let batch_size = self.embedding_config.batch_size.max(1);
    for batch in to_embed.chunks(batch_size) {
      let texts: Vec<String> = batch.iter().map(|c| c.embedding_text.clone()).collect();
      let vectors = self.embedder.embed(&texts, Role::Document).await.map_err(amanmcp_core::Error::from)?;
      if vectors.len() != batch.len() {
        return Err(Error::BackendUnavailable(format!(
          "embedder returned {} vectors for {} chunks",
          vectors.len(),
          batch.len()
        )));
      }
      for (chunk, vector) in batch.iter().zip(vectors.into_iter()) {
        records.push((
          IndexRecord {
            chunk: chunk.clone(),
            file_mtime: scanned.mtime,
            file_size: scanned.size,
            indexed_at: Utc::now(),
            embedder_id: Some(self.embedder.id()),
            embedder_dim: Some(vector.len()),
          },
          Vector { data: vector },
        ));
      }
      if self.embedding_config.inter_batch_delay_ms > 0 {
        tokio::time::sleep(std::time::Duration::from_millis(self.embedding_config.inter_batch_delay_ms)).await;
      }
    }

    let file_state = FileState {
      path: scanned.relative_path.clone(),
      mtime: scanned.mtime,
      size: scanned.size,
      content_hash_of_file: content_hash,
      chunk_ids: all_chunk_ids,
    };
    let index_records: Vec<IndexRecord> = records.iter().map(|(r, _)| r.clone()).collect();

    let removed_ids = self.metadata.commit_file_diff(file_state, index_records, previous_chunk_ids).await?;

    if let Err(e) = self.apply_projections(&removed_ids, &records).await {
      warn!("rolling back {} after projection failure: {}", scanned.relative_path, e);
      let _ = self.metadata.delete_file(scanned.relative_path.clone()).await;
      return Err(e);
    }

    Ok(ProcessOutcome::Indexed(records.len()))
  }

  async fn apply_projections(&self, removed_ids: &[String], records: &[(IndexRecord, Vector)]) -> Result<(), Error> {
    for id in removed_ids {
      self.keyword.delete(id.clone()).await?;
      self.vector.delete(id).map_err(|e| Error::Transient(e.to_string()))?;
    }
    for (record, vector) in records {
      self.keyword.upsert(record.chunk.id.clone(), record.chunk.content.clone()).await?;
      self.vector.upsert(&record.chunk.id, vector).map_err(|e| Error::Transient(e.to_string()))?;
    }
    Ok(())
  }

  /// Remove a file's state and chunks, plus their keyword/vector
  /// projections, e.g. after a delete detected by the watcher or a full
  /// scan diff.
  pub async fn remove_file(&self, relative_path: &str) -> Result<(), Error> {
    let removed_ids = self.metadata.delete_file(relative_path.to_string()).await?;
    for id in removed_ids {
      self.keyword.delete(id.clone()).await?;
      self.vector.delete(&id).map_err(|e| Error::Transient(e.to_string()))?;
    }
    Ok(())
  }

  /// Chunk ids persisted without a vector (e.g. the embedder was down when
  /// they were committed). Called once at startup to resume embedding.
  pub async fn reembed_vectorless(&self) -> Result<usize, Error> {
    let ids = self.metadata.list_vectorless_chunk_ids().await?;
    if ids.is_empty() {
      return Ok(0);
    }
    let records = self.metadata.get_many(ids).await?;
    let mut embedded = 0;
    let batch_size = self.embedding_config.batch_size.max(1);
    for batch in records.chunks(batch_size) {
      let texts: Vec<String> = batch.iter().map(|r| r.chunk.embedding_text.clone()).collect();
      let vectors = self.embedder.embed(&texts, Role::Document).await.map_err(amanmcp_core::Error::from)?;
      for (record, vector) in batch.iter().zip(vectors.into_iter()) {
        self
          .vector
          .upsert(&record.chunk.id, &Vector { data: vector })
          .map_err(|e| Error::Transient(e.to_string()))?;
        embedded += 1;
      }
    }
    Ok(embedded)
  }

  /// Apply a single change reported by a file watcher, routing it into the
  /// same chunk/embed/commit pipeline `full_scan` uses. Renamed paths arrive
  /// as the watcher's raw `ChangeKind`; a stat failure on a reported
  /// created/modified path (already deleted again by the time we get to it)
  /// is treated as a deletion rather than an error.
  pub async fn apply_change(&self, change: &FileChange) -> Result<usize, Error> {
    match change.kind {
      ChangeKind::Deleted => {
        let relative = self.relative_path(&change.path)?;
        self.remove_file(&relative).await?;
        Ok(0)
      }
      ChangeKind::Created | ChangeKind::Modified | ChangeKind::Renamed => match self.scanner.scan_file(&change.path, &self.root) {
        Some(scanned) => {
          let mut parser = TreeSitterParser::new();
          self.process_file(&mut parser, &scanned).await
        }
        None => {
          let relative = self.relative_path(&change.path)?;
          self.remove_file(&relative).await?;
          Ok(0)
        }
      },
    }
  }

  fn relative_path(&self, path: &Path) -> Result<String, Error> {
    path
      .strip_prefix(&self.root)
      .map(|p| p.to_string_lossy().replace('\\', "/"))
      .map_err(|e| Error::InputInvalid(format!("{} is not under {}: {}", path.display(), self.root.display(), e)))
  }

  pub fn root(&self) -> &Path {
    &self.root
  }
}
