//! SQL DDL for the shared metadata + keyword database.
//!
//! MetadataStore and KeywordIndex share one SQLite file opened in WAL mode;
//! `keyword.db` coincides with `metadata.db` since both live behind the same
//! engine. Schema changes bump [`CURRENT_SCHEMA_VERSION`]; a store that finds
//! a stored version it doesn't recognize refuses to start rather than
//! guessing at a migration.

/// Current on-disk schema version. Bump whenever `SCHEMA` changes shape in a
/// way that isn't purely additive-and-backward-compatible.
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
  version INTEGER PRIMARY KEY,
  applied_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS files (
  path TEXT PRIMARY KEY,
  mtime INTEGER NOT NULL,
  size INTEGER NOT NULL,
  content_hash_of_file TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
  id TEXT PRIMARY KEY,
  path TEXT NOT NULL,
  content TEXT NOT NULL,
  lang TEXT NOT NULL,
  kind TEXT NOT NULL,
  start_line INTEGER NOT NULL,
  end_line INTEGER NOT NULL,
  symbols TEXT NOT NULL,
  content_hash TEXT NOT NULL,
  embedding_text TEXT NOT NULL,
  file_mtime INTEGER NOT NULL,
  file_size INTEGER NOT NULL,
  indexed_at TEXT NOT NULL,
  embedder_id TEXT,
  embedder_dim INTEGER,
  FOREIGN KEY(path) REFERENCES files(path) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_chunks_path ON chunks(path);
CREATE UNIQUE INDEX IF NOT EXISTS idx_chunks_identity ON chunks(path, start_line, content_hash);

CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
  chunk_id UNINDEXED,
  tokens
);
"#;
