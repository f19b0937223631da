//! The canonical data model shared by every component: Chunk, IndexRecord,
//! FileState, and the Vector type. MetadataStore persists IndexRecord and
//! FileState; KeywordIndex and VectorIndex hold only derived projections
//! keyed by Chunk::id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Source language tag. Mirrors the short tags used on the wire (`go`, `ts`,
/// `py`, `md`, `unknown`, …) while keeping a typed enum internally so the
/// chunker and parser crate can dispatch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
  Go,
  Rust,
  Python,
  TypeScript,
  Tsx,
  JavaScript,
  Jsx,
  Java,
  C,
  Cpp,
  Ruby,
  Php,
  CSharp,
  Kotlin,
  Scala,
  Bash,
  Lua,
  Zig,
  Markdown,
  Json,
  Yaml,
  Toml,
  Html,
  Css,
  Unknown,
}

impl Language {
  /// Map a file extension (without the leading dot) to a language.
  pub fn from_extension(ext: &str) -> Self {
    match ext.to_lowercase().as_str() {
      "go" => Language::Go,
      "rs" => Language::Rust,
      "py" | "pyi" | "pyw" => Language::Python,
      "ts" | "mts" | "cts" => Language::TypeScript,
      "tsx" => Language::Tsx,
      "js" | "mjs" | "cjs" => Language::JavaScript,
      "jsx" => Language::Jsx,
      "java" => Language::Java,
      "c" | "h" => Language::C,
      "cpp" | "cc" | "cxx" | "hpp" | "hxx" => Language::Cpp,
      "rb" | "rake" => Language::Ruby,
      "php" => Language::Php,
      "cs" => Language::CSharp,
      "kt" | "kts" => Language::Kotlin,
      "scala" | "sc" => Language::Scala,
      "sh" | "bash" | "zsh" => Language::Bash,
      "lua" => Language::Lua,
      "zig" => Language::Zig,
      "md" | "markdown" => Language::Markdown,
      "json" | "jsonc" => Language::Json,
      "yaml" | "yml" => Language::Yaml,
      "toml" => Language::Toml,
      "html" | "htm" => Language::Html,
      "css" | "scss" | "sass" => Language::Css,
      _ => Language::Unknown,
    }
  }

  /// The short wire/on-disk tag used in `Chunk.lang` (`go`, `ts`, `py`, …).
  pub fn tag(&self) -> &'static str {
    match self {
      Language::Go => "go",
      Language::Rust => "rs",
      Language::Python => "py",
      Language::TypeScript => "ts",
      Language::Tsx => "tsx",
      Language::JavaScript => "js",
      Language::Jsx => "jsx",
      Language::Java => "java",
      Language::C => "c",
      Language::Cpp => "cpp",
      Language::Ruby => "rb",
      Language::Php => "php",
      Language::CSharp => "cs",
      Language::Kotlin => "kt",
      Language::Scala => "scala",
      Language::Bash => "sh",
      Language::Lua => "lua",
      Language::Zig => "zig",
      Language::Markdown => "md",
      Language::Json => "json",
      Language::Yaml => "yaml",
      Language::Toml => "toml",
      Language::Html => "html",
      Language::Css => "css",
      Language::Unknown => "unknown",
    }
  }

  /// Whether this language has an AST-aware chunker registered in `parser`.
  pub fn has_ast_support(&self) -> bool {
    matches!(
      self,
      Language::Go
        | Language::Rust
        | Language::Python
        | Language::TypeScript
        | Language::Tsx
        | Language::JavaScript
        | Language::Jsx
        | Language::Java
        | Language::C
        | Language::Cpp
    )
  }
}

/// What a chunk represents, independent of its source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
  Code,
  Doc,
  Comment,
}

/// An inclusive, 1-based line range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
  pub start: u32,
  pub end: u32,
}

impl LineRange {
  pub fn new(start: u32, end: u32) -> Self {
    debug_assert!(start <= end, "LineRange.start must be <= end");
    Self { start, end }
  }
}

/// The atomic unit of indexed content, shared by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
  /// `sha256(content || path || lines.start)`, hex-encoded.
  pub id: String,
  /// Repo-relative path, forward-slash normalized.
  pub path: String,
  /// Raw text of the chunk; never modified after creation.
  pub content: String,
  pub lang: Language,
  pub kind: ChunkKind,
  pub lines: LineRange,
  /// Ordered, declaration-order identifiers extracted from the AST node.
  pub symbols: Vec<String>,
  /// sha256 of `content` alone; used for dedup and change detection.
  pub content_hash: String,
  /// The text actually sent to the embedder. May carry a contextual header
  /// (enclosing declarations, heading chain) that `content` does not.
  pub embedding_text: String,
}

impl Chunk {
  /// `sha256(content || path || lines.start)`: collision-free across
  /// reindexes of identical text at the same location.
  pub fn compute_id(content: &str, path: &str, start_line: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(path.as_bytes());
    hasher.update(start_line.to_string().as_bytes());
    hex::encode(hasher.finalize())
  }

  /// sha256 of `content` alone, hex-encoded.
  pub fn compute_content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Build a Chunk, deriving `id` and `content_hash` from its fields.
  /// `embedding_text` defaults to `content` when no header is supplied.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    path: impl Into<String>,
    content: impl Into<String>,
    lang: Language,
    kind: ChunkKind,
    lines: LineRange,
    symbols: Vec<String>,
    embedding_text: Option<String>,
  ) -> Self {
    let path = path.into();
    let content = content.into();
    let id = Self::compute_id(&content, &path, lines.start);
    let content_hash = Self::compute_content_hash(&content);
    let embedding_text = embedding_text.unwrap_or_else(|| content.clone());
    Self {
      id,
      path,
      content,
      lang,
      kind,
      lines,
      symbols,
      content_hash,
      embedding_text,
    }
  }
}

/// Chunk plus the provenance MetadataStore needs to drive incremental
/// reindex and dimension-contract checks. This is the ground truth record;
/// KeywordIndex and VectorIndex hold only projections derived from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexRecord {
  pub chunk: Chunk,
  pub file_mtime: u64,
  pub file_size: u64,
  pub indexed_at: DateTime<Utc>,
  /// Backend+model identifier of the embedder that produced this record's
  /// vector, or `None` if the chunk is currently vector-less.
  pub embedder_id: Option<String>,
  pub embedder_dim: Option<usize>,
}

/// Per-file bookkeeping that drives change detection during incremental
/// reindex. Not a checkpoint mechanism on its own — MetadataStore as a
/// whole is the resumption checkpoint (see the Indexer component).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileState {
  pub path: String,
  pub mtime: u64,
  pub size: u64,
  pub content_hash_of_file: String,
  pub chunk_ids: Vec<String>,
}

impl FileState {
  /// Whether a rescanned file can be skipped entirely: its mtime and size
  /// are unchanged from the stored state.
  pub fn unchanged_by_stat(&self, mtime: u64, size: u64) -> bool {
    self.mtime == mtime && self.size == size
  }
}

/// A fixed-length, L2-normalized embedding, associated with exactly one
/// chunk id. VectorIndex implementations may store quantized forms
/// internally but must return unit-length float32 on query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
  pub data: Vec<f32>,
}

impl Vector {
  pub fn dim(&self) -> usize {
    self.data.len()
  }

  pub fn norm(&self) -> f32 {
    self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
  }

  /// Normalize in place; no-op on a zero vector (avoids division by zero).
  pub fn normalize(&mut self) {
    let norm = self.norm();
    if norm > 0.0 {
      for x in &mut self.data {
        *x /= norm;
      }
    }
  }

  pub fn is_unit_length(&self) -> bool {
    let n = self.norm();
    (0.999..=1.001).contains(&n)
  }

  pub fn dot(&self, other: &Vector) -> f32 {
    self.data.iter().zip(other.data.iter()).map(|(a, b)| a * b).sum()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chunk_id_matches_formula() {
    let content = "fn main() {}";
    let path = "src/main.rs";
    let start_line = 3u32;
    let expected = Chunk::compute_id(content, path, start_line);

    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(path.as_bytes());
    hasher.update(start_line.to_string().as_bytes());
    let manual = hex::encode(hasher.finalize());

    assert_eq!(expected, manual);
  }

  #[test]
  fn chunk_new_defaults_embedding_text_to_content() {
    let c = Chunk::new(
      "a.rs",
      "fn f() {}",
      Language::Rust,
      ChunkKind::Code,
      LineRange::new(1, 1),
      vec!["f".to_string()],
      None,
    );
    assert_eq!(c.embedding_text, c.content);
    assert_eq!(c.id, Chunk::compute_id("fn f() {}", "a.rs", 1));
  }

  #[test]
  fn chunk_new_preserves_separate_embedding_text() {
    let c = Chunk::new(
      "a.rs",
      "fn f() {}",
      Language::Rust,
      ChunkKind::Code,
      LineRange::new(1, 1),
      vec![],
      Some("mod a;\nfn f() {}".to_string()),
    );
    assert_ne!(c.embedding_text, c.content);
    // id is derived from content, not embedding_text
    assert_eq!(c.id, Chunk::compute_id("fn f() {}", "a.rs", 1));
  }

  #[test]
  fn vector_normalize_produces_unit_length() {
    let mut v = Vector { data: vec![3.0, 4.0] };
    v.normalize();
    assert!(v.is_unit_length(), "norm was {}", v.norm());
  }

  #[test]
  fn vector_normalize_zero_is_noop() {
    let mut v = Vector { data: vec![0.0, 0.0] };
    v.normalize();
    assert_eq!(v.data, vec![0.0, 0.0]);
  }

  #[test]
  fn file_state_unchanged_by_stat() {
    let fs = FileState {
      path: "a.rs".into(),
      mtime: 100,
      size: 10,
      content_hash_of_file: "abc".into(),
      chunk_ids: vec![],
    };
    assert!(fs.unchanged_by_stat(100, 10));
    assert!(!fs.unchanged_by_stat(101, 10));
  }

  #[test]
  fn language_from_extension_and_tag_round_trip() {
    assert_eq!(Language::from_extension("rs"), Language::Rust);
    assert_eq!(Language::Rust.tag(), "rs");
    assert_eq!(Language::from_extension("weird"), Language::Unknown);
    assert!(Language::Rust.has_ast_support());
    assert!(!Language::Markdown.has_ast_support());
  }
}
