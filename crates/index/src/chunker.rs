//! Splits file content into `Chunk`s.
//!
//! Languages with tree-sitter grammars get AST-aware chunking: one chunk
//! per top-level definition (the parser's definitions query yields one span
//! per method already), plus one extra "shell" chunk per class/struct
//! holding its signature and fields with nested method bodies cut out.
//! Everything else falls back to heading-chain chunking for Markdown or a
//! fixed sliding window of lines.

use amanmcp_core::{Chunk, ChunkConfig, ChunkKind, Language, LineRange};
use parser::{Definition, DefinitionKind, TreeSitterParser};

/// A definition too small on its own accumulates with its neighbors up to
/// `target_max_chars` before being coalesced back into separate chunks;
/// a definition larger than `split_threshold_chars` is carved into
/// fallback-window pieces instead of kept as one oversized chunk.
#[derive(Clone)]
pub struct Chunker {
  config: ChunkConfig,
}

impl Default for Chunker {
  fn default() -> Self {
    Self::new(ChunkConfig::default())
  }
}

impl Chunker {
  pub fn new(config: ChunkConfig) -> Self {
    Self { config }
  }

  /// Returns `None` for files that should not be indexed at all: over the
  /// size cap, or binary (a null byte within the first 8KiB).
  pub fn chunk_file(&self, parser: &mut TreeSitterParser, path: &str, content: &str, lang: Language) -> Option<Vec<Chunk>> {
    if content.len() as u64 > self.config.max_file_size_bytes {
      return None;
    }
    if is_binary(content) {
      return None;
    }

    let chunks = if lang == Language::Markdown {
      self.chunk_markdown(path, content)
    } else if lang.has_ast_support() {
      self.chunk_ast(parser, path, content, lang)
    } else {
      self.chunk_fallback_window(path, content, lang, ChunkKind::Code)
    };

    Some(chunks)
  }

  fn chunk_ast(&self, parser: &mut TreeSitterParser, path: &str, content: &str, lang: Language) -> Vec<Chunk> {
    let definitions = parser.extract_definitions(content, lang);
    if definitions.is_empty() {
      return self.chunk_fallback_window(path, content, lang, ChunkKind::Code);
    }

    let lines: Vec<&str> = content.lines().collect();
    let header = enclosing_header(parser, content, lang);

    let raw_chunks: Vec<RawSpan> = definitions
      .iter()
      .filter(|def| !matches!(def.kind, DefinitionKind::Class | DefinitionKind::Struct))
      .filter_map(|def| span_for_definition(def, &lines))
      .collect();

    let coalesced = self.coalesce_small_spans(raw_chunks, &lines);

    let mut chunks: Vec<Chunk> = coalesced
      .into_iter()
      .flat_map(|span| self.split_if_oversized(&span, &lines))
      .map(|span| {
        let mut chunk = self.build_chunk(path, &span, lang, ChunkKind::Code);
        materialize(&mut chunk, &lines, header.as_deref());
        chunk
      })
      .collect();

    let shells = definitions
      .iter()
      .filter(|def| matches!(def.kind, DefinitionKind::Class | DefinitionKind::Struct))
      .filter_map(|class_def| {
        let nested: Vec<&Definition> = definitions
          .iter()
          .filter(|d| {
            d.kind == DefinitionKind::Method && d.start_line >= class_def.start_line && d.end_line <= class_def.end_line
          })
          .collect();
        class_shell_chunk(path, &lines, class_def, &nested, lang, header.as_deref())
      });
    chunks.extend(shells);

    chunks
  }

  /// Merges adjacent same-kind spans under `coalesce_threshold_chars` so a
  /// file full of tiny one-line definitions doesn't produce one chunk per
  /// line; once merged content crosses `target_max_chars` it stops pulling
  /// in more neighbors.
  fn coalesce_small_spans(&self, spans: Vec<RawSpan>, lines: &[&str]) -> Vec<RawSpan> {
    let mut out: Vec<RawSpan> = Vec::new();
    for span in spans {
      let char_len = span_char_len(&span, lines);
      if char_len < self.config.coalesce_threshold_chars
        && let Some(last) = out.last_mut()
        && last.end + 1 >= span.start
        && span_char_len(last, lines) < self.config.target_max_chars
      {
        last.end = span.end;
        last.symbols.extend(span.symbols);
        continue;
      }
      out.push(span);
    }
    out
  }

  /// A span over `split_threshold_chars` is cut into fallback-window
  /// pieces rather than kept whole; its symbols are attached to the first
  /// piece only; everything under threshold passes through unchanged.
  fn split_if_oversized(&self, span: &RawSpan, lines: &[&str]) -> Vec<RawSpan> {
    let char_len = span_char_len(span, lines);
    if char_len <= self.config.split_threshold_chars {
      return vec![span.clone()];
    }

    let window = self.config.fallback_window_lines;
    let overlap = self.config.fallback_overlap_lines;
    let mut pieces = Vec::new();
    let mut start = span.start;
    let mut first = true;
    while start <= span.end {
      let end = (start + window - 1).min(span.end);
      pieces.push(RawSpan {
        start,
        end,
        symbols: if first { span.symbols.clone() } else { Vec::new() },
      });
      first = false;
      if end == span.end {
        break;
      }
      start = end.saturating_sub(overlap).max(start + 1);
    }
    pieces
  }

  fn chunk_fallback_window(&self, path: &str, content: &str, lang: Language, kind: ChunkKind) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
      return Vec::new();
    }
    let window = self.config.fallback_window_lines;
    let overlap = self.config.fallback_overlap_lines;

    let mut chunks = Vec::new();
    let mut start = 0usize;
    loop {
      let end = (start + window - 1).min(lines.len() - 1);
      let span = RawSpan { start: start as u32 + 1, end: end as u32 + 1, symbols: Vec::new() };
      chunks.push(self.build_chunk(path, &span, lang, kind));
      if end == lines.len() - 1 {
        break;
      }
      start = end.saturating_sub(overlap).max(start + 1);
    }
    chunks
  }

  /// Chunks Markdown by heading chains: each H1/H2 section (everything up
  /// to the next heading at the same or shallower level) becomes a chunk,
  /// with `embedding_text` prefixed by the heading chain leading to it.
  fn chunk_markdown(&self, path: &str, content: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
      return Vec::new();
    }

    let mut boundaries: Vec<(usize, u8, String)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
      if let Some(level) = heading_level(line) {
        boundaries.push((i, level, line.trim_start_matches('#').trim().to_string()));
      }
    }

    if boundaries.is_empty() {
      return self.chunk_fallback_window(path, content, Language::Markdown, ChunkKind::Doc);
    }

    let mut chunks = Vec::new();
    let mut heading_stack: Vec<(u8, String)> = Vec::new();

    for (idx, &(start_idx, level, ref title)) in boundaries.iter().enumerate() {
      let end_idx = boundaries.get(idx + 1).map(|(i, _, _)| *i - 1).unwrap_or(lines.len() - 1);

      heading_stack.retain(|(l, _)| *l < level);
      heading_stack.push((level, title.clone()));

      let span = RawSpan { start: start_idx as u32 + 1, end: end_idx as u32 + 1, symbols: vec![title.clone()] };
      let chain = heading_stack.iter().map(|(_, t)| t.as_str()).collect::<Vec<_>>().join(" > ");

      let header = if chain.is_empty() { None } else { Some(chain.as_str()) };
      for piece in self.split_if_oversized(&span, &lines) {
        let mut chunk = self.build_chunk(path, &piece, Language::Markdown, ChunkKind::Doc);
        materialize(&mut chunk, &lines, header);
        chunks.push(chunk);
      }
    }
    chunks
  }

  fn build_chunk(&self, path: &str, span: &RawSpan, lang: Language, kind: ChunkKind) -> Chunk {
    Chunk::new(path, String::new(), lang, kind, LineRange::new(span.start, span.end), span.symbols.clone(), None)
  }
}

#[derive(Debug, Clone)]
struct RawSpan {
  start: u32,
  end: u32,
  symbols: Vec<String>,
}

fn span_for_definition(def: &Definition, _lines: &[&str]) -> Option<RawSpan> {
  if def.end_line < def.start_line {
    return None;
  }
  Some(RawSpan { start: def.start_line, end: def.end_line, symbols: vec![def.name.clone()] })
}

/// Short header of enclosing declarations (currently just imports) for a
/// whole file, prepended to every AST code chunk's `embedding_text`.
fn enclosing_header(parser: &mut TreeSitterParser, content: &str, lang: Language) -> Option<String> {
  let imports = parser.extract_imports(content, lang);
  if imports.is_empty() { None } else { Some(imports.join("\n")) }
}

/// Builds the class/struct "shell": its own span with any nested method
/// spans cut out, leaving signature and fields. Degrades to the whole span
/// when a language keeps methods outside the type's own node (Rust `impl`
/// blocks, Go receiver functions) since no nested method then falls inside
/// `class_def`'s range.
fn class_shell_chunk(
  path: &str,
  lines: &[&str],
  class_def: &Definition,
  nested: &[&Definition],
  lang: Language,
  header: Option<&str>,
) -> Option<Chunk> {
  if class_def.end_line < class_def.start_line || class_def.start_line == 0 {
    return None;
  }

  let mut excluded: Vec<(u32, u32)> = nested.iter().map(|d| (d.start_line, d.end_line)).collect();
  excluded.sort_by_key(|&(start, _)| start);

  let mut body_lines: Vec<&str> = Vec::new();
  let mut cursor = class_def.start_line;
  for (start, end) in excluded {
    if start > cursor {
      let from = (cursor.saturating_sub(1)) as usize;
      let to = ((start - 1) as usize).min(lines.len());
      if from < to {
        body_lines.extend(&lines[from..to]);
      }
    }
    cursor = cursor.max(end + 1);
  }
  if cursor <= class_def.end_line {
    let from = (cursor.saturating_sub(1)) as usize;
    let to = (class_def.end_line as usize).min(lines.len());
    if from < to {
      body_lines.extend(&lines[from..to]);
    }
  }

  if body_lines.is_empty() {
    return None;
  }

  let content = body_lines.join("\n");
  let embedding_text = match header {
    Some(h) if !h.is_empty() => format!("{h}\n\n{content}"),
    _ => content.clone(),
  };
  let line_range = LineRange::new(class_def.start_line, class_def.end_line);
  Some(Chunk::new(
    path,
    content,
    lang,
    ChunkKind::Code,
    line_range,
    vec![class_def.name.clone()],
    Some(embedding_text),
  ))
}

fn span_char_len(span: &RawSpan, lines: &[&str]) -> usize {
  let start = (span.start.saturating_sub(1)) as usize;
  let end = (span.end as usize).min(lines.len());
  if start >= end {
    return 0;
  }
  lines[start..end].iter().map(|l| l.len() + 1).sum()
}

fn heading_level(line: &str) -> Option<u8> {
  let trimmed = line.trim_start();
  if !trimmed.starts_with('#') {
    return None;
  }
  let level = trimmed.chars().take_while(|c| *c == '#').count();
  if level == 0 || level > 2 {
    return None;
  }
  let rest = &trimmed[level..];
  if rest.starts_with(' ') || rest.is_empty() { Some(level as u8) } else { None }
}

/// Mirrors common binary-detection heuristics: a null byte anywhere in the
/// first 8KiB marks the file as non-text.
fn is_binary(content: &str) -> bool {
  content.as_bytes().iter().take(8192).any(|&b| b == 0)
}

/// Builds a chunk's real `content`/`content_hash`/`embedding_text` from the
/// original source, since `build_chunk` above only carries the span. A
/// no-op if `content` is already populated (class shells and any chunk a
/// caller built directly already carry real content).
///
/// `header` is prepended to `embedding_text` only, never to `content`:
/// the heading chain for Markdown, or enclosing imports for AST chunks.
pub fn materialize(chunk: &mut Chunk, source_lines: &[&str], header: Option<&str>) {
  if !chunk.content.is_empty() {
    return;
  }
  let start = (chunk.lines.start.saturating_sub(1)) as usize;
  let end = (chunk.lines.end as usize).min(source_lines.len());
  let content = if start < end { source_lines[start..end].join("\n") } else { String::new() };
  chunk.id = Chunk::compute_id(&content, &chunk.path, chunk.lines.start);
  chunk.content_hash = Chunk::compute_content_hash(&content);
  chunk.embedding_text = match header {
    Some(h) if !h.is_empty() => format!("{h}\n\n{content}"),
    _ => content.clone(),
  };
  chunk.content = content;
}

#[cfg(test)]
mod tests {
  use super::*;

  fn run(content: &str, path: &str, lang: Language) -> Vec<Chunk> {
    let mut parser = TreeSitterParser::new();
    let chunker = Chunker::default();
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = chunker.chunk_file(&mut parser, path, content, lang).unwrap_or_default();
    for c in &mut chunks {
      materialize(c, &lines, None);
    }
    chunks
  }

  #[test]
  fn rust_functions_become_separate_chunks() {
    let source = "fn alpha() {\n    1\n}\n\nfn beta() {\n    2\n}\n";
    let chunks = run(source, "lib.rs", Language::Rust);
    assert!(chunks.len() >= 1);
    let all_symbols: Vec<&String> = chunks.iter().flat_map(|c| c.symbols.iter()).collect();
    assert!(all_symbols.iter().any(|s| s.as_str() == "alpha") || chunks[0].content.contains("alpha"));
  }

  #[test]
  fn binary_content_is_rejected() {
    let mut parser = TreeSitterParser::new();
    let chunker = Chunker::default();
    let content = "fn x() {}\0\0binary".to_string();
    assert!(chunker.chunk_file(&mut parser, "x.rs", &content, Language::Rust).is_none());
  }

  #[test]
  fn oversized_file_is_rejected() {
    let mut parser = TreeSitterParser::new();
    let config = ChunkConfig { max_file_size_bytes: 10, ..ChunkConfig::default() };
    let chunker = Chunker::new(config);
    assert!(chunker.chunk_file(&mut parser, "x.rs", "fn main() {}", Language::Rust).is_none());
  }

  #[test]
  fn markdown_splits_on_headings() {
    let source = "# Title\n\nIntro text.\n\n## Section A\n\nBody A.\n\n## Section B\n\nBody B.\n";
    let chunks = run(source, "doc.md", Language::Markdown);
    assert!(chunks.len() >= 2);
    assert!(chunks.iter().any(|c| c.embedding_text.contains("Section A")));
  }

  #[test]
  fn fallback_window_used_for_unsupported_language() {
    let source = (0..120).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let chunks = run(&source, "data.yaml", Language::Yaml);
    assert!(chunks.len() > 1);
  }

  #[test]
  fn python_class_gets_a_shell_chunk_without_method_bodies() {
    let source = "class Greeter:\n    name: str\n\n    def hello(self):\n        return f\"hi {self.name}\"\n\n    def bye(self):\n        return \"bye\"\n";
    let chunks = run(source, "greeter.py", Language::Python);

    let shell = chunks
      .iter()
      .find(|c| c.symbols.iter().any(|s| s == "Greeter") && !c.content.contains("return"))
      .expect("expected a class shell chunk with no method bodies");
    assert!(shell.content.contains("name: str"));
    assert!(!shell.content.contains("hi {self.name}"));
    assert!(!shell.content.contains("bye"));

    assert!(chunks.iter().any(|c| c.symbols.iter().any(|s| s == "hello")));
    assert!(chunks.iter().any(|c| c.symbols.iter().any(|s| s == "bye")));
  }

  #[test]
  fn ast_chunks_carry_an_import_header_in_embedding_text() {
    let source = "use std::fmt;\n\nfn alpha() {\n    1\n}\n";
    let chunks = run(source, "lib.rs", Language::Rust);
    assert!(chunks.iter().any(|c| c.embedding_text.contains("std::fmt") && c.embedding_text.contains("alpha")));
    assert!(chunks.iter().all(|c| !c.content.contains("std::fmt")));
  }

  #[test]
  fn fallback_windows_overlap() {
    let source = (0..120).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
    let chunker = Chunker::default();
    let chunks = chunker.chunk_fallback_window("x.yaml", &source, Language::Yaml, ChunkKind::Code);
    assert!(chunks.len() >= 2);
    assert!(chunks[1].lines.start < chunks[0].lines.end);
  }
}
