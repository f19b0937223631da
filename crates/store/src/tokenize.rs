//! Identifier-aware tokenization shared by indexing and query expansion.
//!
//! Splits on non-identifier boundaries, then further splits each resulting
//! word on camelCase/PascalCase/snake_case sub-token boundaries. Both the
//! original word and its sub-tokens are kept (lowercased) so a query for
//! either `getUserName` or `user` can match the same chunk.

/// Tokenize arbitrary text into a deduplicated, order-preserving list of
/// lowercase tokens: original words plus their camelCase/snake_case parts.
pub fn tokenize(text: &str) -> Vec<String> {
  let mut out = Vec::new();
  let mut seen = std::collections::HashSet::new();
  let mut push = |tok: String| {
    if tok.is_empty() {
      return;
    }
    if seen.insert(tok.clone()) {
      out.push(tok);
    }
  };

  for word in split_non_identifier(text) {
    let lower = word.to_lowercase();
    push(lower);
    for part in split_sub_tokens(&word) {
      push(part.to_lowercase());
    }
  }
  out
}

/// Split on any boundary that isn't alphanumeric or underscore.
fn split_non_identifier(text: &str) -> Vec<String> {
  text
    .split(|c: char| !(c.is_alphanumeric() || c == '_'))
    .filter(|s| !s.is_empty())
    .map(|s| s.trim_matches('_').to_string())
    .filter(|s| !s.is_empty())
    .collect()
}

/// Split a single word into camelCase/PascalCase/snake_case sub-tokens.
fn split_sub_tokens(word: &str) -> Vec<String> {
  let underscore_parts: Vec<&str> = word.split('_').filter(|s| !s.is_empty()).collect();
  if underscore_parts.len() > 1 {
    return underscore_parts.iter().flat_map(|p| split_camel(p)).collect();
  }
  split_camel(word)
}

/// Split a single underscore-free word on camelCase/PascalCase boundaries,
/// keeping acronym runs together (`HTTPServer` -> `HTTP`, `Server`).
fn split_camel(word: &str) -> Vec<String> {
  let chars: Vec<char> = word.chars().collect();
  if chars.len() < 2 {
    return vec![word.to_string()];
  }
  let mut parts = Vec::new();
  let mut current = String::new();
  for i in 0..chars.len() {
    let c = chars[i];
    let boundary = i > 0
      && ((c.is_uppercase() && chars[i - 1].is_lowercase())
        || (c.is_uppercase()
          && i + 1 < chars.len()
          && chars[i + 1].is_lowercase()
          && chars[i - 1].is_uppercase())
        || (c.is_numeric() && !chars[i - 1].is_numeric())
        || (!c.is_numeric() && chars[i - 1].is_numeric()));
    if boundary && !current.is_empty() {
      parts.push(std::mem::take(&mut current));
    }
    current.push(c);
  }
  if !current.is_empty() {
    parts.push(current);
  }
  if parts.len() <= 1 { vec![word.to_string()] } else { parts }
}
