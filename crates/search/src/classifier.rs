//! Assigns BM25/semantic weights to a raw query string before dispatch.

/// Relative weight given to each retrieval path before fusion. Always sums
/// to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryWeights {
  pub bm25: f64,
  pub semantic: f64,
}

impl QueryWeights {
  pub const fn new(bm25: f64, semantic: f64) -> Self {
    Self { bm25, semantic }
  }
}

const IDENTIFIER_SYNTAX: QueryWeights = QueryWeights::new(0.8, 0.2);
const IDENTIFIER_SHAPE: QueryWeights = QueryWeights::new(0.7, 0.3);
const NATURAL_LANGUAGE: QueryWeights = QueryWeights::new(0.25, 0.75);

/// Classify a raw query into BM25/semantic weights, falling back to
/// `default_weights` (the configured default, nominally `(0.35, 0.65)`) when
/// none of the recognized shapes match.
pub fn classify(query: &str, default_weights: QueryWeights) -> QueryWeights {
  let trimmed = query.trim();
  if has_quoted_substring(trimmed) || is_error_code(trimmed) || has_explicit_symbol_syntax(trimmed) {
    return IDENTIFIER_SYNTAX;
  }
  if has_identifier_shape(trimmed) {
    return IDENTIFIER_SHAPE;
  }
  if is_natural_language(trimmed) {
    return NATURAL_LANGUAGE;
  }
  default_weights
}

fn has_quoted_substring(query: &str) -> bool {
  (query.contains('"') && query.matches('"').count() >= 2) || (query.starts_with('\'') && query.ends_with('\'') && query.len() > 1)
}

/// All-caps error-code pattern, e.g. `ERR_NOT_FOUND`, `E1234`.
fn is_error_code(query: &str) -> bool {
  query
    .split_whitespace()
    .any(|word| word.len() >= 3 && word.chars().all(|c| c.is_ascii_uppercase() || c == '_' || c.is_ascii_digit()) && word.chars().any(|c| c.is_ascii_uppercase()))
}

/// `foo::bar`, `foo.bar(`, `foo->bar` — explicit scoping/call syntax a
/// natural-language query would never contain.
fn has_explicit_symbol_syntax(query: &str) -> bool {
  query.contains("::") || query.contains("->") || (query.contains('(') && query.contains(')')) || query.contains('.') && !query.contains(' ')
}

fn has_identifier_shape(query: &str) -> bool {
  query.split_whitespace().any(is_identifier_like)
}

fn is_identifier_like(word: &str) -> bool {
  let has_underscore = word.contains('_');
  let has_case_mix = word.chars().any(|c| c.is_uppercase()) && word.chars().any(|c| c.is_lowercase());
  (has_underscore || has_case_mix) && word.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_natural_language(query: &str) -> bool {
  let words: Vec<&str> = query.split_whitespace().collect();
  words.len() > 4 && words.iter().all(|w| w.chars().all(|c| c.is_alphabetic() || c == '\'') && !is_identifier_like(w))
}

#[cfg(test)]
mod tests {
  use super::*;

  const DEFAULT: QueryWeights = QueryWeights::new(0.35, 0.65);

  #[test]
  fn quoted_query_favors_keyword() {
    assert_eq!(classify("\"exact phrase\"", DEFAULT), IDENTIFIER_SYNTAX);
  }

  #[test]
  fn error_code_favors_keyword() {
    assert_eq!(classify("ERR_NOT_FOUND", DEFAULT), IDENTIFIER_SYNTAX);
  }

  #[test]
  fn explicit_symbol_syntax_favors_keyword() {
    assert_eq!(classify("auth::ValidateToken", DEFAULT), IDENTIFIER_SYNTAX);
  }

  #[test]
  fn camel_case_identifier_shape() {
    assert_eq!(classify("ValidateToken", DEFAULT), IDENTIFIER_SHAPE);
  }

  #[test]
  fn snake_case_identifier_shape() {
    assert_eq!(classify("validate_token", DEFAULT), IDENTIFIER_SHAPE);
  }

  #[test]
  fn natural_language_favors_semantic() {
    assert_eq!(classify("how does authentication work here", DEFAULT), NATURAL_LANGUAGE);
  }

  #[test]
  fn short_plain_query_uses_default() {
    assert_eq!(classify("login handler", DEFAULT), DEFAULT);
  }
}
