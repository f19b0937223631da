//! Keyword-side query expansion. The vector side always receives the
//! original query verbatim — expanding it empirically degraded semantic
//! search quality, since the embedding already encodes the neighborhood a
//! synonym table would otherwise add by hand.

use std::collections::HashSet;
use store::tokenize::tokenize;

/// A small, hand-curated table of domain synonyms. Deliberately narrow: a
/// wrong expansion pollutes BM25 with false matches, so only terms with an
/// unambiguous code-search meaning are listed.
const SYNONYMS: &[(&str, &[&str])] = &[
  ("auth", &["authentication", "authorize", "authorization"]),
  ("authn", &["authentication"]),
  ("authz", &["authorization"]),
  ("cfg", &["config", "configuration"]),
  ("config", &["configuration"]),
  ("db", &["database"]),
  ("env", &["environment"]),
  ("err", &["error"]),
  ("init", &["initialize", "initialization"]),
  ("impl", &["implementation"]),
  ("msg", &["message"]),
  ("pkg", &["package"]),
  ("repo", &["repository"]),
  ("req", &["request"]),
  ("resp", &["response"]),
  ("util", &["utility", "utilities"]),
];

/// Tokenize `query` the same way the index does, then append any synonyms
/// for whitelisted terms. Order-preserving and deduplicated.
pub fn expand(query: &str) -> Vec<String> {
  let base = tokenize(query);
  let mut seen: HashSet<String> = base.iter().cloned().collect();
  let mut out = base;
  for token in &out.clone() {
    if let Some((_, synonyms)) = SYNONYMS.iter().find(|(term, _)| *term == token) {
      for syn in *synonyms {
        if seen.insert(syn.to_string()) {
          out.push(syn.to_string());
        }
      }
    }
  }
  out
}
