//! Per-language tree-sitter query definitions.
//!
//! Each submodule exposes a `queries(grammar) -> LanguageQueries` builder for
//! one language. `load_queries` dispatches on `Language` and degrades to an
//! all-`None` `LanguageQueries` for anything without a dedicated module, so
//! callers never have to special-case "no queries for this language".

use tree_sitter::{Language as TsLanguage, Query};

use crate::parser::LanguageQueries;
use amanmcp_core::Language;

pub mod c;
pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod typescript;

/// Compiles a query string against a grammar. A malformed query degrades the
/// affected extraction (imports/calls/definitions) to empty results rather
/// than failing the whole language.
pub fn compile_query(grammar: &TsLanguage, source: &str) -> Option<Query> {
  match Query::new(grammar, source) {
    Ok(query) => Some(query),
    Err(err) => {
      tracing::warn!(error = %err, "failed to compile tree-sitter query");
      None
    }
  }
}

pub fn load_queries(lang: Language, grammar: &TsLanguage) -> LanguageQueries {
  match lang {
    Language::Rust => rust::queries(grammar),
    Language::Python => python::queries(grammar),
    Language::Go => go::queries(grammar),
    Language::JavaScript | Language::Jsx => javascript::queries(grammar),
    Language::TypeScript | Language::Tsx => typescript::queries(grammar),
    Language::Java => java::queries(grammar),
    Language::C => c::queries(grammar),
    Language::Cpp => cpp::queries(grammar),
    _ => LanguageQueries { imports: None, calls: None, definitions: None },
  }
}
