//! Parse-time failures. Query compilation failures are not represented here
//! since they degrade silently to empty results (see `queries::compile_query`);
//! this type exists for grammar-loading and incremental-parse failures that
//! callers may want to distinguish from "language unsupported".

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
  #[error("unsupported language: {0:?}")]
  UnsupportedLanguage(amanmcp_core::Language),

  #[error("tree-sitter failed to parse {path}")]
  ParseFailed { path: String },
}
