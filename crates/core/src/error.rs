//! Error kinds shared across every component. Each component wraps its own
//! failures into one of these six kinds rather than leaking backend-specific
//! strings past its boundary (a leaking message is treated as a defect).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  /// Malformed query or bad config value. Fails the single request; server
  /// state is untouched.
  #[error("invalid input: {0}")]
  InputInvalid(String),

  /// Unknown chunk id passed to a lookup such as `get_many`. Callers filter
  /// this out rather than surfacing it.
  #[error("not found: {entity} {id}")]
  NotFound { entity: &'static str, id: String },

  /// Embedder timeout, store busy. Retried with backoff per the embedder's
  /// and indexer's own retry policy before being promoted to
  /// `BackendUnavailable`.
  #[error("transient failure: {0}")]
  Transient(String),

  /// The embedder backend is persistently down. Service degrades to
  /// keyword-only search rather than failing requests.
  #[error("backend unavailable: {0}")]
  BackendUnavailable(String),

  /// Checksum mismatch, schema mismatch, or a torn vector file. Refuses to
  /// start; requires operator intervention. Never occurs mid-request.
  #[error("state corrupt: {0}")]
  StateCorrupt(String),

  /// Out of disk, unrecoverable IO, or any other condition that should shut
  /// the process down cleanly after logging.
  #[error("fatal: {0}")]
  Fatal(String),
}

impl Error {
  /// Whether this error represents a condition worth retrying (as opposed
  /// to one that should surface immediately or degrade the service).
  pub fn is_retryable(&self) -> bool {
    matches!(self, Error::Transient(_))
  }
}

impl From<std::io::Error> for Error {
  fn from(e: std::io::Error) -> Self {
    Error::Fatal(e.to_string())
  }
}

pub type Result<T> = std::result::Result<T, Error>;
