pub mod config;
pub mod error;
pub mod model;

pub use config::{
  ChunkConfig, Config, EmbedderSelection, EmbeddingConfig, IndexConfig, SearchConfig,
  default_embedding_workers, state_dir,
};
pub use error::{Error, Result};
pub use model::{Chunk, ChunkKind, FileState, IndexRecord, Language, LineRange, Vector};
