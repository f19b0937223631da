pub mod factory;
pub mod mlx;
pub mod ollama;
pub mod provider;
pub mod resilient;
pub mod static_hash;

pub use factory::build_embedder;
pub use mlx::MlxEmbedder;
pub use ollama::{OllamaEmbedder, OllamaHealthStatus};
pub use provider::{Embedder, EmbeddingError, Role};
pub use resilient::{ResilientEmbedder, RetryConfig, is_retryable_error, thermal_timeout, wrap_resilient, wrap_resilient_arc};
pub use static_hash::{StaticHashEmbedder, hash_embed};
