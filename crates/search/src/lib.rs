pub mod classifier;
pub mod engine;
pub mod expand;
pub mod fusion;

pub use classifier::QueryWeights;
pub use engine::{ComponentScores, KindFilter, SearchEngine, SearchOptions, SearchResponse, SearchResult};
pub use fusion::FusedHit;
