pub mod connection;
pub mod keyword;
pub mod metadata;
pub mod schema;
pub mod tokenize;

pub use connection::StoreHandle;
pub use keyword::{KeywordHit, KeywordIndex, KeywordStats};
pub use metadata::{MetadataStats, MetadataStore};
pub use schema::CURRENT_SCHEMA_VERSION;
