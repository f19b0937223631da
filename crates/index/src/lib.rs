pub mod chunker;
pub mod debounce;
pub mod gitignore;
pub mod indexer;
pub mod parser;
pub mod scanner;
pub mod watcher;

pub use chunker::Chunker;
pub use debounce::{BatchProcessor, DebounceConfig, DebouncedWatcher};
pub use gitignore::{GitignoreState, compute_gitignore_hash, should_ignore};
pub use indexer::{IndexStats, Indexer};
pub use parser::{detect_language, is_indexable, supported_extensions};
pub use scanner::{ScanError, ScanProgress, ScanResult, ScannedFile, Scanner, full_content_hash};
pub use watcher::{ChangeKind, FileChange, FileWatcher, WatchError};
