use amanmcp_core::Language;
use ignore::WalkBuilder;
use rayon::prelude::*;
use sha2::{Digest, Sha256};
use std::collections::hash_map::DefaultHasher;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::{Duration, Instant, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
  #[error("IO error: {0}")]
  Io(#[from] std::io::Error),
  #[error("Walk error: {0}")]
  Walk(#[from] ignore::Error),
}

/// Result of scanning a single file
#[derive(Debug, Clone)]
pub struct ScannedFile {
  pub path: PathBuf,
  pub relative_path: String,
  pub language: Language,
  pub size: u64,
  pub mtime: u64,
  pub checksum: String,
}

/// Result of scanning a directory
#[derive(Debug)]
pub struct ScanResult {
  pub files: Vec<ScannedFile>,
  pub skipped_count: u32,
  pub total_bytes: u64,
  pub scan_duration: Duration,
}

/// Progress callback data
#[derive(Debug, Clone)]
pub struct ScanProgress {
  pub scanned: u32,
  pub path: PathBuf,
}

/// File scanner with gitignore support
#[derive(Clone, Copy)]
pub struct Scanner {
  max_file_size: u64,
  follow_links: bool,
}

impl Default for Scanner {
  fn default() -> Self {
    Self::new()
  }
}

impl Scanner {
  pub fn new() -> Self {
    Self {
      max_file_size: 1024 * 1024, // 1MB
      follow_links: false,
    }
  }

  pub fn with_max_file_size(mut self, size: u64) -> Self {
    self.max_file_size = size;
    self
  }

  /// Scan directory in parallel, respecting .gitignore
  pub fn scan<F>(&self, root: &Path, progress: F) -> ScanResult
  where
    F: Fn(ScanProgress) + Send + Sync,
  {
    let start = Instant::now();
    let scanned = AtomicU32::new(0);
    let skipped = AtomicU32::new(0);
    let total_bytes = AtomicU64::new(0);

    let walker = WalkBuilder::new(root)
      .follow_links(self.follow_links)
      .hidden(true) // Include hidden files
      .git_ignore(true)
      .git_global(true)
      .git_exclude(true)
      .add_custom_ignore_filename(".amanmcpignore")
      .build();

    // Use par_bridge to parallelize without collecting first - better for 100k+ files
    let files: Vec<ScannedFile> = walker
      .filter_map(|e| e.ok())
      .par_bridge()
      .filter_map(|entry| {
        let path = entry.path();

        // Skip directories
        if entry.file_type().is_none_or(|ft| ft.is_dir()) {
          return None;
        }

        // Progress callback every 100 files
        let count = scanned.fetch_add(1, Ordering::Relaxed);
        if count.is_multiple_of(100) {
          progress(ScanProgress {
            scanned: count,
            path: path.to_path_buf(),
          });
        }

        // Get language from extension
        let ext = path.extension()?.to_str()?;
        let language = Language::from_extension(ext);
        if language == Language::Unknown {
          return None;
        }

        // Skip empty or large files
        let metadata = entry.metadata().ok()?;
        if metadata.len() == 0 {
          skipped.fetch_add(1, Ordering::Relaxed);
          return None;
        }
        if metadata.len() > self.max_file_size {
          skipped.fetch_add(1, Ordering::Relaxed);
          return None;
        }

        // Compute quick checksum
        let checksum = quick_checksum(path).ok()?;

        let mtime = metadata.modified().ok()?.duration_since(UNIX_EPOCH).ok()?.as_secs();

        total_bytes.fetch_add(metadata.len(), Ordering::Relaxed);

        Some(ScannedFile {
          path: path.to_path_buf(),
          relative_path: path.strip_prefix(root).ok()?.to_string_lossy().into(),
          language,
          size: metadata.len(),
          mtime,
          checksum,
        })
      })
      .collect();

    ScanResult {
      files,
      skipped_count: skipped.load(Ordering::Relaxed),
      total_bytes: total_bytes.load(Ordering::Relaxed),
      scan_duration: start.elapsed(),
    }
  }

  /// Scan a single file
  pub fn scan_file(&self, path: &Path, root: &Path) -> Option<ScannedFile> {
    let ext = path.extension()?.to_str()?;
    let language = Language::from_extension(ext);
    if language == Language::Unknown {
      return None;
    }

    let metadata = path.metadata().ok()?;
    // Skip empty files
    if metadata.len() == 0 {
      return None;
    }
    if metadata.len() > self.max_file_size {
      return None;
    }

    let checksum = quick_checksum(path).ok()?;
    let mtime = metadata.modified().ok()?.duration_since(UNIX_EPOCH).ok()?.as_secs();

    Some(ScannedFile {
      path: path.to_path_buf(),
      relative_path: path.strip_prefix(root).ok()?.to_string_lossy().into(),
      language,
      size: metadata.len(),
      mtime,
      checksum,
    })
  }
}

/// Full sha256 over file content, for `FileState.content_hash_of_file`.
/// Only called for files the quick checksum flagged as changed, since it
/// reads the whole file rather than the first 4KB.
pub fn full_content_hash(path: &Path) -> Result<String, std::io::Error> {
  let mut file = File::open(path)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 65536];
  loop {
    let n = file.read(&mut buffer)?;
    if n == 0 {
      break;
    }
    hasher.update(&buffer[..n]);
  }
  Ok(hex::encode(hasher.finalize()))
}

/// Quick checksum using first 4KB + file size
fn quick_checksum(path: &Path) -> Result<String, std::io::Error> {
  let mut file = File::open(path)?;
  let mut buffer = [0u8; 4096];
  let n = file.read(&mut buffer)?;

  let mut hasher = DefaultHasher::new();
  buffer[..n].hash(&mut hasher);
  file.metadata()?.len().hash(&mut hasher);

  Ok(format!("{:016x}", hasher.finish()))
}
