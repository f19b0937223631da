//! Shared SQLite connection for MetadataStore and KeywordIndex.
//!
//! `rusqlite::Connection` is neither `Send` nor `Sync` across await points in
//! a useful way, so every operation is dispatched through `spawn_blocking`
//! while holding a `Mutex`. This serializes writers on our side even though
//! WAL mode would otherwise let the OS-level file support concurrent
//! readers; see DESIGN.md for why that tradeoff is acceptable here.

use amanmcp_core::Error;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::spawn_blocking;
use tracing::{info, warn};

use crate::schema::{CURRENT_SCHEMA_VERSION, SCHEMA};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone)]
pub struct StoreHandle {
  conn: Arc<Mutex<Connection>>,
  path: PathBuf,
}

impl StoreHandle {
  /// Open (creating if absent) the database at `path`, apply schema DDL, and
  /// verify the stored schema version. Refuses to start on a version
  /// mismatch rather than attempting an implicit migration.
  pub fn open(path: &Path) -> Result<Self> {
    let conn = Connection::open(path).map_err(|e| Error::Fatal(format!("open {}: {e}", path.display())))?;
    conn
      .execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
      .map_err(|e| Error::Fatal(format!("pragma setup: {e}")))?;
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| Error::StateCorrupt(format!("schema init failed: {e}")))?;
    Self::check_or_stamp_version(&conn)?;
    info!(path = %path.display(), "opened store");

    Ok(Self {
      conn: Arc::new(Mutex::new(conn)),
      path: path.to_path_buf(),
    })
  }

  fn check_or_stamp_version(conn: &Connection) -> Result<()> {
    let stored: Option<i64> = conn
      .query_row("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1", [], |r| r.get(0))
      .ok();
    match stored {
      None => {
        conn
          .execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, strftime('%s','now'))",
            [CURRENT_SCHEMA_VERSION],
          )
          .map_err(|e| Error::StateCorrupt(format!("stamping schema version: {e}")))?;
        Ok(())
      }
      Some(v) if v == CURRENT_SCHEMA_VERSION => Ok(()),
      Some(v) => {
        warn!(on_disk = v, supported = CURRENT_SCHEMA_VERSION, "schema version mismatch, refusing to start");
        Err(Error::StateCorrupt(format!(
          "on-disk schema version {v} does not match supported version {CURRENT_SCHEMA_VERSION}; refusing to start"
        )))
      }
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Run a closure against the connection on a blocking thread.
  pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let conn = self.conn.clone();
    spawn_blocking(move || {
      let guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
      f(&guard)
    })
    .await
    .map_err(|e| Error::Fatal(format!("blocking task join failed: {e}")))?
  }

  /// Run a closure inside a transaction on a blocking thread, committing on
  /// `Ok` and rolling back (implicitly, on drop) on `Err`.
  pub async fn with_transaction<F, T>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&rusqlite::Transaction) -> Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let conn = self.conn.clone();
    spawn_blocking(move || {
      let mut guard = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
      let tx = guard
        .transaction()
        .map_err(|e| Error::Transient(format!("begin transaction: {e}")))?;
      let result = f(&tx)?;
      tx.commit().map_err(|e| Error::Transient(format!("commit transaction: {e}")))?;
      Ok(result)
    })
    .await
    .map_err(|e| Error::Fatal(format!("blocking task join failed: {e}")))?
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn open_creates_schema_and_stamps_version() {
    let dir = tempfile::tempdir().unwrap();
    let handle = StoreHandle::open(&dir.path().join("store.db")).unwrap();
    let version: i64 = handle
      .with_conn(|c| {
        c.query_row("SELECT version FROM schema_version", [], |r| r.get(0))
          .map_err(|e| Error::Fatal(e.to_string()))
      })
      .await
      .unwrap();
    assert_eq!(version, CURRENT_SCHEMA_VERSION);
  }

  #[tokio::test]
  async fn reopening_same_version_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    let _first = StoreHandle::open(&db_path).unwrap();
    let second = StoreHandle::open(&db_path);
    assert!(second.is_ok());
  }

  #[tokio::test]
  async fn mismatched_version_refuses_to_start() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("store.db");
    {
      let handle = StoreHandle::open(&db_path).unwrap();
      handle
        .with_conn(|c| {
          c.execute("UPDATE schema_version SET version = 999", [])
            .map_err(|e| Error::Fatal(e.to_string()))
        })
        .await
        .unwrap();
    }
    let reopened = StoreHandle::open(&db_path);
    assert!(matches!(reopened, Err(Error::StateCorrupt(_))));
  }
}
