//! docket-storage: SQLite topic database for docket.
//!
//! A [`CodeDb`] is one database file plus the ID allocation state shared by
//! every [`Accessor`] opened on it. Accessors own their own connection and
//! take a lock level on the shared state before reading or writing:
//!
//! - **accessor**: lock levels and transactions
//! - **topics**: topic queries, add/update/delete and per-file reconciliation
//! - **ending_symbols**: ending symbol lookups and the cleanup sweep
//! - **watchers**: [`ChangeWatcher`] notifications with an [`EventAccessor`]
//!
//! Uses rusqlite with bundled SQLite, WAL mode, and versioned migrations.

use docket_core::{DocketConfig, DocketError, IdAllocators, NumberSet, StorageConfig};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod accessor;
mod ending_symbols;
mod migrations;
mod topics;
mod watchers;

pub use accessor::Accessor;
pub use topics::ReconcileSummary;
pub use watchers::{ChangeWatcher, EventAccessor};

/// A code database: the SQLite file, its ID allocators and its watchers.
///
/// Share it between threads by reference or `Arc`; each thread opens its
/// own [`Accessor`].
pub struct CodeDb {
    path: PathBuf,
    cache_size_mb: u32,
    busy_timeout: Duration,
    state: RwLock<IdAllocators>,
    watchers: Mutex<Vec<Arc<dyn ChangeWatcher>>>,
}

impl CodeDb {
    /// Open (or create) a code database at the given path with default
    /// connection settings.
    pub fn open(path: &Path) -> Result<Self, DocketError> {
        Self::open_at(path, &StorageConfig::default())
    }

    /// Open (or create) the code database at `config.db_path` with the
    /// configured cache size and busy timeout.
    pub fn open_with_config(config: &StorageConfig) -> Result<Self, DocketError> {
        Self::open_at(Path::new(&config.db_path), config)
    }

    /// Open the database named by the user's config file, or the default
    /// location if there is none.
    pub fn open_default() -> Result<Self, DocketError> {
        Self::open_with_config(&DocketConfig::load_or_default().storage)
    }

    fn open_at(path: &Path, config: &StorageConfig) -> Result<Self, DocketError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut db = Self {
            path: path.to_path_buf(),
            cache_size_mb: config.cache_size_mb,
            busy_timeout: Duration::from_secs(config.busy_timeout_secs),
            state: RwLock::new(IdAllocators::new()),
            watchers: Mutex::new(Vec::new()),
        };

        let conn = db.connect()?;
        migrations::run_migrations(&conn)?;
        let ids = load_id_allocators(&conn)?;

        tracing::info!(
            "Opened code database {} ({} topics, {} ending symbols)",
            db.path.display(),
            ids.used_topic_ids.len(),
            ids.used_ending_symbol_ids.len()
        );
        *db.state.get_mut() = ids;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a new accessor with its own connection. It starts unlocked.
    pub fn accessor(&self) -> Result<Accessor<'_>, DocketError> {
        Ok(Accessor::new(self, self.connect()?))
    }

    /// Register a watcher. Watchers are notified in registration order.
    ///
    /// Must not be called from inside a notification.
    pub fn add_change_watcher(&self, watcher: Arc<dyn ChangeWatcher>) {
        self.watchers.lock().push(watcher);
    }

    /// Unregister a watcher previously passed to
    /// [`add_change_watcher`](Self::add_change_watcher). Returns whether it
    /// was found.
    pub fn remove_change_watcher(&self, watcher: &Arc<dyn ChangeWatcher>) -> bool {
        let mut watchers = self.watchers.lock();
        match watchers.iter().position(|w| Arc::ptr_eq(w, watcher)) {
            Some(i) => {
                watchers.remove(i);
                true
            }
            None => false,
        }
    }

    pub(crate) fn watchers(&self) -> MutexGuard<'_, Vec<Arc<dyn ChangeWatcher>>> {
        self.watchers.lock()
    }

    pub(crate) fn state(&self) -> &RwLock<IdAllocators> {
        &self.state
    }

    fn connect(&self) -> Result<Connection, DocketError> {
        let conn = Connection::open(&self.path).map_err(unexpected("Opening database"))?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(unexpected("Setting journal_mode"))?;
        // Negative cache size is in KiB
        conn.pragma_update(None, "cache_size", -(i64::from(self.cache_size_mb) * 1000))
            .map_err(unexpected("Setting cache_size"))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(unexpected("Setting foreign_keys"))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(unexpected("Setting synchronous"))?;
        conn.busy_timeout(self.busy_timeout)
            .map_err(unexpected("Setting busy_timeout"))?;

        Ok(conn)
    }
}

/// Rebuild the in-memory ID state from the stored rows.
///
/// Ending symbols no topic references are queued for the next cleanup sweep.
fn load_id_allocators(conn: &Connection) -> Result<IdAllocators, DocketError> {
    let ids = |sql: &str, operation: &'static str| -> Result<NumberSet, DocketError> {
        let mut stmt = conn.prepare(sql).map_err(unexpected(operation))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, u32>(0))
            .map_err(unexpected(operation))?;
        rows.collect::<Result<NumberSet, _>>()
            .map_err(unexpected(operation))
    };

    Ok(IdAllocators {
        used_topic_ids: ids("SELECT topic_id FROM topics", "Loading topic IDs")?,
        used_ending_symbol_ids: ids(
            "SELECT ending_symbol_id FROM ending_symbols",
            "Loading ending symbol IDs",
        )?,
        ending_symbol_ids_to_check: ids(
            "SELECT ending_symbol_id FROM ending_symbols e
             WHERE NOT EXISTS (SELECT 1 FROM topics t WHERE t.ending_symbol_id = e.ending_symbol_id)",
            "Loading unreferenced ending symbol IDs",
        )?,
    })
}

/// Wrap a rusqlite error with the step that produced it and SQLite's extended
/// result code, for use with `map_err`.
pub(crate) fn unexpected(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> DocketError {
    move |e| {
        let code = match &e {
            rusqlite::Error::SqliteFailure(err, _) => Some(err.extended_code),
            _ => None,
        };
        DocketError::UnexpectedResult {
            operation,
            code,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_schema_and_empty_state() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = CodeDb::open(&dir.path().join("nested").join("code.db")).unwrap();
        assert!(db.path().exists());
        let state = db.state().read();
        assert!(state.used_topic_ids.is_empty());
        assert!(state.used_ending_symbol_ids.is_empty());
    }

    #[test]
    fn open_with_config_uses_the_configured_path_and_settings() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = StorageConfig {
            db_path: dir
                .path()
                .join("configured")
                .join("docket.db")
                .to_string_lossy()
                .into_owned(),
            cache_size_mb: 8,
            busy_timeout_secs: 2,
        };
        let db = CodeDb::open_with_config(&config).unwrap();
        assert_eq!(db.path(), Path::new(&config.db_path));
        assert!(db.path().exists());
        assert_eq!(db.busy_timeout, Duration::from_secs(2));

        let conn = db.connect().unwrap();
        let cache_size: i64 = conn
            .pragma_query_value(None, "cache_size", |row| row.get(0))
            .unwrap();
        assert_eq!(cache_size, -8000);
    }

    #[test]
    fn reopening_reloads_used_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("code.db");
        {
            let db = CodeDb::open(&path).unwrap();
            let conn = db.connect().unwrap();
            conn.execute_batch(
                "INSERT INTO ending_symbols VALUES (1, 'Foo'), (2, 'Orphan');
                 INSERT INTO topics (topic_id, file_id, language_id, comment_line_number, code_line_number, title, symbol, ending_symbol_id, topic_type_id)
                 VALUES (3, 1, 1, 10, 10, 'Foo', 'Foo', 1, 1);",
            )
            .unwrap();
        }

        let db = CodeDb::open(&path).unwrap();
        let state = db.state().read();
        assert_eq!(state.used_topic_ids.to_string(), "{3}");
        assert_eq!(state.next_topic_id().unwrap(), 1);
        assert_eq!(state.used_ending_symbol_ids.to_string(), "{1-2}");
        assert_eq!(state.ending_symbol_ids_to_check.to_string(), "{2}");
    }

    #[test]
    fn unexpected_keeps_the_extended_code() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .execute("INSERT INTO missing_table VALUES (1)", [])
            .map_err(unexpected("Inserting"))
            .unwrap_err();
        match err {
            DocketError::UnexpectedResult {
                operation, code, ..
            } => {
                assert_eq!(operation, "Inserting");
                assert_eq!(code, Some(rusqlite::ffi::SQLITE_ERROR));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
