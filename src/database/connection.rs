/*!
 * Database connection management.
 *
 * This module wraps a SQLite connection for shared use by concurrent row
 * tasks and provides async-safe access using tokio's spawn_blocking.
 */

use log::{debug, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::DatabaseError;

/// Location string selecting an in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DatabaseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConnection").field("db_path", &self.db_path).finish()
    }
}

impl DatabaseConnection {
    /// Open an existing database file
    ///
    /// A missing file is an error: the source tables must already exist.
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self, DatabaseError> {
        let db_path = db_path.as_ref().to_path_buf();
        if !db_path.is_file() {
            return Err(DatabaseError::Connection(format!(
                "SQLite database not found at {:?}; check database.connection in the config",
                db_path
            )));
        }

        info!("Opening database at: {:?}", db_path);
        let conn = Connection::open(&db_path)
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database {:?}: {}", db_path, e)))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        debug!("Creating in-memory database");
        let conn = Connection::open_in_memory()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create in-memory database: {}", e)))?;

        Ok(Self {
            db_path: PathBuf::from(IN_MEMORY),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a location from the config: a file path, optionally prefixed with `sqlite:`
    pub fn open_location(location: &str) -> Result<Self, DatabaseError> {
        let path = location
            .trim()
            .trim_start_matches("sqlite://")
            .trim_start_matches("sqlite:");
        if path == IN_MEMORY {
            Self::open_in_memory()
        } else {
            Self::open(path)
        }
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a database operation asynchronously using spawn_blocking
    ///
    /// This is the preferred method for async contexts as it prevents
    /// blocking the async runtime.
    pub async fn execute_async<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| DatabaseError::Task(format!("Failed to acquire database lock: {}", e)))?;

            f(&conn)
        })
        .await
        .map_err(|e| DatabaseError::Task(format!("Database task panicked: {}", e)))?
    }

    /// Run statements inside one transaction asynchronously
    pub async fn transaction_async<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&rusqlite::Transaction) -> Result<T, DatabaseError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| DatabaseError::Task(format!("Failed to acquire database lock: {}", e)))?;

            let tx = conn.transaction()?;
            let result = f(&tx)?;
            tx.commit()?;

            Ok(result)
        })
        .await
        .map_err(|e| DatabaseError::Task(format!("Database transaction task panicked: {}", e)))?
    }
}
