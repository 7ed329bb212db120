//! Persistent tier of the movie cache: storage trait and SQLite backend.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use crate::catalog::Movie;

/// Durable key-value storage for movie records, keyed by id.
///
/// Implementations do not validate or filter; that responsibility belongs to
/// callers. Failures are reported to the caller and never retried here.
pub trait PersistentStore: Send + Sync {
  /// Every record currently durable, in unspecified order.
  fn get_all(&self) -> Result<Vec<Movie>>;

  /// Upsert each record by id. Must be safe to call repeatedly with
  /// overlapping or identical batches.
  fn save_all(&self, movies: &[Movie]) -> Result<()>;
}

impl PersistentStore for Box<dyn PersistentStore> {
  fn get_all(&self) -> Result<Vec<Movie>> {
    (**self).get_all()
  }

  fn save_all(&self, movies: &[Movie]) -> Result<()> {
    (**self).save_all(movies)
  }
}

/// Store that persists nothing.
///
/// Used when the on-disk database cannot be opened: the in-memory cache
/// keeps working and offline persistence is lost for the session.
pub struct NoopStore;

impl PersistentStore for NoopStore {
  fn get_all(&self) -> Result<Vec<Movie>> {
    Ok(Vec::new())
  }

  fn save_all(&self, _movies: &[Movie]) -> Result<()> {
    Ok(())
  }
}

/// Schema for the catalog mirror.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id INTEGER PRIMARY KEY,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-backed persistent store. Records are stored as JSON blobs keyed
/// by movie id.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create data directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open catalog database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// Open or create the store at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open catalog database at {}: {}", path.display(), e))?;

    Self::from_connection(conn)
  }

  /// In-memory database, private to this connection.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;

    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run catalog migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  fn default_path() -> Result<std::path::PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("flick").join("catalog.db"))
  }
}

impl PersistentStore for SqliteStore {
  fn get_all(&self) -> Result<Vec<Movie>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT data FROM movies")
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let movies: Vec<Movie> = stmt
      .query_map([], |row| {
        let data: Vec<u8> = row.get(0)?;
        Ok(data)
      })
      .map_err(|e| eyre!("Failed to query movies: {}", e))?
      .filter_map(|r| r.ok())
      .filter_map(|data| serde_json::from_slice(&data).ok())
      .collect();

    Ok(movies)
  }

  fn save_all(&self, movies: &[Movie]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("BEGIN TRANSACTION", [])
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    for movie in movies {
      let data = serde_json::to_vec(movie)
        .map_err(|e| eyre!("Failed to serialize movie {}: {}", movie.id, e))?;

      conn
        .execute(
          "INSERT OR REPLACE INTO movies (id, data, cached_at)
           VALUES (?, ?, datetime('now'))",
          params![movie.id, data],
        )
        .map_err(|e| eyre!("Failed to store movie {}: {}", movie.id, e))?;
    }

    conn
      .execute("COMMIT", [])
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    Ok(())
  }
}
