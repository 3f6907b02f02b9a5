//! SQLite persistence for settings and tasks.
//!
//! Everything that survives a restart lives in one JSON document stored
//! under a fixed namespace key. The session log and the live timer state are
//! runtime-only and never written here.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{AppSettings, Task};

/// Key under which the persisted document is stored.
pub const STORAGE_NAMESPACE: &str = "pomotask-storage";

const DB_FILE_NAME: &str = "pomotask.db";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to create database directory {0}")]
    DirectoryCreation(PathBuf),
}

/// The persisted document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoredState {
    pub settings: AppSettings,
    pub tasks: Vec<Task>,
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file inside `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, DatabaseError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|_| DatabaseError::DirectoryCreation(data_dir.to_path_buf()))?;

        let db_path = data_dir.join(DB_FILE_NAME);
        debug!(path = %db_path.display(), "Opening database");
        let conn = Connection::open(&db_path)?;
        Self::initialize_tables(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database.
    pub fn new_in_memory() -> Result<Self, DatabaseError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_tables(&conn)?;
        Ok(Self { conn })
    }

    fn initialize_tables(conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
        "#,
        )?;
        Ok(())
    }

    /// Platform data directory, falling back to the working directory.
    pub fn default_data_dir() -> PathBuf {
        ProjectDirs::from("com", "pomotask", "Pomotask")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Loads the persisted document, returning defaults if none is stored.
    /// A stored document that does not parse is an error.
    pub fn load_state(&self) -> Result<StoredState, DatabaseError> {
        let json: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                [STORAGE_NAMESPACE],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(j) => Ok(serde_json::from_str(&j)?),
            None => Ok(StoredState::default()),
        }
    }

    pub fn save_state(&self, state: &StoredState) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(state)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
            [STORAGE_NAMESPACE, json.as_str()],
        )?;
        Ok(())
    }

    /// Deletes the persisted document.
    pub fn wipe(&self) -> Result<(), DatabaseError> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?", [STORAGE_NAMESPACE])?;
        info!("Stored data wiped");
        Ok(())
    }
}
