use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::models::Flashcard;

/// Key under which the whole collection is stored
pub const STORAGE_KEY: &str = "flashcards";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create storage directory: {0}")]
    DirectoryError(String),
    #[error("Failed to encode or decode card collection: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Durable home of the card collection.
///
/// `load` is called once when the store opens, `save` after every mutation
/// with the complete collection.
pub trait CardRepository {
    /// `None` when nothing has been stored yet
    fn load(&self) -> Result<Option<Vec<Flashcard>>, StorageError>;
    fn save(&mut self, cards: &[Flashcard]) -> Result<(), StorageError>;
}

pub struct SqliteRepository {
    conn: Connection,
}

impl SqliteRepository {
    /// Open or create the database file and initialize the schema
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let db_path = PathBuf::from(path);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::DirectoryError(e.to_string()))?;
            }
        }

        let conn = Connection::open(&db_path)?;
        let repo = Self { conn };
        repo.initialize_schema()?;
        Ok(repo)
    }

    fn initialize_schema(&self) -> Result<(), StorageError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }
}

impl CardRepository for SqliteRepository {
    fn load(&self) -> Result<Option<Vec<Flashcard>>, StorageError> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM kv WHERE key = ?1",
                rusqlite::params![STORAGE_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, cards: &[Flashcard]) -> Result<(), StorageError> {
        let json = serde_json::to_string(cards)?;
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![STORAGE_KEY, json],
        )?;
        Ok(())
    }
}

/// In-memory repository; clones share the same document
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    document: Arc<Mutex<Option<String>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cards(cards: &[Flashcard]) -> Result<Self, StorageError> {
        let mut repo = Self::new();
        repo.save(cards)?;
        Ok(repo)
    }

    /// The raw serialized document, if anything was saved
    pub fn document(&self) -> Option<String> {
        self.document.lock().map(|d| d.clone()).unwrap_or_default()
    }

    /// Number of cards in the stored document
    pub fn stored_len(&self) -> Option<usize> {
        self.load().ok().flatten().map(|cards| cards.len())
    }
}

impl CardRepository for MemoryRepository {
    fn load(&self) -> Result<Option<Vec<Flashcard>>, StorageError> {
        match self.document() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, cards: &[Flashcard]) -> Result<(), StorageError> {
        let json = serde_json::to_string(cards)?;
        if let Ok(mut document) = self.document.lock() {
            *document = Some(json);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::seed_cards;
    use tempfile::TempDir;

    fn create_test_repository() -> (SqliteRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("cards.db");
        let repo = SqliteRepository::new(path.to_str().unwrap()).unwrap();
        (repo, temp_dir)
    }

    #[test]
    fn test_empty_database_loads_none() {
        let (repo, _temp) = create_test_repository();
        assert!(repo.load().unwrap().is_none());
    }

    #[test]
    fn test_save_and_reload_preserves_order_and_fields() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cards.db");
        let path = path.to_str().unwrap();

        let mut cards = seed_cards();
        cards[1].tags = Some(vec!["web".to_string()]);
        {
            let mut repo = SqliteRepository::new(path).unwrap();
            repo.save(&cards).unwrap();
        }

        let repo = SqliteRepository::new(path).unwrap();
        assert_eq!(repo.load().unwrap(), Some(cards));
    }

    #[test]
    fn test_save_overwrites_previous_document() {
        let (mut repo, _temp) = create_test_repository();
        let cards = seed_cards();
        repo.save(&cards).unwrap();
        repo.save(&cards[..1]).unwrap();
        assert_eq!(repo.load().unwrap().unwrap().len(), 1);
    }

    #[test]
    fn test_corrupt_document_is_a_decode_error() {
        let (repo, _temp) = create_test_repository();
        repo.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, 'not json')",
                rusqlite::params![STORAGE_KEY],
            )
            .unwrap();
        assert!(matches!(repo.load(), Err(StorageError::SerdeError(_))));
    }

    #[test]
    fn test_memory_repository_clones_share_document() {
        let repo = MemoryRepository::new();
        let mut writer = repo.clone();
        writer.save(&seed_cards()).unwrap();
        assert_eq!(repo.stored_len(), Some(3));
    }
}
