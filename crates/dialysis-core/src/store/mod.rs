//! Document store: whole-document reads and overwrites of the JSON dataset.

mod backup;
mod file;

pub use backup::*;
pub use file::*;

use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::models::Document;

/// Store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backup not found: {}", .0.display())]
    BackupNotFound(PathBuf),

    #[error("Backup checksum mismatch for {}", .path.display())]
    ChecksumMismatch { path: PathBuf },

    #[error("Store lock poisoned")]
    LockPoisoned,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable storage for the whole dataset.
///
/// There is no partial-update primitive: callers load the document, change it,
/// and save it back. A store that has never been written loads as an empty
/// document.
pub trait DocumentStore: Send + Sync {
    fn load(&self) -> StoreResult<Document>;
    fn save(&self, doc: &Document) -> StoreResult<()>;
}

/// In-process store, used by tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<Document>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: Document) -> Self {
        Self {
            doc: Mutex::new(doc),
        }
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> StoreResult<Document> {
        let doc = self.doc.lock().map_err(|_| StoreError::LockPoisoned)?;
        Ok(doc.clone())
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        let mut current = self.doc.lock().map_err(|_| StoreError::LockPoisoned)?;
        *current = doc.clone();
        Ok(())
    }
}

impl<S: DocumentStore + ?Sized> DocumentStore for Box<S> {
    fn load(&self) -> StoreResult<Document> {
        (**self).load()
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        (**self).save(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryStore::new();
        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();

        let mut doc = store.load().unwrap();
        doc.patients.push(Patient {
            id: "20250614/001".into(),
            ..Default::default()
        });
        store.save(&doc).unwrap();

        let reloaded = store.load().unwrap();
        assert!(reloaded.has_patient_id("20250614/001"));
    }
}
