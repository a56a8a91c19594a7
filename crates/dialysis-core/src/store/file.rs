//! JSON file backed document store.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{DocumentStore, StoreResult};
use crate::models::Document;

/// Persists the document as pretty-printed JSON at a single path.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "db.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> StoreResult<Document> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "no document yet, starting empty");
                return Ok(Document::default());
            }
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Document::default());
        }

        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let json = serde_json::to_string_pretty(doc)?;

        // Write beside the target and rename over it, so readers never see a torn file.
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), bytes = json.len(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;
    use crate::store::StoreError;

    #[test]
    fn test_missing_file_is_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("db.json"));

        assert_eq!(store.load().unwrap(), Document::default());
    }

    #[test]
    fn test_save_creates_directories_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested/data/db.json"));

        let mut doc = Document::default();
        doc.patients.push(Patient {
            id: "20250614/001".into(),
            first_name: "Asha".into(),
            ..Default::default()
        });
        doc.patient_serials.insert("20250614".into(), 1);
        store.save(&doc).unwrap();

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded, doc);
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_id_survives_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let store = JsonFileStore::new(&path);

        let mut doc = Document::default();
        doc.patients.push(Patient {
            id: "20250614/003".into(),
            ..Default::default()
        });
        store.save(&doc).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"20250614/003\""));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonFileStore::new(&path);
        assert!(matches!(store.load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_legacy_document_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        fs::write(
            &path,
            r#"{"patients":[{"id":"1718000000000","firstName":"Old"}],"appointments":[],"billing":[]}"#,
        )
        .unwrap();

        let doc = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(doc.patients.len(), 1);
        assert!(doc.history.is_empty());
        assert!(doc.patient_serials.is_empty());
    }
}
