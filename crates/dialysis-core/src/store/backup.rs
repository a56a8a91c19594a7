//! Point-in-time copies of the document with SHA-256 digests.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::{DocumentStore, StoreError, StoreResult};
use crate::models::Document;

const BACKUP_PREFIX: &str = "db-backup-";
const DIGEST_EXTENSION: &str = "sha256";

/// A backup file written by [`backup`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub sha256: String,
    pub created_at: DateTime<Utc>,
}

/// Hex SHA-256 of a byte slice.
pub fn hash_data(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Copy the current document into `dir` as `db-backup-<timestamp>.json`, with its
/// digest in a `.sha256` sidecar.
pub fn backup<S: DocumentStore + ?Sized>(store: &S, dir: &Path) -> StoreResult<BackupInfo> {
    let doc = store.load()?;
    let json = serde_json::to_vec_pretty(&doc)?;
    let sha256 = hash_data(&json);

    fs::create_dir_all(dir)?;
    let created_at = Utc::now();
    let path = dir.join(format!(
        "{}{}.json",
        BACKUP_PREFIX,
        created_at.format("%Y%m%dT%H%M%S%.3fZ")
    ));

    fs::write(&path, &json)?;
    fs::write(digest_path(&path), format!("{}\n", sha256))?;

    info!(path = %path.display(), patients = doc.patients.len(), "backup written");
    Ok(BackupInfo {
        path,
        sha256,
        created_at,
    })
}

/// Replace the stored document with the contents of a backup.
///
/// When a digest sidecar exists the backup must match it. The file must parse as
/// a document before anything is written.
pub fn restore<S: DocumentStore + ?Sized>(store: &S, path: &Path) -> StoreResult<Document> {
    if !path.is_file() {
        return Err(StoreError::BackupNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;

    match fs::read_to_string(digest_path(path)) {
        Ok(expected) => {
            if expected.trim() != hash_data(&bytes) {
                return Err(StoreError::ChecksumMismatch {
                    path: path.to_path_buf(),
                });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "no digest next to backup, restoring unverified")
        }
        Err(e) => return Err(e.into()),
    }

    let doc: Document = serde_json::from_slice(&bytes)?;
    store.save(&doc)?;

    info!(path = %path.display(), patients = doc.patients.len(), "backup restored");
    Ok(doc)
}

/// Backups in `dir`, newest first. A missing directory has no backups.
pub fn list_backups(dir: &Path) -> StoreResult<Vec<BackupInfo>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut backups = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_backup = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(BACKUP_PREFIX) && n.ends_with(".json"))
            .unwrap_or(false);
        if !is_backup {
            continue;
        }

        let sha256 = match fs::read_to_string(digest_path(&path)) {
            Ok(digest) => digest.trim().to_string(),
            Err(_) => hash_data(&fs::read(&path)?),
        };
        let created_at = fs::metadata(&path)?
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(|_| Utc::now());

        backups.push(BackupInfo {
            path,
            sha256,
            created_at,
        });
    }

    backups.sort_by(|a, b| b.path.cmp(&a.path));
    Ok(backups)
}

fn digest_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(DIGEST_EXTENSION);
    PathBuf::from(name)
}
