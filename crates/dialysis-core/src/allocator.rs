//! Patient identifier allocation.
//!
//! Ids are `YYYYMMDD/SSS`. The per-date counter in [`Document::patient_serials`] is a
//! hint only: every candidate is checked against the stored patients, and the
//! counter is moved past any id that already exists. Callers must serialize
//! allocations (see [`crate::Clinic`]); this module holds no lock of its own.

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{DateKey, Document, IdError, Patient, PatientId, SerialMap, MAX_SERIAL};
use crate::store::{DocumentStore, StoreError};

/// Allocation errors.
#[derive(Error, Debug)]
pub enum AllocError {
    #[error("Invalid registration date: {0}")]
    InvalidDate(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(#[from] StoreError),

    #[error("No serials left for {date}")]
    Exhausted { date: String },
}

impl From<IdError> for AllocError {
    fn from(e: IdError) -> Self {
        match e {
            IdError::InvalidDate(s) | IdError::MalformedId(s) => AllocError::InvalidDate(s),
        }
    }
}

pub type AllocResult<T> = Result<T, AllocError>;

/// Next free serial for `key`: one past the counter, skipping serials already
/// held by a stored patient.
pub fn next_serial(serials: &SerialMap, patients: &[Patient], key: &DateKey) -> AllocResult<u32> {
    let hint = serials.get(key.as_str()).copied().unwrap_or(0);

    let taken: HashSet<u32> = patients
        .iter()
        .filter_map(Patient::patient_id)
        .filter(|id| id.date_key() == key)
        .map(|id| id.serial())
        .collect();

    let mut candidate = hint.saturating_add(1);
    while taken.contains(&candidate) {
        warn!(date = %key, serial = candidate, "serial already in use, counter drifted");
        candidate += 1;
    }

    if candidate > MAX_SERIAL {
        return Err(AllocError::Exhausted {
            date: key.to_string(),
        });
    }
    Ok(candidate)
}

/// Pick the next id for `key` and advance the counter in `doc`. Nothing is persisted.
pub fn reserve(doc: &mut Document, key: &DateKey) -> AllocResult<PatientId> {
    let serial = next_serial(&doc.patient_serials, &doc.patients, key)?;
    let id = PatientId::new(key.clone(), serial)?;
    doc.patient_serials.insert(key.to_string(), serial);
    Ok(id)
}

/// Allocates ids against a document store.
///
/// The counter is saved before the id is returned. If that save fails no id is
/// handed out.
pub struct IdAllocator<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: DocumentStore + ?Sized> IdAllocator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn allocate(&self, key: &DateKey) -> AllocResult<PatientId> {
        let mut doc = self.store.load()?;
        let id = reserve(&mut doc, key)?;
        self.store.save(&doc)?;

        debug!(date = %key, serial = id.serial(), id = %id, "allocated patient id");
        Ok(id)
    }

    /// Parse a registration date string and allocate for it.
    pub fn allocate_for(&self, registration_date: &str) -> AllocResult<PatientId> {
        let key = DateKey::parse(registration_date)?;
        self.allocate(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreResult};

    struct ReadOnlyStore(MemoryStore);

    impl DocumentStore for ReadOnlyStore {
        fn load(&self) -> StoreResult<Document> {
            self.0.load()
        }

        fn save(&self, _doc: &Document) -> StoreResult<()> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    fn key(s: &str) -> DateKey {
        DateKey::parse(s).unwrap()
    }

    fn patient(id: &str) -> Patient {
        Patient {
            id: id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_serial_is_one() {
        let serial = next_serial(&SerialMap::new(), &[], &key("2025-06-14")).unwrap();
        assert_eq!(serial, 1);
    }

    #[test]
    fn test_counter_hint_is_used() {
        let mut serials = SerialMap::new();
        serials.insert("20250614".into(), 7);
        assert_eq!(next_serial(&serials, &[], &key("2025-06-14")).unwrap(), 8);
    }

    #[test]
    fn test_skips_colliding_ids() {
        let mut serials = SerialMap::new();
        serials.insert("20250614".into(), 3);
        let patients = vec![patient("20250614/004"), patient("20250614/005")];

        assert_eq!(next_serial(&serials, &patients, &key("2025-06-14")).unwrap(), 6);
    }

    #[test]
    fn test_other_dates_and_legacy_ids_ignored() {
        let patients = vec![patient("20250615/001"), patient("1718000000000")];
        assert_eq!(next_serial(&SerialMap::new(), &patients, &key("2025-06-14")).unwrap(), 1);
    }

    #[test]
    fn test_exhausted() {
        let mut serials = SerialMap::new();
        serials.insert("20250614".into(), MAX_SERIAL);

        let err = next_serial(&serials, &[], &key("2025-06-14")).unwrap_err();
        assert!(matches!(err, AllocError::Exhausted { ref date } if date == "20250614"));
    }

    #[test]
    fn test_exhausted_by_collisions() {
        let mut serials = SerialMap::new();
        serials.insert("20250614".into(), 998);
        let patients = vec![patient("20250614/999")];

        assert!(matches!(
            next_serial(&serials, &patients, &key("2025-06-14")),
            Err(AllocError::Exhausted { .. })
        ));
    }

    #[test]
    fn test_allocate_persists_counter() {
        let store = MemoryStore::new();
        let allocator = IdAllocator::new(&store);

        let id = allocator.allocate_for("2025-06-14").unwrap();
        assert_eq!(id.to_string(), "20250614/001");
        assert_eq!(store.load().unwrap().patient_serials.get("20250614"), Some(&1));
    }

    #[test]
    fn test_allocate_rejects_bad_date() {
        let store = MemoryStore::new();
        let err = IdAllocator::new(&store).allocate_for("14/06/2025").unwrap_err();

        assert!(matches!(err, AllocError::InvalidDate(_)));
        assert!(store.load().unwrap().patient_serials.is_empty());
    }

    #[test]
    fn test_failed_save_returns_no_id() {
        let store = ReadOnlyStore(MemoryStore::new());
        let err = IdAllocator::new(&store).allocate_for("2025-06-14").unwrap_err();

        assert!(matches!(err, AllocError::StorageUnavailable(_)));
    }
}
