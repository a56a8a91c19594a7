//! Clinic service: every read-modify-write of the document runs here, behind one lock.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info};

use crate::allocator::{AllocError, IdAllocator};
use crate::export::BillingExport;
use crate::models::{Document, NewPatient, Patient, PatientId, PatientUpdate, Record};
use crate::quality::{self, QualityReport, RepairSummary, Validate};
use crate::search::{self, PatientMatch};
use crate::store::{self, BackupInfo, DocumentStore, StoreError};

/// Clinic service errors.
#[derive(Error, Debug)]
pub enum ClinicError {
    #[error(transparent)]
    Allocation(#[from] AllocError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Clinic lock poisoned")]
    LockPoisoned,
}

impl<T> From<PoisonError<T>> for ClinicError {
    fn from(_: PoisonError<T>) -> Self {
        ClinicError::LockPoisoned
    }
}

pub type ClinicResult<T> = Result<T, ClinicError>;

fn check<V: Validate>(value: &V) -> ClinicResult<()> {
    let errors = value.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ClinicError::Validation(
            errors.into_iter().map(|e| e.message).collect(),
        ))
    }
}

/// Thread-safe handle over a document store.
///
/// Cloning is cheap and every clone shares the same lock, so allocation plus the
/// patient insert that follows it can never interleave with another write.
pub struct Clinic<S: DocumentStore> {
    store: Arc<Mutex<S>>,
}

impl<S: DocumentStore> Clone for Clinic<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> Clinic<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    fn lock(&self) -> ClinicResult<MutexGuard<'_, S>> {
        Ok(self.store.lock()?)
    }

    /// Run `f` on a loaded document and save it if `f` succeeds.
    fn write<T>(&self, f: impl FnOnce(&mut Document) -> ClinicResult<T>) -> ClinicResult<T> {
        let store = self.lock()?;
        let mut doc = store.load()?;
        let out = f(&mut doc)?;
        store.save(&doc)?;
        Ok(out)
    }

    /// Current contents of the whole document.
    pub fn snapshot(&self) -> ClinicResult<Document> {
        Ok(self.lock()?.load()?)
    }

    // =========================================================================
    // Patients
    // =========================================================================

    /// Allocate an id without registering anyone. The serial is consumed.
    pub fn allocate_id(&self, registration_date: &str) -> ClinicResult<PatientId> {
        let store = self.lock()?;
        Ok(IdAllocator::new(&*store).allocate_for(registration_date)?)
    }

    /// Validate, allocate an id from the registration date, and store the patient.
    pub fn register_patient(&self, new: NewPatient) -> ClinicResult<Patient> {
        check(&new)?;
        let registration_date = new.registration_date().unwrap_or_default().to_string();

        let store = self.lock()?;
        let id = IdAllocator::new(&*store).allocate_for(&registration_date)?;

        let mut doc = store.load()?;
        let patient = Patient::from_registration(&id, new);
        doc.patients.push(patient.clone());
        store.save(&doc)?;

        info!(id = %id, "registered patient");
        Ok(patient)
    }

    pub fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        Ok(self.snapshot()?.patients)
    }

    pub fn get_patient(&self, id: &str) -> ClinicResult<Patient> {
        self.snapshot()?
            .find_patient(id)
            .cloned()
            .ok_or_else(|| ClinicError::NotFound {
                kind: "patient",
                id: id.to_string(),
            })
    }

    pub fn update_patient(&self, id: &str, update: PatientUpdate) -> ClinicResult<Patient> {
        let patient = self.write(|doc| {
            let patient = doc
                .patients
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| ClinicError::NotFound {
                    kind: "patient",
                    id: id.to_string(),
                })?;

            let mut updated = patient.clone();
            updated.apply(update);
            check(&updated)?;
            *patient = updated.clone();
            Ok(updated)
        })?;

        debug!(id = %id, "updated patient");
        Ok(patient)
    }

    /// Remove a patient. The serial stays consumed.
    pub fn delete_patient(&self, id: &str) -> ClinicResult<()> {
        self.write(|doc| {
            let before = doc.patients.len();
            doc.patients.retain(|p| p.id != id);
            if doc.patients.len() == before {
                return Err(ClinicError::NotFound {
                    kind: "patient",
                    id: id.to_string(),
                });
            }
            Ok(())
        })?;

        info!(id = %id, "deleted patient");
        Ok(())
    }

    pub fn search_patients(&self, query: &str, limit: usize) -> ClinicResult<Vec<PatientMatch>> {
        let doc = self.snapshot()?;
        Ok(search::search_patients(&doc.patients, query, limit))
    }

    // =========================================================================
    // Other records
    // =========================================================================

    pub fn list<T: Record>(&self) -> ClinicResult<Vec<T>> {
        let doc = self.snapshot()?;
        Ok(T::collection(&doc).clone())
    }

    pub fn get<T: Record>(&self, id: &str) -> ClinicResult<T> {
        let doc = self.snapshot()?;
        T::collection(&doc)
            .iter()
            .find(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| ClinicError::NotFound {
                kind: T::KIND,
                id: id.to_string(),
            })
    }

    /// Store a new record under a fresh id.
    pub fn add<T: Record + Validate>(&self, mut record: T) -> ClinicResult<T> {
        check(&record)?;
        record.set_id(uuid::Uuid::new_v4().to_string());

        let stored = record.clone();
        self.write(move |doc| {
            T::collection_mut(doc).push(record);
            Ok(())
        })?;

        debug!(kind = T::KIND, id = stored.id(), "added record");
        Ok(stored)
    }

    /// Replace a record, keeping its id.
    pub fn update<T: Record + Validate>(&self, id: &str, mut record: T) -> ClinicResult<T> {
        record.set_id(id.to_string());
        check(&record)?;

        let stored = record.clone();
        self.write(move |doc| {
            let slot = T::collection_mut(doc)
                .iter_mut()
                .find(|r| r.id() == id)
                .ok_or_else(|| ClinicError::NotFound {
                    kind: T::KIND,
                    id: id.to_string(),
                })?;
            *slot = record;
            Ok(())
        })?;

        debug!(kind = T::KIND, id = %id, "updated record");
        Ok(stored)
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove<T: Record>(&self, id: &str) -> ClinicResult<bool> {
        let store = self.lock()?;
        let mut doc = store.load()?;

        let records = T::collection_mut(&mut doc);
        let before = records.len();
        records.retain(|r| r.id() != id);
        if records.len() == before {
            return Ok(false);
        }

        store.save(&doc)?;
        debug!(kind = T::KIND, id = %id, "removed record");
        Ok(true)
    }

    // =========================================================================
    // Reports, repairs and backups
    // =========================================================================

    pub fn quality_report(&self) -> ClinicResult<QualityReport> {
        Ok(QualityReport::generate(&self.snapshot()?))
    }

    pub fn billing_export(&self) -> ClinicResult<BillingExport> {
        Ok(BillingExport::from_document(&self.snapshot()?))
    }

    /// Reassign duplicated patient ids. Saves only when something changed.
    pub fn fix_duplicate_ids(&self) -> ClinicResult<RepairSummary> {
        let store = self.lock()?;
        let mut doc = store.load()?;
        let summary = quality::fix_duplicate_ids(&mut doc)?;
        if !summary.is_empty() {
            store.save(&doc)?;
        }
        info!(fixed = summary.changes.len(), skipped = summary.skipped.len(), "duplicate id repair finished");
        Ok(summary)
    }

    /// Rewrite dates as `YYYY-MM-DD`. Saves only when something changed.
    pub fn standardize_dates(&self) -> ClinicResult<RepairSummary> {
        let store = self.lock()?;
        let mut doc = store.load()?;
        let summary = quality::standardize_dates(&mut doc);
        if !summary.is_empty() {
            store.save(&doc)?;
        }
        Ok(summary)
    }

    pub fn backup(&self, dir: &Path) -> ClinicResult<BackupInfo> {
        let store = self.lock()?;
        Ok(store::backup(&*store, dir)?)
    }

    pub fn restore(&self, path: &Path) -> ClinicResult<Document> {
        let store = self.lock()?;
        Ok(store::restore(&*store, path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Appointment, BillingRecord};
    use crate::store::MemoryStore;

    fn clinic() -> Clinic<MemoryStore> {
        Clinic::new(MemoryStore::new())
    }

    fn new_patient(first: &str, catheter: &str) -> NewPatient {
        NewPatient {
            first_name: first.into(),
            last_name: "Rao".into(),
            gender: "Female".into(),
            date_of_birth: "1970-02-11".into(),
            mobile_no: "9876543210".into(),
            blood_group: "B+".into(),
            catheter_insertion_date: Some(catheter.into()),
            ..Default::default()
        }
    }

    fn appointment(patient_id: &str) -> Appointment {
        Appointment {
            patient_id: patient_id.into(),
            patient_name: "Asha Rao".into(),
            date: "2025-06-20".into(),
            time: "09:00".into(),
            dialysis_unit: "Unit B".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_register_assigns_sequential_ids() {
        let clinic = clinic();

        let a = clinic.register_patient(new_patient("Asha", "2025-06-14")).unwrap();
        let b = clinic.register_patient(new_patient("Meena", "2025-06-14")).unwrap();
        let c = clinic.register_patient(new_patient("Ravi", "2025-06-15")).unwrap();

        assert_eq!(a.id, "20250614/001");
        assert_eq!(b.id, "20250614/002");
        assert_eq!(c.id, "20250615/001");
        assert_eq!(clinic.list_patients().unwrap().len(), 3);
    }

    #[test]
    fn test_register_rejects_invalid_payload() {
        let clinic = clinic();
        let mut bad = new_patient("Asha", "2025-06-14");
        bad.mobile_no = "123".into();

        let err = clinic.register_patient(bad).unwrap_err();
        assert!(matches!(err, ClinicError::Validation(ref e) if e.len() == 1));
        assert!(clinic.snapshot().unwrap().patient_serials.is_empty());
    }

    #[test]
    fn test_register_uses_fistula_date_when_no_catheter() {
        let clinic = clinic();
        let mut new = new_patient("Asha", "");
        new.fistula_creation_date = Some("2025-07-01".into());

        let patient = clinic.register_patient(new).unwrap();
        assert_eq!(patient.id, "20250701/001");
    }

    #[test]
    fn test_delete_does_not_recycle_serial() {
        let clinic = clinic();

        let first = clinic.register_patient(new_patient("Asha", "2025-06-14")).unwrap();
        clinic.delete_patient(&first.id).unwrap();
        let second = clinic.register_patient(new_patient("Meena", "2025-06-14")).unwrap();

        assert_eq!(second.id, "20250614/002");
        assert!(matches!(
            clinic.get_patient(&first.id),
            Err(ClinicError::NotFound { kind: "patient", .. })
        ));
    }

    #[test]
    fn test_update_patient_keeps_id() {
        let clinic = clinic();
        let patient = clinic.register_patient(new_patient("Asha", "2025-06-14")).unwrap();

        let updated = clinic
            .update_patient(
                &patient.id,
                PatientUpdate {
                    blood_group: Some("O-".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.id, patient.id);
        assert_eq!(clinic.get_patient(&patient.id).unwrap().blood_group, "O-");

        let err = clinic
            .update_patient(
                &patient.id,
                PatientUpdate {
                    gender: Some("Unknown".into()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));
        assert_eq!(clinic.get_patient(&patient.id).unwrap().gender, "Female");
    }

    #[test]
    fn test_record_crud() {
        let clinic = clinic();

        let added = clinic.add(appointment("20250614/001")).unwrap();
        assert_eq!(added.id.len(), 36);

        let fetched: Appointment = clinic.get(&added.id).unwrap();
        assert_eq!(fetched, added);

        let mut changed = added.clone();
        changed.time = "10:30".into();
        changed.id = "ignored".into();
        let updated = clinic.update(&added.id, changed).unwrap();
        assert_eq!(updated.id, added.id);
        assert_eq!(clinic.get::<Appointment>(&added.id).unwrap().time, "10:30");

        assert!(clinic.remove::<Appointment>(&added.id).unwrap());
        assert!(!clinic.remove::<Appointment>(&added.id).unwrap());
        assert!(clinic.list::<Appointment>().unwrap().is_empty());
    }

    #[test]
    fn test_record_validation_and_not_found() {
        let clinic = clinic();

        let err = clinic.add(BillingRecord::default()).unwrap_err();
        assert!(matches!(err, ClinicError::Validation(_)));

        let err = clinic.update("missing", appointment("20250614/001")).unwrap_err();
        assert!(matches!(err, ClinicError::NotFound { kind: "appointment", .. }));
    }

    #[test]
    fn test_fix_duplicates_through_clinic() {
        let mut doc = Document::default();
        for _ in 0..2 {
            doc.patients.push(Patient {
                id: "20250614/001".into(),
                catheter_insertion_date: Some("2025-06-14".into()),
                ..Default::default()
            });
        }
        let clinic = Clinic::new(MemoryStore::with_document(doc));

        let summary = clinic.fix_duplicate_ids().unwrap();
        assert_eq!(summary.changes.len(), 1);

        let next = clinic.allocate_id("2025-06-14").unwrap();
        assert_eq!(next.to_string(), "20250614/003");
    }
}
