//! Patient id allocation integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use dialysis_core::allocator::{next_serial, AllocError, IdAllocator};
use dialysis_core::models::{DateKey, Document, NewPatient, Patient, SerialMap};
use dialysis_core::store::{DocumentStore, MemoryStore, StoreError, StoreResult};
use dialysis_core::quality::is_valid_date;
use dialysis_core::{Clinic, ClinicError, Validate};
use proptest::prelude::*;

fn new_patient(name: &str, date: &str) -> NewPatient {
    NewPatient {
        first_name: name.to_string(),
        last_name: "Test".to_string(),
        gender: "Other".to_string(),
        date_of_birth: "1980-01-01".to_string(),
        mobile_no: "9000000000".to_string(),
        blood_group: "O+".to_string(),
        catheter_insertion_date: Some(date.to_string()),
        ..Default::default()
    }
}

/// Store whose saves can be switched off.
struct FlakyStore {
    inner: MemoryStore,
    fail_saves: AtomicBool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_saves: AtomicBool::new(false),
        }
    }
}

impl DocumentStore for FlakyStore {
    fn load(&self) -> StoreResult<Document> {
        self.inner.load()
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )));
        }
        self.inner.save(doc)
    }
}

#[test]
fn test_format_on_empty_store() {
    let store = MemoryStore::new();
    let id = IdAllocator::new(&store).allocate_for("2025-06-14").unwrap();

    assert_eq!(id.to_string(), "20250614/001");
}

#[test]
fn test_sequential_allocations_have_no_gaps() {
    let store = MemoryStore::new();
    let allocator = IdAllocator::new(&store);
    let key = DateKey::parse("2025-06-14").unwrap();

    let serials: Vec<u32> = (0..25).map(|_| allocator.allocate(&key).unwrap().serial()).collect();

    assert_eq!(serials, (1..=25).collect::<Vec<_>>());
}

#[test]
fn test_date_isolation() {
    let clinic = Clinic::new(MemoryStore::new());

    let a1 = clinic.register_patient(new_patient("A", "2025-06-14")).unwrap();
    let b1 = clinic.register_patient(new_patient("B", "2025-06-15")).unwrap();
    let a2 = clinic.register_patient(new_patient("C", "2025-06-14")).unwrap();

    assert_eq!(a1.id, "20250614/001");
    assert_eq!(b1.id, "20250615/001");
    assert_eq!(a2.id, "20250614/002");
}

#[test]
fn test_no_reuse_after_deletion() {
    let clinic = Clinic::new(MemoryStore::new());

    let first = clinic.register_patient(new_patient("A", "2025-06-14")).unwrap();
    assert_eq!(first.id, "20250614/001");

    clinic.delete_patient(&first.id).unwrap();

    let second = clinic.register_patient(new_patient("B", "2025-06-14")).unwrap();
    assert_eq!(second.id, "20250614/002");
}

#[test]
fn test_drift_recovery() {
    let mut doc = Document::default();
    doc.patient_serials.insert("20250614".to_string(), 3);
    doc.patients.push(Patient {
        id: "20250614/005".to_string(),
        first_name: "Manual".to_string(),
        ..Default::default()
    });
    let clinic = Clinic::new(MemoryStore::with_document(doc));

    let next = clinic.register_patient(new_patient("A", "2025-06-14")).unwrap();
    let serial = next.patient_id().unwrap().serial();

    assert!(serial >= 6, "expected to skip past 005, got {}", next.id);
    assert_ne!(next.id, "20250614/005");
}

#[test]
fn test_concurrent_registrations() {
    let clinic = Clinic::new(MemoryStore::new());

    let handles: Vec<_> = (0..50)
        .map(|i| {
            let clinic = clinic.clone();
            thread::spawn(move || {
                clinic
                    .register_patient(new_patient(&format!("P{}", i), "2025-06-14"))
                    .unwrap()
                    .id
            })
        })
        .collect();

    let ids: HashSet<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let expected: HashSet<String> = (1..=50).map(|n| format!("20250614/{:03}", n)).collect();

    assert_eq!(ids, expected);
    assert_eq!(clinic.list_patients().unwrap().len(), 50);
    assert_eq!(
        clinic.snapshot().unwrap().patient_serials.get("20250614"),
        Some(&50)
    );
}

#[test]
fn test_failed_save_creates_nothing() {
    let store = FlakyStore::new();
    store.fail_saves.store(true, Ordering::SeqCst);
    let clinic = Clinic::new(store);

    let err = clinic
        .register_patient(new_patient("A", "2025-06-14"))
        .unwrap_err();

    assert!(matches!(
        err,
        ClinicError::Allocation(AllocError::StorageUnavailable(_))
    ));
    assert!(clinic.list_patients().unwrap().is_empty());
    assert!(clinic.snapshot().unwrap().patient_serials.is_empty());
}

#[test]
fn test_invalid_date_is_rejected() {
    let store = MemoryStore::new();
    let err = IdAllocator::new(&store).allocate_for("sometime in June").unwrap_err();

    assert!(matches!(err, AllocError::InvalidDate(_)));
}

#[test]
fn test_exhausted_date_fails_explicitly() {
    let mut doc = Document::default();
    doc.patient_serials.insert("20250614".to_string(), 999);
    let clinic = Clinic::new(MemoryStore::with_document(doc));

    let err = clinic
        .register_patient(new_patient("A", "2025-06-14"))
        .unwrap_err();
    assert!(matches!(
        err,
        ClinicError::Allocation(AllocError::Exhausted { .. })
    ));

    // Other dates are unaffected
    let other = clinic.register_patient(new_patient("B", "2025-06-15")).unwrap();
    assert_eq!(other.id, "20250615/001");
}

#[test]
fn test_every_accepted_registration_layout_allocates() {
    let clinic = Clinic::new(MemoryStore::new());
    let layouts = [
        "2025-06-14",
        "20250614",
        "2025/06/14",
        "06/14/2025",
        "14 June 2025",
        "June 14, 2025",
        "2025-06-14T10:00",
        "2025-06-14 10:00:00",
        "2025-06-14T10:00:00.000Z",
    ];

    for (n, date) in layouts.iter().enumerate() {
        let new = new_patient("Layout", date);
        assert!(new.is_valid(), "{} should validate", date);

        let patient = clinic.register_patient(new).unwrap();
        assert_eq!(patient.id, format!("20250614/{:03}", n + 1));
    }
}

proptest! {
    #[test]
    fn prop_valid_dates_always_allocate(
        year in 1990i32..2100,
        month in 1u32..=12,
        day in 1u32..=28,
        layout in 0usize..6,
    ) {
        let input = match layout {
            0 => format!("{:04}-{:02}-{:02}", year, month, day),
            1 => format!("{:04}{:02}{:02}", year, month, day),
            2 => format!("{:04}/{:02}/{:02}", year, month, day),
            3 => format!("{:02}/{:02}/{:04}", month, day, year),
            4 => format!("{:04}-{:02}-{:02}T08:15", year, month, day),
            _ => format!("{:04}-{:02}-{:02}T08:15:00+05:30", year, month, day),
        };

        prop_assert!(is_valid_date(&input));
        let key = DateKey::parse(&input).unwrap();
        prop_assert_eq!(key.to_string(), format!("{:04}{:02}{:02}", year, month, day));
    }

    #[test]
    fn prop_sequential_allocations_are_dense(count in 1usize..60, day in 1u32..=28) {
        let store = MemoryStore::new();
        let allocator = IdAllocator::new(&store);
        let date = format!("2025-03-{:02}", day);

        let ids: Vec<String> = (0..count)
            .map(|_| allocator.allocate_for(&date).unwrap().to_string())
            .collect();

        let expected: Vec<String> = (1..=count)
            .map(|n| format!("202503{:02}/{:03}", day, n))
            .collect();
        prop_assert_eq!(ids, expected);
    }

    #[test]
    fn prop_next_serial_never_collides(
        hint in 0u32..50,
        taken in proptest::collection::btree_set(1u32..80, 0..40),
    ) {
        let key = DateKey::parse("2025-06-14").unwrap();
        let mut serials = SerialMap::new();
        serials.insert(key.to_string(), hint);
        let patients: Vec<Patient> = taken
            .iter()
            .map(|s| Patient {
                id: format!("20250614/{:03}", s),
                ..Default::default()
            })
            .collect();

        let serial = next_serial(&serials, &patients, &key).unwrap();

        prop_assert!(serial > hint);
        prop_assert!(!taken.contains(&serial));
        prop_assert!((hint + 1..serial).all(|s| taken.contains(&s)));
    }
}
