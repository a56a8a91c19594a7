//! Dialysis Records Core Library
//!
//! Patient records for a dialysis unit, kept as a single JSON document.
//!
//! # Architecture
//!
//! ```text
//!   register patient ──► Clinic (one lock around every write)
//!                            │
//!                            ├── IdAllocator ── YYYYMMDD/SSS, counter hint + collision scan
//!                            │
//!                            └── DocumentStore ── whole-document load / save
//!                                     │
//!                       ┌─────────────┼──────────────┐
//!                       ▼             ▼              ▼
//!                Quality report   Repairs      Billing export
//! ```
//!
//! # Core Principle
//!
//! **No two patients share an id, and no serial is handed out twice.** The per-date
//! counter is only a hint; the stored patients are the source of truth.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Patient, PatientId, records, Document)
//! - [`store`]: Document store trait, JSON file store, backups
//! - [`allocator`]: Patient id allocation
//! - [`clinic`]: Thread-safe service over a store
//! - [`quality`]: Validation, quality report and repairs
//! - [`search`]: Fuzzy patient search
//! - [`export`]: Billing export

pub mod allocator;
pub mod clinic;
pub mod export;
pub mod models;
pub mod quality;
pub mod search;
pub mod store;

// Re-export commonly used types
pub use allocator::{AllocError, AllocResult, IdAllocator};
pub use clinic::{Clinic, ClinicError, ClinicResult};
pub use export::BillingExport;
pub use models::{
    Appointment, BillingRecord, DateKey, DialysisFlowChart, Document, HaemodialysisRecord,
    HistoryRecord, NewPatient, Patient, PatientId, PatientUpdate, Record, StaffRoster,
};
pub use quality::{QualityReport, RepairSummary, Validate};
pub use search::PatientMatch;
pub use store::{DocumentStore, JsonFileStore, MemoryStore, StoreError, StoreResult};
