//! In-place repairs of a loaded document.
//!
//! Repairs mutate the document only; persisting it is up to the caller, which
//! must hold the clinic gate for the whole load/repair/save cycle.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::validation::parse_date;
use crate::allocator::{reserve, AllocResult};
use crate::models::{DateKey, Document};

/// One value a repair changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairChange {
    pub collection: String,
    pub record_id: String,
    pub field: String,
    pub before: String,
    pub after: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairSummary {
    pub changes: Vec<RepairChange>,
    /// Records a repair could not fix, with the reason.
    pub skipped: Vec<String>,
}

impl RepairSummary {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn record(&mut self, collection: &str, record_id: &str, field: &str, before: &str, after: &str) {
        self.changes.push(RepairChange {
            collection: collection.to_string(),
            record_id: record_id.to_string(),
            field: field.to_string(),
            before: before.to_string(),
            after: after.to_string(),
        });
    }
}

/// Give every repeated patient id after its first holder a freshly allocated id.
///
/// New ids come from the patient's own registration date, falling back to the
/// date inside the duplicated id. Counters advance as with any allocation, so
/// no serial is handed out twice.
pub fn fix_duplicate_ids(doc: &mut Document) -> AllocResult<RepairSummary> {
    let mut summary = RepairSummary::default();
    let mut seen: HashSet<String> = HashSet::new();

    for index in 0..doc.patients.len() {
        let id = doc.patients[index].id.clone();
        if id.is_empty() || seen.insert(id.clone()) {
            continue;
        }

        let patient = &doc.patients[index];
        let key = patient
            .registration_date()
            .and_then(|d| DateKey::parse(d).ok())
            .or_else(|| patient.patient_id().map(|p| p.date_key().clone()));
        let Some(key) = key else {
            warn!(id = %id, name = %patient.full_name(), "duplicate id has no usable date");
            summary.skipped.push(format!(
                "{} ({}): no registration date to derive a new id from",
                id,
                patient.full_name()
            ));
            continue;
        };

        let new_id = reserve(doc, &key)?.to_string();
        info!(from = %id, to = %new_id, "reassigned duplicate patient id");
        doc.patients[index].id = new_id.clone();
        seen.insert(new_id.clone());
        summary.record("patients", &id, "id", &id, &new_id);
    }

    Ok(summary)
}

/// Rewrite every parseable date on patients, appointments and history as `YYYY-MM-DD`.
pub fn standardize_dates(doc: &mut Document) -> RepairSummary {
    let mut summary = RepairSummary::default();

    for p in &mut doc.patients {
        let id = p.id.clone();
        normalize(&mut summary, "patients", &id, "dateOfBirth", &mut p.date_of_birth);
        if let Some(date) = p.catheter_insertion_date.as_mut() {
            normalize(&mut summary, "patients", &id, "catheterInsertionDate", date);
        }
        if let Some(date) = p.fistula_creation_date.as_mut() {
            normalize(&mut summary, "patients", &id, "fistulaCreationDate", date);
        }
    }
    for a in &mut doc.appointments {
        normalize(&mut summary, "appointments", &a.id, "date", &mut a.date);
    }
    for h in &mut doc.history {
        normalize(&mut summary, "history", &h.id, "date", &mut h.date);
    }

    if !summary.is_empty() {
        info!(changes = summary.changes.len(), "standardized dates");
    }
    summary
}

fn normalize(summary: &mut RepairSummary, collection: &str, id: &str, field: &str, value: &mut String) {
    let Some(date) = parse_date(value) else {
        return;
    };
    let standard = date.format("%Y-%m-%d").to_string();
    if *value != standard {
        summary.record(collection, id, field, value, &standard);
        *value = standard;
    }
}
