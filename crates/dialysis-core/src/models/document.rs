//! The persisted dataset.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::patient::Patient;
use super::records::{
    Appointment, BillingRecord, DialysisFlowChart, HaemodialysisRecord, HistoryRecord,
};

/// Everything the unit stores, persisted as one JSON document.
///
/// Every collection defaults to empty so that partial documents written by
/// earlier versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub appointments: Vec<Appointment>,
    #[serde(default)]
    pub billing: Vec<BillingRecord>,
    #[serde(default)]
    pub history: Vec<HistoryRecord>,
    #[serde(default)]
    pub dialysis_flow_charts: Vec<DialysisFlowChart>,
    #[serde(default)]
    pub haemodialysis_records: Vec<HaemodialysisRecord>,
    /// Highest serial issued per `YYYYMMDD` date key. Only the allocator writes here.
    #[serde(default)]
    pub patient_serials: SerialMap,
}

/// Per-date serial counter.
pub type SerialMap = BTreeMap<String, u32>;

impl Document {
    pub fn find_patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn has_patient_id(&self, id: &str) -> bool {
        self.patients.iter().any(|p| p.id == id)
    }

    /// Per-collection record counts.
    pub fn counts(&self) -> DocumentCounts {
        DocumentCounts {
            patients: self.patients.len(),
            appointments: self.appointments.len(),
            billing: self.billing.len(),
            history: self.history.len(),
            flow_charts: self.dialysis_flow_charts.len(),
            haemodialysis_records: self.haemodialysis_records.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCounts {
    pub patients: usize,
    pub appointments: usize,
    pub billing: usize,
    pub history: usize,
    pub flow_charts: usize,
    pub haemodialysis_records: usize,
}
