//! Billing export for accounts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{BillingRecord, Document};

/// All billing records with totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingExport {
    /// Export timestamp
    pub exported_at: String,
    pub line_items: Vec<BillingLineItem>,
    /// Sum of every amount, cancelled sessions excluded
    pub total_amount: f64,
    /// Record count per status
    pub status_counts: BTreeMap<String, usize>,
}

/// Single billed session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingLineItem {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub session_date: String,
    /// Hours
    pub session_duration: Option<f64>,
    pub amount: Option<f64>,
    pub status: String,
    pub description: String,
}

impl From<&BillingRecord> for BillingLineItem {
    fn from(record: &BillingRecord) -> Self {
        Self {
            id: record.id.clone(),
            patient_id: record.patient_id.clone(),
            patient_name: record.patient_name.clone(),
            session_date: record
                .session_date
                .clone()
                .or_else(|| record.date.clone())
                .unwrap_or_default(),
            session_duration: record.session_duration,
            amount: record.amount,
            status: record.status.clone(),
            description: record.description.clone().unwrap_or_default(),
        }
    }
}

impl BillingExport {
    pub fn from_records(records: &[BillingRecord]) -> Self {
        let line_items: Vec<BillingLineItem> = records.iter().map(BillingLineItem::from).collect();

        let total_amount = line_items
            .iter()
            .filter(|item| item.status != "CANCELLED")
            .filter_map(|item| item.amount)
            .sum();

        let mut status_counts = BTreeMap::new();
        for item in &line_items {
            let status = if item.status.is_empty() {
                "UNKNOWN".to_string()
            } else {
                item.status.clone()
            };
            *status_counts.entry(status).or_insert(0) += 1;
        }

        Self {
            exported_at: chrono::Utc::now().to_rfc3339(),
            line_items,
            total_amount,
            status_counts,
        }
    }

    pub fn from_document(doc: &Document) -> Self {
        Self::from_records(&doc.billing)
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::new();

        // Header
        csv.push_str("id,patient_id,patient_name,session_date,session_duration,amount,status,description\n");

        for item in &self.line_items {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                escape_csv(&item.id),
                escape_csv(&item.patient_id),
                escape_csv(&item.patient_name),
                escape_csv(&item.session_date),
                item.session_duration.map(|d| d.to_string()).unwrap_or_default(),
                item.amount.map(|a| format!("{:.2}", a)).unwrap_or_default(),
                escape_csv(&item.status),
                escape_csv(&item.description),
            ));
        }

        csv
    }
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
