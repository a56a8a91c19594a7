//! Data quality report over the whole document.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::Validate;
use crate::models::{Document, DocumentCounts, Patient};

const HIGH_BILLING_AMOUNT: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
            Severity::Info => "INFO",
        }
    }
}

/// One finding about one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    #[serde(rename = "type")]
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Issue {
    fn new(severity: Severity, message: impl Into<String>, record_id: &str) -> Self {
        Self {
            severity,
            message: message.into(),
            record_id: Some(record_id.to_string()).filter(|id| !id.is_empty()),
            field: None,
            value: None,
        }
    }

    fn field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionIssues {
    pub patients: Vec<Issue>,
    pub appointments: Vec<Issue>,
    pub billing: Vec<Issue>,
    pub history: Vec<Issue>,
    pub flow_charts: Vec<Issue>,
    pub haemodialysis_records: Vec<Issue>,
}

impl CollectionIssues {
    /// `(collection name, issues)` pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &[Issue])> {
        [
            ("patients", self.patients.as_slice()),
            ("appointments", self.appointments.as_slice()),
            ("billing", self.billing.as_slice()),
            ("history", self.history.as_slice()),
            ("flowCharts", self.flow_charts.as_slice()),
            ("haemodialysisRecords", self.haemodialysis_records.as_slice()),
        ]
        .into_iter()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.iter()
            .flat_map(|(_, issues)| issues)
            .filter(|issue| issue.severity == severity)
            .count()
    }
}

/// Snapshot of data quality problems with suggested follow-ups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub timestamp: DateTime<Utc>,
    pub summary: DocumentCounts,
    pub issues: CollectionIssues,
    pub recommendations: Vec<String>,
}

impl QualityReport {
    pub fn generate(doc: &Document) -> Self {
        let issues = CollectionIssues {
            patients: analyze_patients(doc),
            appointments: analyze_appointments(doc),
            billing: analyze_billing(doc),
            history: analyze_history(doc),
            flow_charts: validation_issues(&doc.dialysis_flow_charts, |c| &c.id),
            haemodialysis_records: validation_issues(&doc.haemodialysis_records, |r| &r.id),
        };

        let mut report = Self {
            timestamp: Utc::now(),
            summary: doc.counts(),
            issues,
            recommendations: Vec::new(),
        };
        report.recommendations = recommendations(&report);
        report
    }

    pub fn error_count(&self) -> usize {
        self.issues.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.issues.count(Severity::Warning)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Plain-text rendering for terminals and logs.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        let _ = writeln!(out, "=== DATA QUALITY REPORT ===");
        let _ = writeln!(out, "Generated: {}", self.timestamp.to_rfc3339());
        let _ = writeln!(out);
        let _ = writeln!(out, "--- SUMMARY ---");
        let _ = writeln!(out, "Patients: {}", s.patients);
        let _ = writeln!(out, "Appointments: {}", s.appointments);
        let _ = writeln!(out, "Billing Records: {}", s.billing);
        let _ = writeln!(out, "History Records: {}", s.history);
        let _ = writeln!(out, "Flow Charts: {}", s.flow_charts);
        let _ = writeln!(out, "Haemodialysis Records: {}", s.haemodialysis_records);
        let _ = writeln!(out);
        let _ = writeln!(out, "--- ISSUES ---");

        for (collection, issues) in self.issues.iter() {
            if issues.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}:", collection.to_uppercase());
            for issue in issues {
                let _ = write!(out, "  [{}] {}", issue.severity.label(), issue.message);
                if let Some(id) = &issue.record_id {
                    let _ = write!(out, " (record {})", id);
                }
                let _ = writeln!(out);
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "--- RECOMMENDATIONS ---");
        for rec in &self.recommendations {
            let _ = writeln!(out, "* {}", rec);
        }
        out
    }
}

fn validation_issues<T: Validate>(records: &[T], id: impl Fn(&T) -> &String) -> Vec<Issue> {
    records
        .iter()
        .flat_map(|record| {
            let record_id = id(record).clone();
            record.validate().into_iter().map(move |e| {
                Issue::new(Severity::Error, e.message, &record_id).field(e.field)
            })
        })
        .collect()
}

fn analyze_patients(doc: &Document) -> Vec<Issue> {
    let patients = &doc.patients;
    let mut issues = validation_issues(patients, |p| &p.id);

    let mut id_counts: HashMap<&str, usize> = HashMap::new();
    let mut mobile_counts: HashMap<&str, usize> = HashMap::new();
    for p in patients {
        *id_counts.entry(p.id.as_str()).or_default() += 1;
        if !p.mobile_no.trim().is_empty() {
            *mobile_counts.entry(p.mobile_no.trim()).or_default() += 1;
        }
    }

    for p in patients {
        if id_counts.get(p.id.as_str()).copied().unwrap_or(0) > 1 {
            issues.push(
                Issue::new(Severity::Error, "Duplicate patient ID", &p.id)
                    .field("id")
                    .value(p.id.clone()),
            );
        }
        if !p.id.is_empty() && p.patient_id().is_none() {
            issues.push(
                Issue::new(Severity::Error, "Patient ID is not in YYYYMMDD/SSS form", &p.id)
                    .field("id")
                    .value(p.id.clone()),
            );
        }
        if mobile_counts.get(p.mobile_no.trim()).copied().unwrap_or(0) > 1 {
            issues.push(
                Issue::new(Severity::Warning, "Duplicate mobile number found", &p.id)
                    .field("mobileNo")
                    .value(p.mobile_no.clone()),
            );
        }
        if p.registration_date().is_none() {
            issues.push(Issue::new(
                Severity::Warning,
                "Missing both catheter and fistula dates",
                &p.id,
            ));
        }
    }

    issues.extend(serial_drift(doc));
    issues
}

/// Dates whose counter is behind the highest serial actually stored.
fn serial_drift(doc: &Document) -> Vec<Issue> {
    let mut highest: BTreeMap<String, u32> = BTreeMap::new();
    for id in doc.patients.iter().filter_map(Patient::patient_id) {
        let entry = highest.entry(id.date_key().to_string()).or_default();
        *entry = (*entry).max(id.serial());
    }

    highest
        .into_iter()
        .filter_map(|(date, max)| {
            let counter = doc.patient_serials.get(&date).copied().unwrap_or(0);
            (counter < max).then(|| {
                Issue::new(
                    Severity::Info,
                    format!(
                        "Serial counter for {} is {} but the highest stored serial is {}",
                        date, counter, max
                    ),
                    "",
                )
                .field("patientSerials")
                .value(date)
            })
        })
        .collect()
}

fn analyze_appointments(doc: &Document) -> Vec<Issue> {
    let appointments = &doc.appointments;
    let mut issues = validation_issues(appointments, |a| &a.id);

    for a in appointments {
        let conflict = appointments
            .iter()
            .any(|other| other.id != a.id && other.date == a.date && other.time == a.time);
        if conflict {
            issues.push(
                Issue::new(Severity::Warning, "Potential appointment time conflict", &a.id)
                    .field("time")
                    .value(a.time.clone()),
            );
        }
    }
    issues
}

fn analyze_billing(doc: &Document) -> Vec<Issue> {
    let mut issues = validation_issues(&doc.billing, |b| &b.id);

    for bill in &doc.billing {
        if let Some(amount) = bill.amount.filter(|a| *a > HIGH_BILLING_AMOUNT) {
            issues.push(
                Issue::new(Severity::Warning, "Unusually high billing amount", &bill.id)
                    .field("amount")
                    .value(amount),
            );
        }
    }
    issues
}

fn analyze_history(doc: &Document) -> Vec<Issue> {
    let mut issues = validation_issues(&doc.history, |h| &h.id);

    for record in &doc.history {
        let heart_rate = record
            .vital_signs
            .as_ref()
            .and_then(|v| v.pre_dialysis.as_ref())
            .and_then(|pre| pre.heart_rate);
        if let Some(rate) = heart_rate.filter(|r| !(40.0..=120.0).contains(r)) {
            issues.push(
                Issue::new(Severity::Warning, "Unusual pre-dialysis heart rate", &record.id)
                    .field("vitalSigns.preDialysis.heartRate")
                    .value(rate),
            );
        }
    }
    issues
}

fn recommendations(report: &QualityReport) -> Vec<String> {
    let mut recs = Vec::new();

    let errors = report.error_count();
    let warnings = report.warning_count();
    if errors > 0 {
        recs.push(format!(
            "Fix {} data validation errors to ensure data integrity",
            errors
        ));
    }
    if warnings > 0 {
        recs.push(format!(
            "Review {} warnings for potential data quality improvements",
            warnings
        ));
    }
    if report.summary.patients == 0 {
        recs.push("Add patient data to start using the system".to_string());
    }
    if report.summary.appointments == 0 {
        recs.push("Schedule appointments for patients".to_string());
    }
    if report.summary.history == 0 {
        recs.push("Record dialysis session history for patients".to_string());
    }
    if report
        .issues
        .patients
        .iter()
        .any(|i| i.message == "Duplicate patient ID")
    {
        recs.push("Run fix-duplicates to reassign duplicate patient IDs".to_string());
    }
    recs.push("Regularly backup the database to prevent data loss".to_string());
    recs
}
