//! Field-level validation rules for every record type.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub use crate::models::parse_date;
use crate::models::{
    Appointment, BillingRecord, DialysisFlowChart, HaemodialysisRecord, HistoryRecord,
    NewPatient, Patient, Vitals,
};

pub const GENDERS: &[&str] = &["Male", "Female", "Other"];
pub const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
pub const DIALYSIS_UNITS: &[&str] = &["Unit A", "Unit B", "Unit C", "Unit D"];
pub const BILLING_STATUSES: &[&str] = &["PAID", "PENDING", "CANCELLED"];
pub const BLOOD_ACCESS_TYPES: &[&str] = &["AV Fistula", "AV Graft", "Catheter", "Other"];

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([01]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{10}$").unwrap());
static BP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2,3})/(\d{2,3})$").unwrap());

/// A single failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Types that can check their own fields.
pub trait Validate {
    fn validate(&self) -> Vec<FieldError>;

    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}

pub fn is_valid_date(value: &str) -> bool {
    parse_date(value).is_some()
}

/// 24-hour `H:MM` or `HH:MM`.
pub fn is_valid_time(value: &str) -> bool {
    TIME_RE.is_match(value)
}

pub fn is_valid_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

pub fn is_valid_blood_group(value: &str) -> bool {
    BLOOD_GROUPS.contains(&value)
}

/// `systolic/diastolic` with systolic in 70..=300 and diastolic in 40..=200.
pub fn is_valid_blood_pressure(value: &str) -> bool {
    let Some(caps) = BP_RE.captures(value.trim()) else {
        return false;
    };
    let systolic: u32 = caps[1].parse().unwrap_or(0);
    let diastolic: u32 = caps[2].parse().unwrap_or(0);
    (70..=300).contains(&systolic) && (40..=200).contains(&diastolic)
}

/// A non-negative number written as text.
pub fn is_valid_number(value: &str) -> bool {
    value
        .trim()
        .parse::<f64>()
        .map(|n| n.is_finite() && n >= 0.0)
        .unwrap_or(false)
}

fn blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !blank(v))
}

fn check_demographics(
    errors: &mut Vec<FieldError>,
    first_name: &str,
    last_name: &str,
    gender: &str,
    date_of_birth: &str,
    mobile_no: &str,
    blood_group: &str,
) {
    if blank(first_name) {
        errors.push(FieldError::new("firstName", "First name is required"));
    }
    if blank(last_name) {
        errors.push(FieldError::new("lastName", "Last name is required"));
    }
    if !GENDERS.contains(&gender) {
        errors.push(FieldError::new("gender", "Gender must be Male, Female, or Other"));
    }
    if !is_valid_date(date_of_birth) {
        errors.push(FieldError::new("dateOfBirth", "Valid date of birth is required"));
    }
    if !is_valid_phone(mobile_no.trim()) {
        errors.push(FieldError::new("mobileNo", "Valid mobile number is required"));
    }
    if !is_valid_blood_group(blood_group) {
        errors.push(FieldError::new("bloodGroup", "Valid blood group is required"));
    }
}

fn check_access_dates(errors: &mut Vec<FieldError>, catheter: &Option<String>, fistula: &Option<String>) {
    if present(catheter).is_some_and(|d| !is_valid_date(d)) {
        errors.push(FieldError::new(
            "catheterInsertionDate",
            "Valid catheter insertion date is required",
        ));
    }
    if present(fistula).is_some_and(|d| !is_valid_date(d)) {
        errors.push(FieldError::new(
            "fistulaCreationDate",
            "Valid fistula creation date is required",
        ));
    }
}

fn check_patient_ref(errors: &mut Vec<FieldError>, patient_id: &str) {
    if blank(patient_id) {
        errors.push(FieldError::new("patientId", "Patient ID is required"));
    }
}

impl Validate for NewPatient {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_demographics(
            &mut errors,
            &self.first_name,
            &self.last_name,
            &self.gender,
            &self.date_of_birth,
            &self.mobile_no,
            &self.blood_group,
        );
        check_access_dates(&mut errors, &self.catheter_insertion_date, &self.fistula_creation_date);
        if self.registration_date().is_none() {
            errors.push(FieldError::new(
                "catheterInsertionDate",
                "Catheter insertion or fistula creation date is required",
            ));
        }
        errors
    }
}

impl Validate for Patient {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if blank(&self.id) {
            errors.push(FieldError::new("id", "Patient ID is required"));
        }
        check_demographics(
            &mut errors,
            &self.first_name,
            &self.last_name,
            &self.gender,
            &self.date_of_birth,
            &self.mobile_no,
            &self.blood_group,
        );
        check_access_dates(&mut errors, &self.catheter_insertion_date, &self.fistula_creation_date);
        errors
    }
}

impl Validate for Appointment {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_patient_ref(&mut errors, &self.patient_id);
        if !DIALYSIS_UNITS.contains(&self.dialysis_unit.as_str()) {
            errors.push(FieldError::new("dialysisUnit", "Valid dialysis unit is required"));
        }
        if !is_valid_date(&self.date) {
            errors.push(FieldError::new("date", "Valid appointment date is required"));
        }
        if !is_valid_time(&self.time) {
            errors.push(FieldError::new("time", "Valid appointment time is required"));
        }
        errors
    }
}

impl Validate for BillingRecord {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_patient_ref(&mut errors, &self.patient_id);
        if !present(&self.session_date).is_some_and(is_valid_date) {
            errors.push(FieldError::new("sessionDate", "Valid session date is required"));
        }
        if !self.session_duration.is_some_and(|d| d > 0.0) {
            errors.push(FieldError::new("sessionDuration", "Valid session duration is required"));
        }
        if !self.amount.is_some_and(|a| a >= 0.0) {
            errors.push(FieldError::new("amount", "Valid amount is required"));
        }
        if !BILLING_STATUSES.contains(&self.status.as_str()) {
            errors.push(FieldError::new("status", "Valid status is required"));
        }
        errors
    }
}

fn check_vitals(errors: &mut Vec<FieldError>, stage: &str, field: &str, vitals: &Vitals) {
    let prefix = format!("vitalSigns.{}", field);

    if present(&vitals.blood_pressure).is_some_and(|bp| !is_valid_blood_pressure(bp)) {
        errors.push(FieldError::new(
            format!("{}.bloodPressure", prefix),
            format!("Valid {} blood pressure format required (e.g., 120/80)", stage),
        ));
    }
    if vitals.heart_rate.is_some_and(|v| !(40.0..=200.0).contains(&v)) {
        errors.push(FieldError::new(
            format!("{}.heartRate", prefix),
            format!("Valid {} heart rate required (40-200)", stage),
        ));
    }
    if vitals.temperature.is_some_and(|v| !(30.0..=45.0).contains(&v)) {
        errors.push(FieldError::new(
            format!("{}.temperature", prefix),
            format!("Valid {} temperature required (30-45°C)", stage),
        ));
    }
    if vitals.weight.is_some_and(|v| !(20.0..=300.0).contains(&v)) {
        errors.push(FieldError::new(
            format!("{}.weight", prefix),
            format!("Valid {} weight required (20-300 kg)", stage),
        ));
    }
}

impl Validate for HistoryRecord {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_patient_ref(&mut errors, &self.patient_id);
        if !present(&self.start_time).is_some_and(is_valid_time) {
            errors.push(FieldError::new("startTime", "Valid start time is required"));
        }
        if !present(&self.end_time).is_some_and(is_valid_time) {
            errors.push(FieldError::new("endTime", "Valid end time is required"));
        }
        if !is_valid_date(&self.date) {
            errors.push(FieldError::new("date", "Valid date is required"));
        }

        if let Some(signs) = &self.vital_signs {
            if let Some(pre) = &signs.pre_dialysis {
                check_vitals(&mut errors, "pre-dialysis", "preDialysis", pre);
            }
            if let Some(post) = &signs.post_dialysis {
                check_vitals(&mut errors, "post-dialysis", "postDialysis", post);
            }
        }

        if let Some(lab) = &self.lab_results {
            let ranges = [
                ("urea", lab.urea, 0.0..=1000.0, "Valid urea level required (0-1000 mg/dL)"),
                ("creatinine", lab.creatinine, 0.0..=100.0, "Valid creatinine level required (0-100 mg/dL)"),
                ("potassium", lab.potassium, 1.0..=10.0, "Valid potassium level required (1-10 mEq/L)"),
                ("sodium", lab.sodium, 100.0..=200.0, "Valid sodium level required (100-200 mEq/L)"),
            ];
            for (name, value, range, message) in ranges {
                if value.is_some_and(|v| !range.contains(&v)) {
                    errors.push(FieldError::new(format!("labResults.{}", name), message));
                }
            }
        }
        errors
    }
}

impl Validate for DialysisFlowChart {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_patient_ref(&mut errors, &self.patient_id);
        if !is_valid_date(&self.date) {
            errors.push(FieldError::new("date", "Valid date is required"));
        }
        if !BLOOD_ACCESS_TYPES.contains(&self.blood_access.as_str()) {
            errors.push(FieldError::new("bloodAccess", "Valid blood access type is required"));
        }
        if !is_valid_time(&self.hd_starting_time) {
            errors.push(FieldError::new("hdStartingTime", "Valid HD starting time is required"));
        }
        if !is_valid_time(&self.hd_closing_time) {
            errors.push(FieldError::new("hdClosingTime", "Valid HD closing time is required"));
        }
        if present(&self.blood_flow_rate).is_some_and(|v| !is_valid_number(v)) {
            errors.push(FieldError::new("bloodFlowRate", "Valid blood flow rate is required"));
        }
        if present(&self.bp_before_dialysis).is_some_and(|bp| !is_valid_blood_pressure(bp)) {
            errors.push(FieldError::new(
                "bpBeforeDialysis",
                "Valid BP before dialysis format required (e.g., 120/80)",
            ));
        }
        if present(&self.bp_after_dialysis).is_some_and(|bp| !is_valid_blood_pressure(bp)) {
            errors.push(FieldError::new(
                "bpAfterDialysis",
                "Valid BP after dialysis format required (e.g., 120/80)",
            ));
        }
        errors
    }
}

impl Validate for HaemodialysisRecord {
    fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        check_patient_ref(&mut errors, &self.patient_id);
        if !is_valid_date(&self.date) {
            errors.push(FieldError::new("date", "Valid date is required"));
        }

        for (index, row) in self.rows.iter().enumerate() {
            let n = index + 1;
            if !is_valid_time(&row.time) {
                errors.push(FieldError::new(
                    format!("rows[{}].time", index),
                    format!("Row {}: Valid time is required", n),
                ));
            }
            if present(&row.bp).is_some_and(|bp| !is_valid_blood_pressure(bp)) {
                errors.push(FieldError::new(
                    format!("rows[{}].bp", index),
                    format!("Row {}: Valid BP format required (e.g., 120/80)", n),
                ));
            }
            if present(&row.pulse).is_some_and(|v| !is_valid_number(v)) {
                errors.push(FieldError::new(
                    format!("rows[{}].pulse", index),
                    format!("Row {}: Valid pulse rate required", n),
                ));
            }
            if present(&row.temperature).is_some_and(|v| !is_valid_number(v)) {
                errors.push(FieldError::new(
                    format!("rows[{}].temperature", index),
                    format!("Row {}: Valid temperature required", n),
                ));
            }
        }
        errors
    }
}
