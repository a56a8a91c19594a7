//! Patient models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ids::PatientId;

/// Keys `Patient` serializes from its own fields. They must never reach `extra`,
/// or the document is written with duplicate keys and no longer loads.
pub const PATIENT_KEYS: &[&str] = &[
    "id",
    "firstName",
    "lastName",
    "gender",
    "dateOfBirth",
    "mobileNo",
    "bloodGroup",
    "catheterInsertionDate",
    "fistulaCreationDate",
    "createdAt",
    "updatedAt",
];

/// A registered dialysis patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// `YYYYMMDD/SSS` for patients registered through the allocator. Older documents
    /// may hold timestamp ids, so this stays a plain string.
    #[serde(default, deserialize_with = "super::records::string_or_number")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub mobile_no: String,
    #[serde(default)]
    pub blood_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catheter_insertion_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fistula_creation_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Form fields this version does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patient {
    /// Build a patient from a registration payload and an allocated id.
    pub fn from_registration(id: &PatientId, new: NewPatient) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            id: id.to_string(),
            first_name: new.first_name.trim().to_string(),
            last_name: new.last_name.trim().to_string(),
            gender: new.gender,
            date_of_birth: new.date_of_birth,
            mobile_no: new.mobile_no.trim().to_string(),
            blood_group: new.blood_group,
            catheter_insertion_date: non_blank(new.catheter_insertion_date),
            fistula_creation_date: non_blank(new.fistula_creation_date),
            created_at: Some(now.clone()),
            updated_at: Some(now),
            extra: without_patient_keys(new.extra),
        }
    }

    /// Parsed identifier, or `None` for legacy/malformed ids.
    pub fn patient_id(&self) -> Option<PatientId> {
        self.id.parse().ok()
    }

    /// Date the id is derived from: catheter insertion, else fistula creation.
    pub fn registration_date(&self) -> Option<&str> {
        registration_date(
            self.catheter_insertion_date.as_deref(),
            self.fistula_creation_date.as_deref(),
        )
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Apply a partial update. The id is never changed.
    pub fn apply(&mut self, update: PatientUpdate) {
        if let Some(v) = update.first_name {
            self.first_name = v.trim().to_string();
        }
        if let Some(v) = update.last_name {
            self.last_name = v.trim().to_string();
        }
        if let Some(v) = update.gender {
            self.gender = v;
        }
        if let Some(v) = update.date_of_birth {
            self.date_of_birth = v;
        }
        if let Some(v) = update.mobile_no {
            self.mobile_no = v.trim().to_string();
        }
        if let Some(v) = update.blood_group {
            self.blood_group = v;
        }
        if let Some(v) = update.catheter_insertion_date {
            self.catheter_insertion_date = non_blank(Some(v));
        }
        if let Some(v) = update.fistula_creation_date {
            self.fistula_creation_date = non_blank(Some(v));
        }
        self.extra.extend(without_patient_keys(update.extra));
        self.updated_at = Some(chrono::Utc::now().to_rfc3339());
    }
}

/// Registration payload submitted by the front desk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub mobile_no: String,
    #[serde(default)]
    pub blood_group: String,
    #[serde(default)]
    pub catheter_insertion_date: Option<String>,
    #[serde(default)]
    pub fistula_creation_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewPatient {
    pub fn registration_date(&self) -> Option<&str> {
        registration_date(
            self.catheter_insertion_date.as_deref(),
            self.fistula_creation_date.as_deref(),
        )
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("firstName", self.first_name.as_str()),
            ("lastName", self.last_name.as_str()),
            ("gender", self.gender.as_str()),
            ("dateOfBirth", self.date_of_birth.as_str()),
            ("mobileNo", self.mobile_no.as_str()),
            ("bloodGroup", self.blood_group.as_str()),
        ];

        let mut missing: Vec<&'static str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if self.registration_date().is_none() {
            missing.push("catheterInsertionDate");
        }
        missing
    }
}

/// Partial patient update. Absent fields are left unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub date_of_birth: Option<String>,
    pub mobile_no: Option<String>,
    pub blood_group: Option<String>,
    pub catheter_insertion_date: Option<String>,
    pub fistula_creation_date: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn registration_date<'a>(catheter: Option<&'a str>, fistula: Option<&'a str>) -> Option<&'a str> {
    catheter
        .filter(|d| !d.trim().is_empty())
        .or_else(|| fistula.filter(|d| !d.trim().is_empty()))
}

fn without_patient_keys(extra: Map<String, Value>) -> Map<String, Value> {
    extra
        .into_iter()
        .filter(|(key, _)| !PATIENT_KEYS.contains(&key.as_str()))
        .collect()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
