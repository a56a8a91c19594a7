//! Clinical and administrative records that reference a patient.
//!
//! Every record carries a generated `id`, a handful of typed fields that the
//! validators and reports look at, and a flattened map holding any other form
//! fields so they survive a load/save cycle untouched.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::document::Document;

/// A record kept in one of the document's collections.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Human-readable collection name, used in errors and logs.
    const KIND: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn patient_id(&self) -> &str;

    fn collection(doc: &Document) -> &Vec<Self>;
    fn collection_mut(doc: &mut Document) -> &mut Vec<Self>;
}

macro_rules! impl_record {
    ($ty:ty, $kind:literal, $field:ident) => {
        impl Record for $ty {
            const KIND: &'static str = $kind;

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn patient_id(&self) -> &str {
                &self.patient_id
            }

            fn collection(doc: &Document) -> &Vec<Self> {
                &doc.$field
            }

            fn collection_mut(doc: &mut Document) -> &mut Vec<Self> {
                &mut doc.$field
            }
        }
    };
}

/// A scheduled dialysis session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub dialysis_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admitting_doctor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A billed dialysis session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BillingRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_date: Option<String>,
    /// Session length in hours.
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub session_duration: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// PAID, PENDING or CANCELLED
    #[serde(default)]
    pub status: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Vital signs captured at one point of a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_pressure: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_dialysis: Option<Vitals>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_dialysis: Option<Vitals>,
}

/// Laboratory values in mg/dL (urea, creatinine) and mEq/L (potassium, sodium).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LabResults {
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub urea: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub creatinine: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub potassium: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub sodium: Option<f64>,
}

/// A completed dialysis session in the patient's history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vital_signs: Option<VitalSigns>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lab_results: Option<LabResults>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub treatment_parameters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nursing_notes: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Dialysis flow chart filled in during a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DialysisFlowChart {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub blood_access: String,
    #[serde(default)]
    pub hd_starting_time: String,
    #[serde(default)]
    pub hd_closing_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_flow_rate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_before_dialysis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp_after_dialysis: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One timed observation row of a haemodialysis record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HaemodialysisRow {
    #[serde(default)]
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Haemodialysis observation sheet for one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct HaemodialysisRecord {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub patient_id: String,
    #[serde(default)]
    pub patient_name: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub rows: Vec<HaemodialysisRow>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl_record!(Appointment, "appointment", appointments);
impl_record!(BillingRecord, "billing record", billing);
impl_record!(HistoryRecord, "history record", history);
impl_record!(DialysisFlowChart, "dialysis flow chart", dialysis_flow_charts);
impl_record!(HaemodialysisRecord, "haemodialysis record", haemodialysis_records);

/// Forms post numbers as strings; accept both, plus blanks as absent.
pub(crate) fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {:?}", s))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a number, got {}",
            other
        ))),
    }
}

/// Older clients sent numeric patient and record ids.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string id, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_finite_numbers_rejected() {
        for amount in ["NaN", "inf", "-infinity"] {
            let json = format!(r#"{{"patientId": "20250614/001", "amount": "{}"}}"#, amount);
            assert!(serde_json::from_str::<BillingRecord>(&json).is_err(), "{}", amount);
        }
    }

    #[test]
    fn test_billing_accepts_string_numbers() {
        let json = r#"{
            "patientId": "20250614/001",
            "patientName": "Asha Rao",
            "sessionDate": "2025-06-20",
            "sessionDuration": "4",
            "amount": 2500.5,
            "status": "PAID"
        }"#;
        let bill: BillingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(bill.session_duration, Some(4.0));
        assert_eq!(bill.amount, Some(2500.5));
        assert_eq!(bill.id, "");
    }

    #[test]
    fn test_billing_rejects_non_numeric_amount() {
        let json = r#"{"patientId": "20250614/001", "amount": "lots", "status": "PAID"}"#;
        assert!(serde_json::from_str::<BillingRecord>(json).is_err());
    }

    #[test]
    fn test_unknown_fields_round_trip() {
        let json = r#"{
            "id": "abc",
            "patientId": 42,
            "patientName": "Ravi",
            "date": "2025-06-20",
            "bloodAccess": "Catheter",
            "hdStartingTime": "08:00",
            "hdClosingTime": "12:00",
            "fever": true,
            "spo2": "98"
        }"#;
        let chart: DialysisFlowChart = serde_json::from_str(json).unwrap();
        assert_eq!(chart.patient_id, "42");
        assert_eq!(chart.extra.get("fever"), Some(&Value::Bool(true)));

        let back = serde_json::to_value(&chart).unwrap();
        assert_eq!(back["spo2"], "98");
        assert_eq!(back["hdStartingTime"], "08:00");
    }

    #[test]
    fn test_history_nested_vitals() {
        let json = r#"{
            "patientId": "20250614/001",
            "date": "2025-06-20",
            "vitalSigns": {"preDialysis": {"bloodPressure": "140/90", "heartRate": "88"}},
            "labResults": {"urea": 120}
        }"#;
        let record: HistoryRecord = serde_json::from_str(json).unwrap();
        let pre = record.vital_signs.unwrap().pre_dialysis.unwrap();
        assert_eq!(pre.heart_rate, Some(88.0));
        assert_eq!(record.lab_results.unwrap().urea, Some(120.0));
    }

    #[test]
    fn test_record_collection_access() {
        let mut doc = Document::default();
        let appt = Appointment {
            id: "a1".into(),
            patient_id: "20250614/001".into(),
            ..Default::default()
        };
        Appointment::collection_mut(&mut doc).push(appt);

        assert_eq!(Appointment::collection(&doc).len(), 1);
        assert_eq!(doc.appointments[0].id(), "a1");
        assert_eq!(Appointment::KIND, "appointment");
    }
}
