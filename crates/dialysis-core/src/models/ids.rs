//! Patient identifier types.
//!
//! A patient id has the shape `YYYYMMDD/SSS`: the registration date followed by a
//! zero-padded serial that is unique within that date.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest serial representable in the three-digit `SSS` field.
pub const MAX_SERIAL: u32 = 999;

/// Date layouts accepted from forms and older documents.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parse a calendar date in any accepted layout.
///
/// Timestamps keep the date as written, not shifted to UTC. Validation and id
/// allocation both go through here, so a date that validates always allocates.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()) {
        return NaiveDate::parse_from_str(value, "%Y%m%d").ok();
    }
    if let Some(date) = DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.naive_local().date());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.date())
}

/// Identifier parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("Invalid registration date: {0}")]
    InvalidDate(String),

    #[error("Malformed patient id: {0}")]
    MalformedId(String),
}

/// Registration date normalized to its eight-digit `YYYYMMDD` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DateKey(String);

impl DateKey {
    /// Build a key from a calendar date.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.format("%Y%m%d").to_string())
    }

    /// Parse a registration date in any layout [`parse_date`] accepts.
    pub fn parse(input: &str) -> Result<Self, IdError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(IdError::InvalidDate("registration date is missing".into()));
        }
        parse_date(trimmed)
            .map(Self::from_date)
            .ok_or_else(|| IdError::InvalidDate(trimmed.to_string()))
    }

    /// The calendar date this key represents.
    pub fn date(&self) -> NaiveDate {
        // Construction guarantees eight digits forming a real date.
        NaiveDate::parse_from_str(&self.0, "%Y%m%d").unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DateKey {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(IdError::InvalidDate(value));
        }
        NaiveDate::parse_from_str(&value, "%Y%m%d")
            .map(Self::from_date)
            .map_err(|_| IdError::InvalidDate(value))
    }
}

impl From<DateKey> for String {
    fn from(key: DateKey) -> Self {
        key.0
    }
}

/// A patient identifier of the form `YYYYMMDD/SSS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId {
    date: DateKey,
    serial: u32,
}

impl PatientId {
    /// Create an id from its parts. Serials above [`MAX_SERIAL`] are rejected.
    pub fn new(date: DateKey, serial: u32) -> Result<Self, IdError> {
        if serial == 0 || serial > MAX_SERIAL {
            return Err(IdError::MalformedId(format!("{}/{}", date, serial)));
        }
        Ok(Self { date, serial })
    }

    pub fn date_key(&self) -> &DateKey {
        &self.date
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:03}", self.date, self.serial)
    }
}

impl FromStr for PatientId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IdError::MalformedId(s.to_string());

        let (date, serial) = s.split_once('/').ok_or_else(malformed)?;
        if serial.len() != 3 || !serial.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let date = DateKey::try_from(date.to_string()).map_err(|_| malformed())?;
        let serial: u32 = serial.parse().map_err(|_| malformed())?;
        Self::new(date, serial).map_err(|_| malformed())
    }
}

impl TryFrom<String> for PatientId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.to_string()
    }
}
