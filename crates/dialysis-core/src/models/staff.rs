//! Staff roster served to scheduling forms.

use serde::{Deserialize, Serialize};

/// Technicians, doctors and dialysis units available for scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StaffRoster {
    pub technicians: Vec<String>,
    pub doctors: Vec<String>,
    pub units: Vec<String>,
}

impl Default for StaffRoster {
    fn default() -> Self {
        Self {
            technicians: vec!["John Doe".into(), "Jane Smith".into(), "Mike Johnson".into()],
            doctors: vec!["Dr. Brown".into(), "Dr. Wilson".into(), "Dr. Davis".into()],
            units: vec![
                "Unit A".into(),
                "Unit B".into(),
                "Unit C".into(),
                "Unit D".into(),
            ],
        }
    }
}
