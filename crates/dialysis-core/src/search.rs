//! Fuzzy patient lookup by id, name or mobile number.

use serde::{Deserialize, Serialize};
use strsim::{jaro_winkler, normalized_levenshtein};

use crate::models::Patient;

/// Matches scoring below this are dropped.
pub const MIN_SCORE: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientMatch {
    pub patient: Patient,
    pub score: f64,
    /// Which field produced the score.
    pub matched_on: MatchField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchField {
    Id,
    Name,
    MobileNo,
}

/// Rank patients against a free-text query, best first.
pub fn search_patients(patients: &[Patient], query: &str, limit: usize) -> Vec<PatientMatch> {
    let query = query.trim().to_lowercase();
    if query.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut matches: Vec<PatientMatch> = patients
        .iter()
        .filter_map(|p| {
            score_patient(p, &query).map(|(score, matched_on)| PatientMatch {
                patient: p.clone(),
                score,
                matched_on,
            })
        })
        .filter(|m| m.score >= MIN_SCORE)
        .collect();

    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.patient.id.cmp(&b.patient.id))
    });
    matches.truncate(limit);
    matches
}

fn score_patient(patient: &Patient, query: &str) -> Option<(f64, MatchField)> {
    if patient.id.eq_ignore_ascii_case(query) {
        return Some((1.0, MatchField::Id));
    }

    let digits: String = query.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() >= 3 && digits.len() == query.chars().filter(|c| !c.is_whitespace()).count() {
        if patient.mobile_no.trim() == digits {
            return Some((1.0, MatchField::MobileNo));
        }
        if patient.mobile_no.trim().starts_with(&digits) {
            return Some((0.9, MatchField::MobileNo));
        }
        if patient.id.starts_with(&digits) {
            return Some((0.85, MatchField::Id));
        }
        return None;
    }

    let full = patient.full_name().to_lowercase();
    let candidates = [
        full.clone(),
        patient.first_name.trim().to_lowercase(),
        patient.last_name.trim().to_lowercase(),
    ];

    let best = candidates
        .iter()
        .filter(|c| !c.is_empty())
        .map(|c| fuzzy_match(query, c))
        .fold(0.0_f64, f64::max);

    let best = if full.contains(query) && query.len() >= 2 {
        best.max(0.9)
    } else {
        best
    };

    (best > 0.0).then_some((best, MatchField::Name))
}

/// Jaro-Winkler blended with normalized Levenshtein.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);

    // Jaro-Winkler favours shared prefixes, which suits typed names
    jw * 0.6 + lev * 0.4
}
