//! Patient endpoints.
//!
//! Allocated ids contain a `/`, so single-patient routes are mounted both as
//! `/patients/:date/:serial` and as `/patients/:id` (legacy ids, or the full id
//! with the slash percent-encoded).

use std::collections::HashMap;

use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;
use dialysis_core::{NewPatient, Patient, PatientMatch, PatientUpdate};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_SEARCH_LIMIT: usize = 20;

/// Patient id rebuilt from either route shape.
#[derive(Debug)]
pub struct PatientIdPath(pub String);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PatientIdPath {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(params) = Path::<HashMap<String, String>>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;

        match (params.get("date"), params.get("serial"), params.get("id")) {
            (Some(date), Some(serial), _) => Ok(Self(format!("{}/{}", date, serial))),
            (_, _, Some(id)) => Ok(Self(id.clone())),
            _ => Err(ApiError::BadRequest("missing patient id".to_string())),
        }
    }
}

/// `GET /api/patients`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Patient>>, ApiError> {
    Ok(Json(state.with_clinic(|c| c.list_patients()).await?))
}

/// `POST /api/patients` registers a patient and allocates its id.
pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<NewPatient>, JsonRejection>,
) -> Result<(StatusCode, Json<Patient>), ApiError> {
    let Json(new) = payload?;
    let patient = state.with_clinic(move |c| c.register_patient(new)).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

/// `GET /api/patients/:date/:serial`
pub async fn detail(
    State(state): State<AppState>,
    PatientIdPath(id): PatientIdPath,
) -> Result<Json<Patient>, ApiError> {
    Ok(Json(state.with_clinic(move |c| c.get_patient(&id)).await?))
}

/// `PUT /api/patients/:date/:serial`
pub async fn update(
    State(state): State<AppState>,
    PatientIdPath(id): PatientIdPath,
    payload: Result<Json<PatientUpdate>, JsonRejection>,
) -> Result<Json<Patient>, ApiError> {
    let Json(changes) = payload?;
    Ok(Json(state.with_clinic(move |c| c.update_patient(&id, changes)).await?))
}

/// `DELETE /api/patients/:date/:serial`
pub async fn remove(
    State(state): State<AppState>,
    PatientIdPath(id): PatientIdPath,
) -> Result<StatusCode, ApiError> {
    state.with_clinic(move |c| c.delete_patient(&id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

/// `GET /api/patients/search?q=&limit=`
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<PatientMatch>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
    Ok(Json(
        state
            .with_clinic(move |c| c.search_patients(&query.q, limit))
            .await?,
    ))
}
