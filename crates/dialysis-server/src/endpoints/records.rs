//! CRUD endpoints shared by every non-patient collection.
//!
//! Each handler is generic over the record type; the router picks the type per
//! path.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use dialysis_core::{Record, Validate};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn list<T: Record>(State(state): State<AppState>) -> Result<Json<Vec<T>>, ApiError> {
    Ok(Json(state.with_clinic(|c| c.list::<T>()).await?))
}

pub async fn create<T: Record + Validate>(
    State(state): State<AppState>,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<(StatusCode, Json<T>), ApiError> {
    let Json(record) = payload?;
    let stored = state.with_clinic(move |c| c.add(record)).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn detail<T: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<T>, ApiError> {
    Ok(Json(state.with_clinic(move |c| c.get::<T>(&id)).await?))
}

pub async fn update<T: Record + Validate>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<Json<T>, ApiError> {
    let Json(record) = payload?;
    Ok(Json(state.with_clinic(move |c| c.update(&id, record)).await?))
}

pub async fn remove<T: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let key = id.clone();
    if state.with_clinic(move |c| c.remove::<T>(&key)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("{} not found: {}", T::KIND, id)))
    }
}
