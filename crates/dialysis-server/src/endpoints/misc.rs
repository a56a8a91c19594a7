//! Liveness, staff roster, quality report and billing export.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use dialysis_core::{QualityReport, StaffRoster};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// `GET /api/test`
pub async fn test() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}

/// `GET /api/staff`
pub async fn staff(State(state): State<AppState>) -> Json<StaffRoster> {
    Json(state.staff.as_ref().clone())
}

/// `GET /api/quality/report`
pub async fn quality_report(State(state): State<AppState>) -> Result<Json<QualityReport>, ApiError> {
    Ok(Json(state.with_clinic(|c| c.quality_report()).await?))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: Option<String>,
}

/// `GET /api/billing/export?format=csv|json`
pub async fn billing_export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let export = state.with_clinic(|c| c.billing_export()).await?;

    match query.format.as_deref().unwrap_or("json") {
        "csv" => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (header::CONTENT_DISPOSITION, "attachment; filename=\"billing.csv\""),
            ],
            export.to_csv(),
        )
            .into_response()),
        "json" => Ok(Json(export).into_response()),
        other => Err(ApiError::BadRequest(format!(
            "Unsupported export format: {}",
            other
        ))),
    }
}
