//! REST API router.
//!
//! Routes are nested under `/api/`. Layers (outermost first): CORS, request tracing.
//!
//! NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use dialysis_core::{
    Appointment, BillingRecord, DialysisFlowChart, HaemodialysisRecord, HistoryRecord,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsSettings;
use crate::endpoints::{misc, patients, records};
use crate::state::AppState;

/// Build the API router.
pub fn api_router(state: AppState, cors: &CorsSettings) -> Router {
    let api = Router::new()
        .route("/test", get(misc::test))
        .route("/staff", get(misc::staff))
        .route("/quality/report", get(misc::quality_report))
        // Patients
        .route("/patients", get(patients::list).post(patients::create))
        .route("/patients/search", get(patients::search))
        .route(
            "/patients/:id",
            get(patients::detail)
                .put(patients::update)
                .delete(patients::remove),
        )
        .route(
            "/patients/:date/:serial",
            get(patients::detail)
                .put(patients::update)
                .delete(patients::remove),
        )
        // Appointments
        .route(
            "/schedule",
            get(records::list::<Appointment>).post(records::create::<Appointment>),
        )
        .route(
            "/schedules",
            get(records::list::<Appointment>).post(records::create::<Appointment>),
        )
        .route("/schedule/:id", axum::routing::delete(records::remove::<Appointment>))
        .route(
            "/appointments/:id",
            get(records::detail::<Appointment>)
                .put(records::update::<Appointment>)
                .delete(records::remove::<Appointment>),
        )
        // Billing
        .route(
            "/billing",
            get(records::list::<BillingRecord>).post(records::create::<BillingRecord>),
        )
        .route("/billing/export", get(misc::billing_export))
        .route(
            "/billing/:id",
            get(records::detail::<BillingRecord>)
                .put(records::update::<BillingRecord>)
                .delete(records::remove::<BillingRecord>),
        )
        // History
        .route(
            "/history",
            get(records::list::<HistoryRecord>).post(records::create::<HistoryRecord>),
        )
        .route(
            "/history/:id",
            get(records::detail::<HistoryRecord>)
                .put(records::update::<HistoryRecord>)
                .delete(records::remove::<HistoryRecord>),
        )
        // Dialysis flow charts
        .route(
            "/dialysis-flow-charts",
            get(records::list::<DialysisFlowChart>).post(records::create::<DialysisFlowChart>),
        )
        .route(
            "/dialysis-flow-charts/:id",
            get(records::detail::<DialysisFlowChart>)
                .put(records::update::<DialysisFlowChart>)
                .delete(records::remove::<DialysisFlowChart>),
        )
        // Haemodialysis records
        .route(
            "/haemodialysis-records",
            get(records::list::<HaemodialysisRecord>)
                .post(records::create::<HaemodialysisRecord>),
        )
        .route(
            "/haemodialysis-records/:id",
            get(records::detail::<HaemodialysisRecord>)
                .put(records::update::<HaemodialysisRecord>)
                .delete(records::remove::<HaemodialysisRecord>),
        )
        .with_state(state);

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
}

/// Configured origins plus any `http://localhost:<port>`. Requests without an
/// `Origin` header are not subject to CORS at all.
fn cors_layer(settings: &CorsSettings) -> CorsLayer {
    let allowed: Arc<Vec<String>> = Arc::new(settings.allowed_origins.clone());

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            origin
                .to_str()
                .map(|o| o.starts_with("http://localhost:") || allowed.iter().any(|a| a == o))
                .unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
