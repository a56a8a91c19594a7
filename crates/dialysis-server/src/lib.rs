//! Dialysis Records Server
//!
//! REST API and maintenance commands over the dialysis records store.
//!
//! # Modules
//!
//! - [`config`]: Layered configuration (defaults, file, environment)
//! - [`router`]: axum router under `/api`
//! - [`endpoints`]: Request handlers
//! - [`error`]: Error to HTTP response mapping
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod endpoints;
pub mod error;
pub mod router;
pub mod state;

pub use config::AppConfig;
pub use error::ApiError;
pub use router::api_router;
pub use state::{AppState, SharedClinic};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_logging(default_filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .try_init();
}
