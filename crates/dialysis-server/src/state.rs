//! Shared handler state.

use std::path::PathBuf;
use std::sync::Arc;

use dialysis_core::{Clinic, ClinicResult, DocumentStore, StaffRoster};

use crate::error::ApiError;

/// Clinic over whichever store the process was started with.
pub type SharedClinic = Clinic<Box<dyn DocumentStore>>;

#[derive(Clone)]
pub struct AppState {
    pub clinic: SharedClinic,
    pub staff: Arc<StaffRoster>,
    pub backup_dir: PathBuf,
}

impl AppState {
    pub fn new<S: DocumentStore + 'static>(store: S, staff: StaffRoster, backup_dir: PathBuf) -> Self {
        Self {
            clinic: Clinic::new(Box::new(store)),
            staff: Arc::new(staff),
            backup_dir,
        }
    }

    /// Run a clinic call on the blocking pool. Every call takes the clinic mutex
    /// and may read and fsync the document file.
    pub async fn with_clinic<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&SharedClinic) -> ClinicResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let clinic = self.clinic.clone();
        tokio::task::spawn_blocking(move || f(&clinic))
            .await
            .map_err(|e| ApiError::Internal(format!("clinic task failed: {}", e)))?
            .map_err(ApiError::from)
    }
}
