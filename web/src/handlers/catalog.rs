//! Bulk catalog resync endpoint.

use crate::error::AppError;
use crate::state::AppState;
use crate::WebResult;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `POST /api/catalog/sync` body.
#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    /// Only `"sync_all"` is supported
    pub action: String,
}

/// One failed space in the report.
#[derive(Debug, Serialize)]
pub struct SpaceError {
    /// The space that failed
    pub space_id: Uuid,
    /// Why it failed
    pub error: String,
}

/// Bulk resync report.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    /// Spaces synced successfully
    pub success_count: usize,
    /// Spaces that failed
    pub error_count: usize,
    /// Error text per failed space
    pub per_space_errors: Vec<SpaceError>,
    /// Spaces beyond the batch bound, still unsynced
    pub remaining: u64,
}

/// `POST /api/catalog/sync`
pub async fn sync(
    State(state): State<AppState>,
    Json(body): Json<SyncRequest>,
) -> WebResult<Json<SyncReport>> {
    if body.action != "sync_all" {
        return Err(AppError::validation(format!(
            "Unknown catalog action: {}",
            body.action
        )));
    }

    let report = state.catalog.sync_all().await?;
    Ok(Json(SyncReport {
        success_count: report.success_count,
        error_count: report.error_count,
        per_space_errors: report
            .per_space_errors
            .into_iter()
            .map(|(space_id, error)| SpaceError {
                space_id: *space_id.as_uuid(),
                error,
            })
            .collect(),
        remaining: report.remaining,
    }))
}
