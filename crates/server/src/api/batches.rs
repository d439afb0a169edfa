//! Batch API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use exeforge_core::{BatchError, BatchId, BatchSettings, BatchSnapshot};

use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a batch
#[derive(Debug, Deserialize)]
pub struct SubmitBatchBody {
    /// Scripts to package, one job each
    pub scripts: Vec<PathBuf>,
    /// Settings shared by every job
    #[serde(default)]
    pub settings: BatchSettings,
}

/// Response for an accepted cancellation
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub batch_id: BatchId,
    pub message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: BatchError) -> ApiError {
    let status = match &err {
        BatchError::Validation(_) => StatusCode::BAD_REQUEST,
        BatchError::BatchInProgress => StatusCode::CONFLICT,
        BatchError::NoActiveBatch => StatusCode::NOT_FOUND,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/batches
///
/// Validates every script and starts the batch. Nothing runs if any script
/// is rejected.
pub async fn submit_batch(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitBatchBody>,
) -> Result<(StatusCode, Json<BatchSnapshot>), ApiError> {
    let snapshot = state
        .coordinator()
        .submit(&body.scripts, &body.settings)
        .await
        .map_err(api_error)?;

    info!(
        batch = %snapshot.batch_id,
        jobs = snapshot.jobs.len(),
        "Batch submitted via API"
    );
    Ok((StatusCode::CREATED, Json(snapshot)))
}

/// GET /api/v1/batches/current
///
/// The running batch, or the last one if it already completed.
pub async fn get_current_batch(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BatchSnapshot>, ApiError> {
    match state.coordinator().snapshot().await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No batch has been submitted yet".to_string(),
            }),
        )),
    }
}

/// POST /api/v1/batches/current/cancel
///
/// Requests cancellation and returns right away; completion is reported
/// over the WebSocket stream.
pub async fn cancel_current_batch(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<CancelResponse>), ApiError> {
    let batch_id = state.coordinator().cancel_all().await.map_err(api_error)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CancelResponse {
            batch_id,
            message: "Cancellation requested".to_string(),
        }),
    ))
}
