//! Post-save metadata extraction trigger

use axum::{
    extract::{Path, State},
    Json,
};
use mt_common::filters::IngestReport;
use tracing::info;

use super::ApiError;
use crate::AppState;

/// POST /api/datafile/:datafile_id/ingest
///
/// Runs every registered filter over the stored file and regenerates its
/// thumbnails. Safe to repeat: each schema's parameter set is replaced.
pub async fn ingest_datafile(
    State(state): State<AppState>,
    Path(datafile_id): Path<i64>,
) -> Result<Json<IngestReport>, ApiError> {
    info!("Ingest requested for datafile {}", datafile_id);
    let report = state.ingestor.ingest(datafile_id).await?;
    Ok(Json(report))
}
