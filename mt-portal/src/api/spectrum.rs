//! Spectrum downloads
//!
//! The stored SPC file is decoded on a blocking thread and rendered either
//! as a CSV attachment or as a JSON series for the plotting widget.

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use mt_common::db::DatafileRepository;
use mt_common::export::{csv_disposition, export_label, to_csv, SpectrumSeries};
use mt_common::spectrum::datafile_path;
use mt_common::Error;
use tracing::debug;

use super::ApiError;
use crate::AppState;

/// GET /spectrum/csv/:datafile_id
pub async fn spectrum_csv(
    State(state): State<AppState>,
    Path(datafile_id): Path<i64>,
) -> Result<Response, ApiError> {
    let (label, counts) = load_spectrum(&state, datafile_id).await?;
    let body = to_csv(&counts)?;

    let disposition = HeaderValue::from_str(&csv_disposition(&label))
        .map_err(|e| Error::InvalidInput(format!("Unusable download name {}: {}", label, e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// GET /spectrum/json/:datafile_id
pub async fn spectrum_json(
    State(state): State<AppState>,
    Path(datafile_id): Path<i64>,
) -> Result<Json<SpectrumSeries>, ApiError> {
    let (label, counts) = load_spectrum(&state, datafile_id).await?;
    Ok(Json(SpectrumSeries::new(label, &counts)))
}

async fn load_spectrum(state: &AppState, datafile_id: i64) -> Result<(String, Vec<i32>), ApiError> {
    let datafile = state
        .store
        .get_datafile(datafile_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Datafile {}", datafile_id)))?;
    let location = state.store.datafile_location(datafile_id).await?;

    let path = datafile_path(
        &state.settings.file_store_path,
        location.experiment_id,
        location.dataset_id,
        &location.url,
    )?;
    if !path.is_file() {
        return Err(Error::NotFound(format!("Stored file for datafile {}", datafile_id)).into());
    }
    debug!("Reading spectrum {}", path.display());

    let reader = state.spectra;
    let counts = tokio::task::spawn_blocking(move || reader.read(&path)).await??;

    Ok((export_label(&datafile.url), counts))
}
