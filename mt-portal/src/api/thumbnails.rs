//! Thumbnail image and viewer page

use axum::{
    extract::{Path, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use mt_common::db::DatafileRepository;
use mt_common::thumbnail::ThumbnailSize;
use mt_common::Error;

use super::ApiError;
use crate::AppState;

/// GET /thumbnails/:size/:datafile_id
///
/// `size` is `small` for the bounded variant; any other value serves the
/// full-size thumbnail.
pub async fn display_thumbnail(
    State(state): State<AppState>,
    Path((size, datafile_id)): Path<(String, i64)>,
) -> Result<Response, ApiError> {
    ensure_datafile(&state, datafile_id).await?;

    let size = ThumbnailSize::from_segment(&size);
    let generator = state.thumbnails.clone();
    let bytes = tokio::task::spawn_blocking(move || generator.read(datafile_id, size)).await??;

    Ok((
        [(header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg"))],
        bytes,
    )
        .into_response())
}

/// GET /thumbnail/:datafile_id
pub async fn thumbnail_page(
    State(state): State<AppState>,
    Path(datafile_id): Path<i64>,
) -> Result<Html<String>, ApiError> {
    ensure_datafile(&state, datafile_id).await?;

    Ok(Html(format!(
        concat!(
            "<!DOCTYPE html>\n",
            "<html>\n",
            "<head><title>Datafile {id}</title></head>\n",
            "<body>\n",
            "  <img src=\"/thumbnails/full/{id}\" alt=\"datafile {id}\">\n",
            "</body>\n",
            "</html>\n"
        ),
        id = datafile_id
    )))
}

async fn ensure_datafile(state: &AppState, datafile_id: i64) -> Result<(), ApiError> {
    match state.store.get_datafile(datafile_id).await? {
        Some(_) => Ok(()),
        None => Err(Error::NotFound(format!("Datafile {}", datafile_id)).into()),
    }
}
