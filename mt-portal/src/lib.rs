//! mt-portal library - MicroTardis facility portal
//!
//! Serves datafile metadata panels, thumbnails and spectrum exports for
//! the facility's data repository, plus a read-only facility records browser.

use axum::Router;
use mt_common::db::SqliteStore;
use mt_common::filters::{FilterRegistry, Ingestor};
use mt_common::spectrum::SpectrumReader;
use mt_common::thumbnail::ThumbnailGenerator;
use mt_common::Settings;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod api;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub settings: Arc<Settings>,
    pub thumbnails: ThumbnailGenerator,
    pub spectra: SpectrumReader,
    pub ingestor: Arc<Ingestor<SqliteStore>>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, settings: Arc<Settings>, registry: Arc<FilterRegistry>) -> Self {
        let store = SqliteStore::new(db);
        let thumbnails = ThumbnailGenerator::new(&settings.thumbnails_path);
        let ingestor = Ingestor::new(
            store.clone(),
            registry,
            thumbnails.clone(),
            &settings.file_store_path,
        );

        Self {
            store,
            thumbnails,
            spectra: SpectrumReader::default(),
            ingestor: Arc::new(ingestor),
            settings,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let datafiles = Router::new()
        .route("/ajax/parameters/:datafile_id", get(api::retrieve_parameters))
        .route("/api/datafile/:datafile_id/parameters", get(api::parameters_json))
        .route("/api/datafile/:datafile_id/ingest", post(api::ingest_datafile))
        .route("/thumbnails/:size/:datafile_id", get(api::display_thumbnail))
        .route("/thumbnail/:datafile_id", get(api::thumbnail_page))
        .route("/spectrum/csv/:datafile_id", get(api::spectrum_csv))
        .route("/spectrum/json/:datafile_id", get(api::spectrum_json));

    let records = Router::new().route("/api/records/:table", get(api::get_records));

    let public = Router::new()
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(datafiles)
        .merge(records)
        .merge(public)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
