//! HTTP API handlers for mt-portal

pub mod buildinfo;
pub mod error;
pub mod health;
pub mod ingest;
pub mod parameters;
pub mod records;
pub mod spectrum;
pub mod thumbnails;

pub use buildinfo::get_build_info;
pub use error::ApiError;
pub use health::health_routes;
pub use ingest::ingest_datafile;
pub use parameters::{parameters_json, retrieve_parameters};
pub use records::get_records;
pub use spectrum::{spectrum_csv, spectrum_json};
pub use thumbnails::{display_thumbnail, thumbnail_page};
