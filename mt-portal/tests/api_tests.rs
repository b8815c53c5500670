//! Integration tests for mt-portal API endpoints
//!
//! Each test builds a fresh root folder with its own SQLite database and
//! file store, seeds datafiles on disk, and drives the router with
//! `oneshot` requests.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use mt_common::db::{init_database, ExtractedParameter, SchemaRepository, DatafileRepository, SqliteStore};
use mt_common::filters::FilterRegistry;
use mt_common::spectrum::SpectrumLayout;
use mt_common::Settings;
use mt_portal::{build_router, AppState};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method

/// Test fixture: temp root folder, settings and a store sharing the app's pool
struct TestPortal {
    _root: TempDir,
    settings: Arc<Settings>,
    store: SqliteStore,
    app: Router,
    experiment_id: i64,
    dataset_id: i64,
}

impl TestPortal {
    async fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let settings = Arc::new(Settings::with_root(root.path()));
        let pool = init_database(&settings.database_path).await.unwrap();
        let registry = Arc::new(FilterRegistry::from_config(&settings.filters).unwrap());

        let store = SqliteStore::new(pool.clone());
        let experiment_id = store.create_experiment("Test", "Facility").await.unwrap();
        let dataset_id = store.create_dataset(experiment_id, "run").await.unwrap();

        let app = build_router(AppState::new(pool, settings.clone(), registry));

        Self {
            _root: root,
            settings,
            store,
            app,
            experiment_id,
            dataset_id,
        }
    }

    fn stored_path(&self, relative: &str) -> PathBuf {
        self.settings
            .file_store_path
            .join(self.experiment_id.to_string())
            .join(self.dataset_id.to_string())
            .join(relative)
    }

    /// Write `bytes` into the file store and register the datafile
    async fn add_datafile(&self, url: &str, bytes: &[u8]) -> i64 {
        let relative = url.split_once("//").map(|(_, r)| r).unwrap_or(url);
        let path = self.stored_path(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();

        let filename = Path::new(relative).file_name().unwrap().to_string_lossy().to_string();
        self.store
            .create_datafile(self.dataset_id, &filename, url, Some(bytes.len() as i64), None)
            .await
            .unwrap()
    }

    async fn get(&self, uri: &str) -> axum::response::Response {
        self.app.clone().oneshot(test_request("GET", uri)).await.unwrap()
    }

    async fn post(&self, uri: &str) -> axum::response::Response {
        self.app.clone().oneshot(test_request("POST", uri)).await.unwrap()
    }
}

/// Test helper: EDAX Genesis file whose channel `i` holds `i * 10 + 10`
fn spectrum_bytes() -> Vec<u8> {
    let layout = SpectrumLayout::EDAX_GENESIS;
    let mut bytes = vec![0u8; layout.offset as usize];
    for i in 0..layout.channels as i32 {
        bytes.extend_from_slice(&(i * 10 + 10).to_le_bytes());
    }
    bytes
}

/// Test helper: 800x600 PNG followed by a microscope metadata block
fn image_bytes() -> Vec<u8> {
    let img = image::GrayImage::from_fn(800, 600, |x, y| image::Luma([((x + y) % 256) as u8]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes.extend_from_slice(b"[User]\r\nDate=03/14/2012\r\nTime=10:22:41 AM\r\n[Beam]\r\nHV=20000\r\n\0");
    bytes
}

fn test_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_bytes(response: axum::response::Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body")
        .to_vec()
}

async fn extract_json(response: axum::response::Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("Should parse JSON")
}

async fn extract_text(response: axum::response::Response) -> String {
    String::from_utf8(body_bytes(response).await).expect("Should be UTF-8")
}

// =============================================================================
// Health / build info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let portal = TestPortal::new().await;
    let response = portal.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "mt-portal");
    assert!(body["version"].is_string());
    assert_eq!(body["spectrum_schema"], "EDAXGenesis_SPC");
    assert_eq!(body["exif_schema_suffix"], "EXIF");
    assert_eq!(
        body["filters"],
        serde_json::json!(["exif:MICROSCOPY_EXIF", "spc:EDAXGenesis_SPC"])
    );
}

#[tokio::test]
async fn test_buildinfo_endpoint() {
    let portal = TestPortal::new().await;
    let response = portal.get("/api/buildinfo").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert!(body["git_hash"].is_string());
    assert_eq!(body["package"], "mt-portal");
    assert!(body["display"].as_str().unwrap().contains(body["git_hash"].as_str().unwrap()));
}

// =============================================================================
// Spectrum export
// =============================================================================

#[tokio::test]
async fn test_spectrum_csv_download() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://run 1.spc", &spectrum_bytes()).await;

    let response = portal.get(&format!("/spectrum/csv/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=run_1.csv"
    );

    let body = extract_text(response).await;
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 4000);
    assert_eq!(lines[0], "1,10");
    assert_eq!(lines[1], "2,20");
    assert_eq!(lines[3999], "4000,40000");
    assert!(body.ends_with('\n'));
}

#[tokio::test]
async fn test_spectrum_json_series() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://sample.spc", &spectrum_bytes()).await;

    let response = portal.get(&format!("/spectrum/json/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["label"], "sample");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 4000);
    assert_eq!(data[0], serde_json::json!([0, 10]));
    assert_eq!(data[3999], serde_json::json!([3999, 40000]));
}

#[tokio::test]
async fn test_spectrum_unknown_datafile_is_404() {
    let portal = TestPortal::new().await;
    let response = portal.get("/spectrum/csv/999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = extract_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("999"));
}

#[tokio::test]
async fn test_truncated_spectrum_is_server_error() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://short.spc", &[0u8; 4000]).await;

    let response = portal.get(&format!("/spectrum/json/{}", id)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Ingest, thumbnails and parameters
// =============================================================================

#[tokio::test]
async fn test_ingest_image_writes_thumbnails_and_parameters() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://images/sem.png", &image_bytes()).await;

    let response = portal.post(&format!("/api/datafile/{}/ingest", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = extract_json(response).await;
    assert_eq!(report["datafile_id"], id);
    assert_eq!(report["thumbnails"], true);
    assert_eq!(report["parameter_sets"][0]["schema_name"], "MICROSCOPY_EXIF");
    assert_eq!(report["parameter_sets"][0]["parameter_count"], 3);

    let response = portal.get(&format!("/thumbnails/small/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    let small = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!((small.width(), small.height()), (400, 300));

    let response = portal.get(&format!("/thumbnails/full/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let full = image::load_from_memory(&body_bytes(response).await).unwrap();
    assert_eq!((full.width(), full.height()), (800, 600));

    let response = portal.get(&format!("/ajax/parameters/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "no-cache, no-store, must-revalidate, max-age=0"
    );
    let html = extract_text(response).await;
    assert!(html.contains(&format!("/thumbnails/small/{}", id)));
    let date = html.find("[User] Date").unwrap();
    let time = html.find("[User] Time").unwrap();
    let hv = html.find("[Beam] HV").unwrap();
    assert!(date < time && time < hv);
}

#[tokio::test]
async fn test_ingest_spectrum_has_no_thumbnails() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://a.spc", &spectrum_bytes()).await;

    let report = extract_json(portal.post(&format!("/api/datafile/{}/ingest", id)).await).await;
    assert_eq!(report["thumbnails"], false);
    assert_eq!(report["parameter_sets"][0]["schema_name"], "EDAXGenesis_SPC");

    let response = portal.get(&format!("/thumbnails/small/{}", id)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_failed_ingest_leaves_panel_empty() {
    let portal = TestPortal::new().await;
    let id = portal
        .add_datafile("tardis://broken.tif", b"II*\0garbage[User]\nDate=01/01/2012\n\0")
        .await;

    let response = portal.post(&format!("/api/datafile/{}/ingest", id)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = extract_json(portal.get(&format!("/api/datafile/{}/parameters", id)).await).await;
    assert!(body["parameter_sets"].as_array().unwrap().is_empty());
    assert!(body["thumbnail"].is_null());
}

#[tokio::test]
async fn test_ingest_unknown_datafile_is_404() {
    let portal = TestPortal::new().await;
    let response = portal.post("/api/datafile/42/ingest").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_spectrum_parameters_sorted() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://b.spc", &spectrum_bytes()).await;

    let schema = portal
        .store
        .get_or_create_schema("ns", &portal.settings.spectrum_schema_name)
        .await
        .unwrap();
    let params = vec![
        ExtractedParameter::new("Zeta", 1.0),
        ExtractedParameter::new("Peak ID Element 10", "Cu"),
        ExtractedParameter::new("Live Time", 100.0).with_units("s"),
        ExtractedParameter::new("Peak ID Element 2", "Fe"),
        ExtractedParameter::new("Alpha", 2.0),
        ExtractedParameter::new("Sample Type (Label)", "Steel"),
    ];
    portal.store.save_parameter_set(id, &schema, &params).await.unwrap();

    let response = portal.get(&format!("/api/datafile/{}/parameters", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CACHE_CONTROL]
        .to_str()
        .unwrap()
        .contains("no-store"));
    let body = extract_json(response).await;
    assert!(body["thumbnail"].is_null());

    let names: Vec<&str> = body["parameter_sets"][0]["parameters"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["full_name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec![
            "Sample Type (Label)",
            "Live Time",
            "Peak ID Element 2",
            "Peak ID Element 10",
            "Alpha",
            "Zeta",
        ]
    );
}

#[tokio::test]
async fn test_parameters_unknown_datafile_is_404() {
    let portal = TestPortal::new().await;
    assert_eq!(portal.get("/ajax/parameters/7").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        portal.get("/api/datafile/7/parameters").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_thumbnail_page() {
    let portal = TestPortal::new().await;
    let id = portal.add_datafile("tardis://c.png", &image_bytes()).await;

    let response = portal.get(&format!("/thumbnail/{}", id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = extract_text(response).await;
    assert!(html.contains(&format!("src=\"/thumbnails/full/{}\"", id)));

    assert_eq!(portal.get("/thumbnail/555").await.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Facility records
// =============================================================================

#[tokio::test]
async fn test_records_page() {
    let portal = TestPortal::new().await;
    for key in ["p-b", "p-a", "p-c"] {
        sqlx::query("INSERT INTO party_records (key) VALUES (?)")
            .bind(key)
            .execute(portal.store.pool())
            .await
            .unwrap();
    }

    let response = portal.get("/api/records/party_records?sort=key&order=desc").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response).await;
    assert_eq!(body["table"], "party_records");
    assert_eq!(body["total_rows"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 100);
    assert_eq!(body["total_pages"], 1);

    let columns: Vec<&str> = body["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    let key_index = columns.iter().position(|c| *c == "key").unwrap();
    let keys: Vec<&str> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row[key_index].as_str().unwrap())
        .collect();
    assert_eq!(keys, vec!["p-c", "p-b", "p-a"]);
}

#[tokio::test]
async fn test_records_empty_table_lists_columns() {
    let portal = TestPortal::new().await;
    let body = extract_json(portal.get("/api/records/activity_records").await).await;
    assert_eq!(body["total_rows"], 0);
    assert_eq!(body["page"], 1);
    assert!(body["columns"].as_array().unwrap().iter().any(|c| c == "ident"));
    assert!(body["rows"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_records_rejects_unlisted_table_and_column() {
    let portal = TestPortal::new().await;
    assert_eq!(
        portal.get("/api/records/dataset_files").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        portal.get("/api/records/party_records?sort=nope").await.status(),
        StatusCode::BAD_REQUEST
    );
}
