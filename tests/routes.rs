use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use schoolmap::config::GeolocationConfig;
use schoolmap::error::LocationFetchError;
use schoolmap::geolocation::LocationProvider;
use schoolmap::routes::router;
use schoolmap::state::AppState;
use schoolmap::store::{MemorySchoolStore, SchoolStore};
use schoolmap::{GeoPoint, School};

/// Answers with a fixed point, or a fixed status when `status` is set
struct FixedProvider {
    point: GeoPoint,
    status: Option<u16>,
    calls: AtomicUsize,
}

impl FixedProvider {
    fn at(lat: f64, lon: f64) -> Arc<Self> {
        Arc::new(Self {
            point: GeoPoint::new(lat, lon),
            status: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(status: u16) -> Arc<Self> {
        Arc::new(Self {
            point: GeoPoint::new(0.0, 0.0),
            status: Some(status),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LocationProvider for FixedProvider {
    async fn locate(&self) -> Result<GeoPoint, LocationFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.status {
            Some(status) => Err(LocationFetchError::Status { status }),
            None => Ok(self.point),
        }
    }
}

fn school(id: &str, name: &str, lat: f64, lon: f64) -> School {
    School {
        id: id.to_string(),
        name: name.to_string(),
        address: format!("{} Road", name),
        latitude: lat,
        longitude: lon,
    }
}

fn server_with(
    store: Arc<MemorySchoolStore>,
    provider: Arc<FixedProvider>,
    static_dir: &Path,
) -> TestServer {
    let state = AppState::new(
        store,
        provider,
        &GeolocationConfig::default(),
        CancellationToken::new(),
    )
    .unwrap();
    TestServer::new(router(state, static_dir)).unwrap()
}

fn server(store: Arc<MemorySchoolStore>, provider: Arc<FixedProvider>) -> TestServer {
    server_with(store, provider, Path::new("public"))
}

fn seeded_store() -> Arc<MemorySchoolStore> {
    Arc::new(MemorySchoolStore::with_schools(vec![
        school("b", "Diagonal School", 1.0, 1.0),
        school("a", "Origin School", 0.0, 0.0),
    ]))
}

fn position(html: &str, needle: &str) -> usize {
    html.find(needle)
        .unwrap_or_else(|| panic!("'{}' not found in page", needle))
}

#[tokio::test]
async fn welcome_text() {
    let server = server(seeded_store(), FixedProvider::at(0.0, 0.0));
    let response = server.get("/").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "Welcome to the school project!");
}

#[tokio::test]
async fn health_reports_store() {
    let server = server(seeded_store(), FixedProvider::at(0.0, 0.0));
    let body: Value = server.get("/health").await.json();
    assert_eq!(body, json!({ "status": "ok", "store": true }));
}

#[tokio::test]
async fn add_form_renders() {
    let server = server(seeded_store(), FixedProvider::at(0.0, 0.0));
    let response = server.get("/addSchool").await;
    response.assert_status_ok();
    assert!(response.text().contains("name=\"latitude\""));
}

#[tokio::test]
async fn add_school_json_then_listed() {
    let store = Arc::new(MemorySchoolStore::new());
    let server = server(store.clone(), FixedProvider::at(0.0, 0.0));

    let response = server
        .post("/addSchool")
        .json(&json!({
            "name": "Lincoln High",
            "address": "1 Main St",
            "latitude": 40.0,
            "longitude": -75.0
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body: Value = response.json();
    assert_eq!(body["message"], "School added successfully");
    let id = body["id"].as_str().unwrap();

    let stored = store.get(id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Lincoln High");
    assert_eq!(stored.address, "1 Main St");
    assert_eq!((stored.latitude, stored.longitude), (40.0, -75.0));

    let page = server.get("/listSchools").await;
    page.assert_status_ok();
    assert!(page.text().contains("Lincoln High"));
}

#[tokio::test]
async fn add_school_form_validation() {
    let store = Arc::new(MemorySchoolStore::new());
    let server = server(store.clone(), FixedProvider::at(0.0, 0.0));

    let response = server
        .post("/addSchool")
        .form(&[
            ("name", "Lincoln High"),
            ("address", "1 Main St"),
            ("latitude", "120"),
            ("longitude", "-75"),
        ])
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], "latitude");
    assert_eq!(errors[0]["msg"], "Invalid latitude");
    assert_eq!(errors[0]["location"], "body");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn add_school_mistyped_json_fields() {
    let store = Arc::new(MemorySchoolStore::new());
    let server = server(store.clone(), FixedProvider::at(0.0, 0.0));

    let response = server
        .post("/addSchool")
        .json(&json!({
            "name": true,
            "address": "1 Main St",
            "latitude": true,
            "longitude": { "deg": -75 }
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    let paths: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["name", "latitude", "longitude"]);
    assert_eq!(body["errors"][1]["value"], json!(true));
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn add_school_numeric_name_accepted() {
    let store = Arc::new(MemorySchoolStore::new());
    let server = server(store.clone(), FixedProvider::at(0.0, 0.0));

    let response = server
        .post("/addSchool")
        .json(&json!({
            "name": 123,
            "address": "1 Main St",
            "latitude": 40,
            "longitude": -75
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let id = response.json::<Value>()["id"].as_str().unwrap().to_string();
    assert_eq!(store.get(&id).await.unwrap().unwrap().name, "123");
}

#[tokio::test]
async fn add_school_form_success() {
    let store = Arc::new(MemorySchoolStore::new());
    let server = server(store.clone(), FixedProvider::at(0.0, 0.0));

    server
        .post("/addSchool")
        .form(&[
            ("name", "Central"),
            ("address", "2 Elm St"),
            ("latitude", "39.95"),
            ("longitude", "-75.16"),
        ])
        .await
        .assert_status(StatusCode::CREATED);

    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn ranked_from_posted_origin() {
    let provider = FixedProvider::at(45.0, 45.0);
    let server = server(seeded_store(), provider.clone());

    let response = server
        .post("/listSchools")
        .form(&[("latitude", "0"), ("longitude", "0")])
        .await;
    response.assert_status_ok();

    let html = response.text();
    assert!(position(&html, "Origin School") < position(&html, "Diagonal School"));
    assert!(html.contains("157.2"));
    // zero is a real coordinate under the default presence policy
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn ranked_from_geolocation_when_body_empty() {
    let provider = FixedProvider::at(1.0, 1.0);
    let server = server(seeded_store(), provider.clone());

    let response = server.post("/listSchools").await;
    response.assert_status_ok();

    let html = response.text();
    assert!(position(&html, "Diagonal School") < position(&html, "Origin School"));
    assert!(html.contains("located from your IP address"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn ranked_with_blank_fields_uses_geolocation() {
    let provider = FixedProvider::at(1.0, 1.0);
    let server = server(seeded_store(), provider.clone());

    server
        .post("/listSchools")
        .form(&[("latitude", ""), ("longitude", "")])
        .await
        .assert_status_ok();
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn geolocation_failure_is_server_error() {
    let provider = FixedProvider::failing(500);
    let server = server(seeded_store(), provider.clone());

    let response = server.post("/listSchools").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!response.text().contains("Origin School"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn unparseable_origin_rejected() {
    let provider = FixedProvider::at(1.0, 1.0);
    let server = server(seeded_store(), provider.clone());

    server
        .post("/listSchools")
        .json(&json!({ "latitude": "north", "longitude": 3 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn unsupported_content_type_rejected() {
    let server = server(seeded_store(), FixedProvider::at(0.0, 0.0));

    server
        .post("/addSchool")
        .text("name=Central")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn static_files_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("hello.txt"), "hi there").unwrap();

    let server = server_with(seeded_store(), FixedProvider::at(0.0, 0.0), dir.path());

    let response = server.get("/hello.txt").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "hi there");

    server
        .get("/missing.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
